pub mod cli;
pub mod core;
pub mod fetcher;
pub mod providers;

use crate::cli::rates::OutputFormat;
use crate::core::config::AppConfig;
use crate::core::rates::RateRecord;
use crate::fetcher::RateFetcher;
use crate::providers::privatbank::PrivatBankClient;
use anyhow::Result;
use tracing::{debug, info};

/// Command line overrides applied on top of the loaded config.
#[derive(Debug, Default, Clone)]
pub struct RunOptions<'a> {
    pub config_path: Option<&'a str>,
    pub days: Option<i64>,
    pub format: OutputFormat,
    pub show_progress: bool,
}

pub fn load_config(options: &RunOptions<'_>) -> Result<AppConfig> {
    let mut config = match options.config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    if let Some(days) = options.days {
        config.days = days;
    }
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Fetches the batch described by `config` against the PrivatBank API.
pub async fn fetch_rates(config: &AppConfig, show_progress: bool) -> Result<Vec<RateRecord>> {
    let client = PrivatBankClient::new(&config.base_url);
    RateFetcher::from_config(config, client)
        .with_progress(show_progress)
        .fetch_rates()
        .await
}

pub async fn run(options: RunOptions<'_>) -> Result<()> {
    info!("Exchange rate fetch starting...");

    let config = load_config(&options)?;
    let records = fetch_rates(&config, options.show_progress).await?;
    println!("{}", cli::rates::render(&records, options.format)?);
    Ok(())
}
