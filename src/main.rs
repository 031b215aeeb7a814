use anyhow::Result;
use clap::Parser;
use pbrates::cli::rates::OutputFormat;
use pbrates::core::log::init_logging;
use std::io::IsTerminal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long)]
    config_path: Option<String>,

    /// Number of days to fetch, counting today (at most 10)
    #[arg(short, long, allow_negative_numbers = true)]
    days: Option<i64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = pbrates::run(pbrates::RunOptions {
        config_path: cli.config_path.as_deref(),
        days: cli.days,
        format: cli.format,
        show_progress: std::io::stderr().is_terminal(),
    })
    .await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
