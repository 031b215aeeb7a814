//! Concurrent fan-out over the most recent days.

use crate::cli::ui;
use crate::core::config::AppConfig;
use crate::core::rates::{DateKey, RateClient, RateRecord};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound on the number of days fetched in one batch.
pub const MAX_DAYS: i64 = 10;

/// Clamps a requested day count to `[0, MAX_DAYS]`.
pub fn clamp_days(days: i64) -> usize {
    days.clamp(0, MAX_DAYS) as usize
}

/// Dates to query, most recent first: `today`, `today - 1`, ...
pub fn date_range(today: NaiveDate, days: usize) -> Vec<DateKey> {
    let today = DateKey::new(today);
    (0..days as u64)
        .filter_map(|i| today.days_before(i))
        .collect()
}

pub struct RateFetcher<C: RateClient> {
    days: usize,
    client: C,
    request_timeout: Duration,
    user_agent: String,
    show_progress: bool,
}

impl<C: RateClient> RateFetcher<C> {
    pub fn new(days: i64, client: C) -> Self {
        let defaults = AppConfig::default();
        RateFetcher {
            days: clamp_days(days),
            client,
            request_timeout: Duration::from_secs(defaults.request_timeout_secs),
            user_agent: defaults.user_agent,
            show_progress: false,
        }
    }

    pub fn from_config(config: &AppConfig, client: C) -> Self {
        RateFetcher {
            days: clamp_days(config.days),
            client,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            user_agent: config.user_agent.clone(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn days(&self) -> usize {
        self.days
    }

    /// Fetches the batch ending at today's local date.
    pub async fn fetch_rates(&self) -> Result<Vec<RateRecord>> {
        self.fetch_rates_from(Local::now().date_naive()).await
    }

    /// Fetches every date of the batch ending at `today` concurrently.
    ///
    /// Records come back in submission order (most recent first); dates with
    /// no usable data are dropped. Only building the HTTP client can fail.
    pub async fn fetch_rates_from(&self, today: NaiveDate) -> Result<Vec<RateRecord>> {
        let dates = date_range(today, self.days);
        if dates.is_empty() {
            debug!("Nothing to fetch");
            return Ok(Vec::new());
        }

        // One client per batch; dropped when this function returns.
        let http = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        info!(days = dates.len(), "Fetching exchange rates");
        let pb = ui::new_progress_bar(dates.len() as u64, !self.show_progress);
        let rate_futures = dates.iter().map(|date| {
            let pb_clone = pb.clone();
            let http = &http;
            async move {
                let res = self.client.fetch(http, *date).await;
                pb_clone.inc(1);
                res
            }
        });

        let results: Vec<Option<RateRecord>> = join_all(rate_futures).await;
        pb.finish_and_clear();

        let records: Vec<RateRecord> = results.into_iter().flatten().collect();
        debug!(
            fetched = records.len(),
            missing = dates.len() - records.len(),
            "Batch complete"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::{Currency, RatePair};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn record_for(date: DateKey) -> RateRecord {
        let mut rates = BTreeMap::new();
        rates.insert(
            Currency::Usd,
            RatePair {
                sale: 38.5,
                purchase: 37.9,
            },
        );
        RateRecord::new(date, rates).unwrap()
    }

    /// Records every requested date; answers `None` for the dates in `missing`
    /// and delays older dates less so they finish first.
    #[derive(Default)]
    struct FakeClient {
        requested: Mutex<Vec<DateKey>>,
        missing: HashSet<DateKey>,
        staggered: bool,
    }

    #[async_trait]
    impl RateClient for FakeClient {
        async fn fetch(&self, _client: &reqwest::Client, date: DateKey) -> Option<RateRecord> {
            let position = {
                let mut requested = self.requested.lock().unwrap();
                requested.push(date);
                requested.len() as u64
            };
            if self.staggered {
                tokio::time::sleep(Duration::from_millis(100 / position)).await;
            }
            if self.missing.contains(&date) {
                None
            } else {
                Some(record_for(date))
            }
        }
    }

    #[test]
    fn test_clamp_days() {
        assert_eq!(clamp_days(15), 10);
        assert_eq!(clamp_days(10), 10);
        assert_eq!(clamp_days(3), 3);
        assert_eq!(clamp_days(0), 0);
        assert_eq!(clamp_days(-4), 0);
    }

    #[test]
    fn test_date_range_most_recent_first() {
        let dates: Vec<String> = date_range(today(), 3)
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(dates, vec!["05.03.2024", "04.03.2024", "03.03.2024"]);
    }

    #[tokio::test]
    async fn test_requested_days_are_capped() {
        let fetcher = RateFetcher::new(15, FakeClient::default());
        assert_eq!(fetcher.days(), 10);

        let records = fetcher.fetch_rates_from(today()).await.unwrap();
        assert_eq!(records.len(), 10);

        let requested = fetcher.client.requested.lock().unwrap().clone();
        let distinct: HashSet<DateKey> = requested.iter().copied().collect();
        assert_eq!(requested.len(), 10);
        assert_eq!(distinct.len(), 10);
        assert!(distinct.contains(&DateKey::new(today())));
        assert!(distinct.contains(&DateKey::new(today()).days_before(9).unwrap()));
    }

    #[tokio::test]
    async fn test_non_positive_days_yield_nothing() {
        for days in [0, -1] {
            let fetcher = RateFetcher::new(days, FakeClient::default());
            let records = fetcher.fetch_rates_from(today()).await.unwrap();
            assert!(records.is_empty());
            assert!(fetcher.client.requested.lock().unwrap().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_keep_submission_order() {
        let client = FakeClient {
            staggered: true,
            ..Default::default()
        };
        let fetcher = RateFetcher::new(5, client);

        let records = fetcher.fetch_rates_from(today()).await.unwrap();
        let dates: Vec<DateKey> = records.iter().map(|r| r.date).collect();
        assert_eq!(dates, date_range(today(), 5));
    }

    #[tokio::test]
    async fn test_absent_dates_are_dropped() {
        let yesterday = DateKey::new(today()).days_before(1).unwrap();
        let client = FakeClient {
            missing: HashSet::from([yesterday]),
            ..Default::default()
        };
        let fetcher = RateFetcher::new(3, client);

        let records = fetcher.fetch_rates_from(today()).await.unwrap();
        let dates: Vec<String> = records.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["05.03.2024", "03.03.2024"]);
    }
}
