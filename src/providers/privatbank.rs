use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use crate::core::config::DEFAULT_BASE_URL;
use crate::core::rates::{Currency, DateKey, RateClient, RatePair, RateRecord};

/// One element of the upstream `exchangeRate` array. Every field is optional
/// upstream: the first element usually only carries the base currency, and
/// rarely traded currencies come without commercial rates.
#[derive(Debug, Deserialize)]
struct ExchangeRateEntry {
    currency: Option<String>,
    #[serde(alias = "saleRate")]
    sale_rate: Option<f64>,
    #[serde(alias = "purchaseRate")]
    purchase_rate: Option<f64>,
}

/// Rate Client for the PrivatBank archive endpoint
/// (`/p24api/exchange_rates?json&date=dd.mm.yyyy`).
#[derive(Debug, Clone)]
pub struct PrivatBankClient {
    base_url: String,
}

impl Default for PrivatBankClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl PrivatBankClient {
    pub fn new(base_url: &str) -> Self {
        PrivatBankClient {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, date: DateKey) -> String {
        format!("{}/p24api/exchange_rates?json&date={}", self.base_url, date)
    }

    /// Extracts the tracked currencies from a decoded response body.
    ///
    /// Returns `Ok(None)` when the body holds no EUR or USD entry. Errors only
    /// when the document itself has the wrong shape; malformed entries are
    /// skipped.
    pub fn parse(body: &Value, date: DateKey) -> Result<Option<RateRecord>> {
        let object = body
            .as_object()
            .ok_or_else(|| anyhow!("Unexpected response for date {}: not a JSON object", date))?;

        let entries = match object.get("exchangeRate") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(anyhow!(
                    "Unexpected response for date {}: exchangeRate is not an array",
                    date
                ));
            }
        };

        let mut rates = BTreeMap::new();
        for raw in entries {
            let entry: ExchangeRateEntry = match serde_json::from_value(raw.clone()) {
                Ok(entry) => entry,
                Err(e) => {
                    let tracked = raw
                        .get("currency")
                        .and_then(Value::as_str)
                        .is_some_and(|code| code.parse::<Currency>().is_ok());
                    if tracked {
                        warn!(%date, error = %e, "Skipping malformed entry");
                    } else {
                        debug!(%date, error = %e, "Skipping unrecognised entry");
                    }
                    continue;
                }
            };

            let Some(currency) = entry.currency.as_deref() else {
                continue;
            };
            let Ok(currency) = currency.parse::<Currency>() else {
                continue;
            };

            match (entry.sale_rate, entry.purchase_rate) {
                (Some(sale), Some(purchase)) => {
                    rates.insert(currency, RatePair { sale, purchase });
                }
                _ => {
                    warn!(%date, %currency, "Skipping entry without sale/purchase rates");
                }
            }
        }

        Ok(RateRecord::new(date, rates))
    }

    async fn try_fetch(&self, client: &reqwest::Client, date: DateKey) -> Result<Option<RateRecord>> {
        let url = self.url_for(date);
        debug!("Requesting exchange rates from {}", url);

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for date: {}", e, date))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for date: {}",
                response.status(),
                date
            ));
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response for {date}"))?;

        Self::parse(&body, date)
    }
}

#[async_trait]
impl RateClient for PrivatBankClient {
    #[instrument(name = "PrivatBankFetch", skip(self, client), fields(date = %date))]
    async fn fetch(&self, client: &reqwest::Client, date: DateKey) -> Option<RateRecord> {
        match self.try_fetch(client, date).await {
            Ok(Some(record)) => {
                debug!(currencies = record.rates.len(), "Received exchange rates");
                Some(record)
            }
            Ok(None) => {
                debug!("No tracked currencies in response");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch exchange rates");
                None
            }
        }
    }
}
