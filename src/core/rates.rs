//! Exchange-rate abstractions and core types

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Format used both as the upstream `date` query parameter and as the record key.
pub const DATE_KEY_FORMAT: &str = "%d.%m.%Y";

/// A calendar date rendered as `dd.mm.yyyy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        DateKey(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Returns the date `days` calendar days before this one.
    pub fn days_before(&self, days: u64) -> Option<Self> {
        self.0.checked_sub_days(Days::new(days)).map(DateKey)
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, DATE_KEY_FORMAT)
            .map(DateKey)
            .map_err(|e| anyhow::anyhow!("Invalid date key {}: {}", s, e))
    }
}

impl Serialize for DateKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The tracked currencies. Nothing else ever makes it into a [`RateRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    /// Exact, case-sensitive match against the upstream currency codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            _ => Err(anyhow::anyhow!("Untracked currency: {}", s)),
        }
    }
}

/// Sale and purchase rates exactly as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePair {
    pub sale: f64,
    pub purchase: f64,
}

/// Rates of the tracked currencies for a single date.
///
/// A record is never empty: the client reports "no data" as `None` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    pub date: DateKey,
    pub rates: BTreeMap<Currency, RatePair>,
}

impl RateRecord {
    /// Builds a record, returning `None` when there is nothing to report.
    pub fn new(date: DateKey, rates: BTreeMap<Currency, RatePair>) -> Option<Self> {
        if rates.is_empty() {
            None
        } else {
            Some(RateRecord { date, rates })
        }
    }
}

impl Serialize for RateRecord {
    /// Serializes as `{"dd.mm.yyyy": {"EUR": {...}, "USD": {...}}}`.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.date, &self.rates)?;
        map.end()
    }
}

/// Fetches the rate record of one date over a caller-owned HTTP client.
///
/// Implementations swallow every failure and report it as `None`, so callers
/// only ever see "present" or "absent".
#[async_trait]
pub trait RateClient: Send + Sync {
    async fn fetch(&self, client: &reqwest::Client, date: DateKey) -> Option<RateRecord>;
}
