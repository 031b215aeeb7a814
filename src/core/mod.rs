//! Core business logic abstractions

pub mod config;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use config::AppConfig;
pub use rates::{Currency, DateKey, RateClient, RatePair, RateRecord};
