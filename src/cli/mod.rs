pub mod rates;
pub mod ui;
