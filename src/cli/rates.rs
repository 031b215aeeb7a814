use super::ui;
use crate::core::rates::RateRecord;
use anyhow::{Context, Result};
use clap::ValueEnum;
use comfy_table::Cell;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON array, one object per date
    #[default]
    Json,
    /// Human readable table
    Table,
}

pub fn render(records: &[RateRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(records),
        OutputFormat::Table => Ok(render_table(records)),
    }
}

pub fn render_json(records: &[RateRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("Failed to serialize exchange rates")
}

pub fn render_table(records: &[RateRecord]) -> String {
    if records.is_empty() {
        return ui::style_text("No exchange rates available", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Currency"),
        ui::header_cell("Sale"),
        ui::header_cell("Purchase"),
    ]);

    for record in records {
        for (currency, pair) in &record.rates {
            table.add_row(vec![
                Cell::new(record.date.to_string()),
                Cell::new(currency.code()),
                ui::rate_cell(pair.sale),
                ui::rate_cell(pair.purchase),
            ]);
        }
    }

    format!(
        "{}\n{}",
        ui::style_text("Exchange rates (UAH)", ui::StyleType::Title),
        table
    )
}
