use super::ui;
use crate::converter::RateCache;
use crate::core::config::AppConfig;
use crate::core::currency::{Converter, USD};
use crate::core::error::ConvertError;
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Usd,
    BuiltIn,
    Custom,
    Unknown,
}

impl SymbolKind {
    fn label(self) -> &'static str {
        match self {
            SymbolKind::Usd => "usd",
            SymbolKind::BuiltIn => "built-in",
            SymbolKind::Custom => "custom",
            SymbolKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    pub symbol: String,
    pub kind: SymbolKind,
    pub multiplier: Result<f64, ConvertError>,
}

fn classify(cache: &RateCache, symbol: &str) -> SymbolKind {
    if cache.is_usd(symbol) {
        SymbolKind::Usd
    } else if cache.is_custom_fiat(symbol) {
        // Shadows a built-in until the next refresh.
        SymbolKind::Custom
    } else if cache.is_fiat(symbol) {
        SymbolKind::BuiltIn
    } else {
        SymbolKind::Unknown
    }
}

/// Rows for `symbols`, or for USD plus every built-in and custom fiat when empty.
pub fn build_rows(cache: &RateCache, symbols: &[String]) -> Vec<RateRow> {
    let symbols: Vec<String> = if symbols.is_empty() {
        std::iter::once(USD.to_string())
            .chain(cache.fiats().iter().cloned())
            .chain(cache.custom_fiats())
            .collect()
    } else {
        symbols.iter().map(|s| s.to_uppercase()).collect()
    };

    symbols
        .into_iter()
        .map(|symbol| RateRow {
            kind: classify(cache, &symbol),
            multiplier: cache.convert_mod_to_usd(&symbol),
            symbol,
        })
        .collect()
}

pub fn display_rates_table(rows: &[RateRow], last_refreshed: Option<DateTime<Utc>>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Kind"),
        ui::header_cell("To USD"),
        ui::header_cell("Note"),
    ]);

    for row in rows {
        let (value, note) = match &row.multiplier {
            Ok(multiplier) => (ui::multiplier_cell(*multiplier), String::new()),
            Err(e @ ConvertError::NotYetAvailable(_)) => (ui::na_cell(false), e.to_string()),
            Err(e @ ConvertError::UnsupportedSymbol(_)) => (ui::na_cell(true), e.to_string()),
        };
        table.add_row(vec![
            Cell::new(&row.symbol),
            Cell::new(row.kind.label()),
            value,
            Cell::new(note),
        ]);
    }

    let refreshed = last_refreshed.map_or_else(
        || ui::style_text("never", ui::StyleType::Error),
        |at| ui::style_text(&at.to_rfc3339(), ui::StyleType::Subtle),
    );

    format!(
        "{}\n\n{}\n\nLast refreshed: {}",
        ui::style_text("Conversion multipliers", ui::StyleType::Title),
        table,
        refreshed
    )
}

/// Converts `amount` of `symbol` into USD.
pub fn convert_amount(
    converter: &dyn Converter,
    amount: f64,
    symbol: &str,
) -> Result<f64, ConvertError> {
    converter
        .convert_mod_to_usd(symbol)
        .map(|multiplier| amount * multiplier)
}

async fn start_cache(config: &AppConfig) -> Result<Arc<RateCache>> {
    let pb = ui::new_spinner("Fetching latest rates...");
    let cache = RateCache::from_app_config(config).await;
    pb.finish_and_clear();
    cache
}

pub async fn run_rates(config: &AppConfig, symbols: &[String]) -> Result<()> {
    let cache = start_cache(config).await?;
    let rows = build_rows(&cache, symbols);
    println!("{}", display_rates_table(&rows, cache.last_refreshed()));
    Ok(())
}

pub async fn run_convert(config: &AppConfig, amount: f64, symbol: &str) -> Result<()> {
    let cache = start_cache(config).await?;
    let usd = convert_amount(&*cache, amount, symbol)?;
    println!(
        "{amount} {} = {} {USD}",
        symbol.to_uppercase(),
        ui::style_text(&format!("{usd:.2}"), ui::StyleType::TotalValue)
    );
    Ok(())
}
