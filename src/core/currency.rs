//! Currency conversion abstractions

use crate::core::error::ConvertError;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// The base every multiplier converts into.
pub const USD: &str = "USD";

/// Alias treated as USD unless the configuration says otherwise.
pub const ZUSD: &str = "ZUSD";

/// Stablecoin tag. Not a USD alias by default.
pub const USDT: &str = "USDT";

/// Provider returning a full table of rates against `base`.
#[async_trait]
pub trait RateTableProvider: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> Result<HashMap<String, f64>>;
}

/// Provider returning a single `from`→`to` rate.
#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}

/// Consumer-facing conversion interface.
///
/// A multiplier `m` for symbol `S` satisfies `amount_in_S * m = amount_in_USD`.
pub trait Converter: Send + Sync {
    fn convert_mod_to_usd(&self, symbol: &str) -> Result<f64, ConvertError>;
    fn append_custom_fiat(&self, symbol: &str, multiplier: f64);
    fn is_fiat(&self, symbol: &str) -> bool;
    fn is_custom_fiat(&self, symbol: &str) -> bool;
}
