//! Periodically refreshed table of fiat-to-USD multipliers.

use crate::core::config::{AppConfig, ConverterConfig};
use crate::core::currency::{Converter, CurrencyRateProvider, RateTableProvider, USD};
use crate::core::error::ConvertError;
use crate::providers::grandtrunk::GrandTrunkProvider;
use crate::providers::openrates::OpenRatesProvider;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct Table {
    rates: HashMap<String, f64>,
    custom: HashSet<String>,
    last_refreshed: Option<DateTime<Utc>>,
}

/// Outcome of one refresh cycle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RefreshReport {
    /// Built-in fiats whose multiplier was written this cycle.
    pub updated: Vec<String>,
    /// Built-in fiats absent from the merged provider response; their old value is kept.
    pub missing: Vec<String>,
    /// Secondary fiats whose individual fetch failed.
    pub secondary_failed: Vec<String>,
}

/// Floor for the refresh period; a zero period would stop the loop.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(10);

/// Converts a provider rate (USD→symbol) into a stored multiplier (symbol→USD).
///
/// A zero rate is kept as zero.
pub fn invert_rate(rate: f64) -> f64 {
    if rate != 0.0 { rate.recip() } else { rate }
}

pub struct RateCache {
    fiats: Vec<String>,
    fiat_set: HashSet<String>,
    secondary_fiats: Vec<String>,
    usd_aliases: HashSet<String>,
    primary: Arc<dyn RateTableProvider>,
    secondary: Arc<dyn CurrencyRateProvider>,
    table: RwLock<Table>,
}

impl RateCache {
    /// Builds the cache, runs one refresh cycle, registers the configured
    /// custom fiats and starts the background refresh loop.
    ///
    /// A failed initial refresh is logged and leaves the table empty.
    pub async fn new(
        config: &ConverterConfig,
        primary: Arc<dyn RateTableProvider>,
        secondary: Arc<dyn CurrencyRateProvider>,
    ) -> Arc<Self> {
        Self::with_interval(config, primary, secondary, config.refresh_interval()).await
    }

    pub async fn with_interval(
        config: &ConverterConfig,
        primary: Arc<dyn RateTableProvider>,
        secondary: Arc<dyn CurrencyRateProvider>,
        interval: Duration,
    ) -> Arc<Self> {
        let interval = if interval < MIN_REFRESH_INTERVAL {
            warn!(
                ?interval,
                min = ?MIN_REFRESH_INTERVAL,
                "Refresh interval too short, using minimum"
            );
            MIN_REFRESH_INTERVAL
        } else {
            interval
        };
        let fiats: Vec<String> = config.fiats.iter().map(|s| s.to_uppercase()).collect();
        let mut usd_aliases: HashSet<String> =
            config.usd_aliases.iter().map(|s| s.to_uppercase()).collect();
        usd_aliases.insert(USD.to_string());

        let cache = Arc::new(RateCache {
            fiat_set: fiats.iter().cloned().collect(),
            fiats,
            secondary_fiats: config
                .secondary_fiats
                .iter()
                .map(|s| s.to_uppercase())
                .collect(),
            usd_aliases,
            primary,
            secondary,
            table: RwLock::new(Table::default()),
        });

        cache.refresh_logged().await;

        for (symbol, multiplier) in &config.custom_fiats {
            cache.append_custom_fiat(symbol, *multiplier);
        }

        spawn_refresh_loop(Arc::downgrade(&cache), interval);
        cache
    }

    /// Wires the cache to the HTTP providers named in `config`.
    pub async fn from_app_config(config: &AppConfig) -> Result<Arc<Self>> {
        let timeout = config.converter.request_timeout();
        let primary = OpenRatesProvider::new(config.providers.openrates_base_url(), timeout)
            .context("Failed to create primary rate provider")?;
        let secondary = GrandTrunkProvider::new(config.providers.grandtrunk_base_url(), timeout)
            .context("Failed to create secondary rate provider")?;

        Ok(Self::new(&config.converter, Arc::new(primary), Arc::new(secondary)).await)
    }

    fn read_table(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_table(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// True for USD and its configured aliases.
    pub fn is_usd(&self, symbol: &str) -> bool {
        self.usd_aliases.contains(&symbol.to_uppercase())
    }

    /// Multiplier converting an amount in `symbol` to USD.
    ///
    /// Never performs I/O. Stale values are returned as-is.
    pub fn convert_mod_to_usd(&self, symbol: &str) -> Result<f64, ConvertError> {
        let symbol = symbol.to_uppercase();

        if self.is_usd(&symbol) {
            return Ok(1.0);
        }

        let table = self.read_table();
        if !self.fiat_set.contains(&symbol) && !table.custom.contains(&symbol) {
            return Err(ConvertError::UnsupportedSymbol(symbol));
        }

        table
            .rates
            .get(&symbol)
            .copied()
            .ok_or(ConvertError::NotYetAvailable(symbol))
    }

    /// Registers `symbol` as a custom fiat with a fixed, caller-supplied multiplier.
    ///
    /// The value is stored as given and never touched by the refresh loop.
    pub fn append_custom_fiat(&self, symbol: &str, multiplier: f64) {
        let symbol = symbol.to_uppercase();
        debug!(%symbol, multiplier, "Registering custom fiat");

        let mut table = self.write_table();
        table.custom.insert(symbol.clone());
        table.rates.insert(symbol, multiplier);
    }

    /// True for USD, its aliases and built-in fiats, populated or not.
    pub fn is_fiat(&self, symbol: &str) -> bool {
        let symbol = symbol.to_uppercase();
        self.is_usd(&symbol) || self.fiat_set.contains(&symbol)
    }

    pub fn is_custom_fiat(&self, symbol: &str) -> bool {
        self.read_table().custom.contains(&symbol.to_uppercase())
    }

    /// Built-in fiats in configuration order.
    pub fn fiats(&self) -> &[String] {
        &self.fiats
    }

    pub fn custom_fiats(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.read_table().custom.iter().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Time of the last cycle that got a response from the primary provider.
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.read_table().last_refreshed
    }

    /// Copy of the current table, sorted by symbol.
    pub fn snapshot(&self) -> Vec<(String, f64)> {
        let mut rates: Vec<(String, f64)> = self
            .read_table()
            .rates
            .iter()
            .map(|(symbol, multiplier)| (symbol.clone(), *multiplier))
            .collect();
        rates.sort_by(|a, b| a.0.cmp(&b.0));
        rates
    }

    /// Runs one refresh cycle.
    ///
    /// Fetches happen outside the lock. Each symbol is written under its own
    /// write lock, so readers may see a mix of old and new values mid-cycle.
    /// A primary failure leaves the table untouched.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let mut rates = self
            .primary
            .fetch_rates(USD)
            .await
            .context("Fetching convert mods failed")?;
        let mut report = RefreshReport::default();

        let pending: Vec<&String> = self
            .secondary_fiats
            .iter()
            .filter(|symbol| !rates.contains_key(symbol.as_str()))
            .collect();
        let fetches = pending.into_iter().map(|symbol| async move {
            (symbol, self.secondary.get_rate(USD, symbol).await)
        });

        for (symbol, result) in join_all(fetches).await {
            match result {
                Ok(rate) => {
                    rates.insert(symbol.clone(), rate);
                }
                Err(e) => {
                    warn!(%symbol, error = %e, "Secondary rate fetch failed");
                    report.secondary_failed.push(symbol.clone());
                }
            }
        }

        for symbol in &self.fiats {
            let Some(&rate) = rates.get(symbol) else {
                warn!(%symbol, "Fiat not found in converter mods");
                report.missing.push(symbol.clone());
                continue;
            };

            let multiplier = invert_rate(rate);
            self.write_table().rates.insert(symbol.clone(), multiplier);
            report.updated.push(symbol.clone());
        }

        self.write_table().last_refreshed = Some(Utc::now());
        Ok(report)
    }

    async fn refresh_logged(&self) {
        match self.refresh().await {
            Ok(report) => info!(
                updated = report.updated.len(),
                missing = report.missing.len(),
                secondary_failed = report.secondary_failed.len(),
                "Refreshed convert mods"
            ),
            Err(e) => error!(error = %format!("{e:#}"), "Refresh cycle failed, keeping previous rates"),
        }
    }
}

/// Refreshes every `interval` until the cache is dropped.
fn spawn_refresh_loop(cache: Weak<RateCache>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(cache) = cache.upgrade() else {
                debug!("Rate cache dropped, stopping refresh loop");
                break;
            };
            cache.refresh_logged().await;
        }
    });
}

impl Converter for RateCache {
    fn convert_mod_to_usd(&self, symbol: &str) -> Result<f64, ConvertError> {
        RateCache::convert_mod_to_usd(self, symbol)
    }

    fn append_custom_fiat(&self, symbol: &str, multiplier: f64) {
        RateCache::append_custom_fiat(self, symbol, multiplier)
    }

    fn is_fiat(&self, symbol: &str) -> bool {
        RateCache::is_fiat(self, symbol)
    }

    fn is_custom_fiat(&self, symbol: &str) -> bool {
        RateCache::is_custom_fiat(self, symbol)
    }
}
