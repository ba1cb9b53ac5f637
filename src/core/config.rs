use crate::core::currency::ZUSD;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

const DEFAULT_FIATS: [&str; 13] = [
    "KRW", "JPY", "TRY", "EUR", "GBP", "RUB", "CNY", "CHF", "AUD", "CAD", "BRL", "UAH", "IRR",
];
const DEFAULT_SECONDARY_FIATS: [&str; 2] = ["UAH", "IRR"];

fn default_fiats() -> Vec<String> {
    DEFAULT_FIATS.iter().map(|s| s.to_string()).collect()
}

fn default_secondary_fiats() -> Vec<String> {
    DEFAULT_SECONDARY_FIATS.iter().map(|s| s.to_string()).collect()
}

fn default_usd_aliases() -> Vec<String> {
    vec![ZUSD.to_string()]
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Which symbols are refreshed, where from and how often.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConverterConfig {
    /// Built-in fiats kept refreshed from the providers.
    #[serde(default = "default_fiats")]
    pub fiats: Vec<String>,
    /// Subset of `fiats` filled from the secondary provider when the primary omits them.
    #[serde(default = "default_secondary_fiats")]
    pub secondary_fiats: Vec<String>,
    /// Symbols answered with a multiplier of 1 without touching the table.
    #[serde(default = "default_usd_aliases")]
    pub usd_aliases: Vec<String>,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Fixed multipliers registered as custom fiats at startup.
    #[serde(default)]
    pub custom_fiats: BTreeMap<String, f64>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        ConverterConfig {
            fiats: default_fiats(),
            secondary_fiats: default_secondary_fiats(),
            usd_aliases: default_usd_aliases(),
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            custom_fiats: BTreeMap::new(),
        }
    }
}

impl ConverterConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Uppercases every symbol and drops duplicates, keeping first occurrence order.
    pub fn normalize(&mut self) {
        fn upper_unique(symbols: &mut Vec<String>) {
            let mut seen = Vec::with_capacity(symbols.len());
            for symbol in symbols.drain(..) {
                let symbol = symbol.trim().to_uppercase();
                if !symbol.is_empty() && !seen.contains(&symbol) {
                    seen.push(symbol);
                }
            }
            *symbols = seen;
        }

        upper_unique(&mut self.fiats);
        upper_unique(&mut self.secondary_fiats);
        upper_unique(&mut self.usd_aliases);
        self.custom_fiats = std::mem::take(&mut self.custom_fiats)
            .into_iter()
            .map(|(symbol, multiplier)| (symbol.trim().to_uppercase(), multiplier))
            .collect();
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if let Some(symbol) = self
            .secondary_fiats
            .iter()
            .find(|symbol| !self.fiats.contains(symbol))
        {
            bail!("Secondary fiat {symbol} is not listed in fiats");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenRatesProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GrandTrunkProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub openrates: Option<OpenRatesProviderConfig>,
    pub grandtrunk: Option<GrandTrunkProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            openrates: Some(OpenRatesProviderConfig {
                base_url: "https://api.openrates.io".to_string(),
            }),
            grandtrunk: Some(GrandTrunkProviderConfig {
                base_url: "http://currencies.apps.grandtrunk.net".to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn openrates_base_url(&self) -> &str {
        self.openrates
            .as_ref()
            .map_or("https://api.openrates.io", |p| &p.base_url)
    }

    pub fn grandtrunk_base_url(&self) -> &str {
        self.grandtrunk
            .as_ref()
            .map_or("http://currencies.apps.grandtrunk.net", |p| &p.base_url)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "fxmod", "fxmod")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config = Self::from_yaml(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.converter.normalize();
        config.converter.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
converter:
  fiats: ["eur", "GBP", "uah", "EUR"]
  secondary_fiats: ["uah"]
  usd_aliases: ["zusd", "usdt"]
  refresh_interval_secs: 60
  custom_fiats:
    xau: 1800.0
providers:
  openrates:
    base_url: "http://example.com/openrates"
  grandtrunk:
    base_url: "http://example.com/grandtrunk"
"#;

        let config = AppConfig::from_yaml(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.converter.fiats, vec!["EUR", "GBP", "UAH"]);
        assert_eq!(config.converter.secondary_fiats, vec!["UAH"]);
        assert_eq!(config.converter.usd_aliases, vec!["ZUSD", "USDT"]);
        assert_eq!(config.converter.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.converter.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.converter.custom_fiats.get("XAU"), Some(&1800.0));
        assert_eq!(
            config.providers.openrates_base_url(),
            "http://example.com/openrates"
        );
        assert_eq!(
            config.providers.grandtrunk_base_url(),
            "http://example.com/grandtrunk"
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.converter.fiats.len(), 13);
        assert!(config.converter.fiats.contains(&"BRL".to_string()));
        assert_eq!(config.converter.secondary_fiats, vec!["UAH", "IRR"]);
        assert_eq!(config.converter.usd_aliases, vec!["ZUSD"]);
        assert_eq!(config.converter.refresh_interval_secs, 3600);
        assert!(config.converter.custom_fiats.is_empty());
        assert_eq!(
            config.providers.openrates_base_url(),
            "https://api.openrates.io"
        );
    }

    #[test]
    fn test_secondary_fiat_must_be_builtin() {
        let yaml_str = r#"
converter:
  fiats: ["EUR"]
  secondary_fiats: ["IRR"]
"#;
        let err = AppConfig::from_yaml(yaml_str).unwrap_err();
        assert!(err.to_string().contains("IRR is not listed in fiats"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = AppConfig::from_yaml("converter:\n  refresh_interval_secs: 0\n").unwrap_err();
        assert!(err.to_string().contains("refresh_interval_secs"));
    }

    #[test]
    fn test_load_from_missing_path() {
        let result = AppConfig::load_from_path("/nonexistent/fxmod/config.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
