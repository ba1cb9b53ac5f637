use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::RateTableProvider;
use crate::providers::util::{build_client, get_text};

/// Primary provider: the full table of latest rates for a base currency.
pub struct OpenRatesProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OpenRatesProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(OpenRatesProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[derive(Deserialize, Debug)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl RateTableProvider for OpenRatesProvider {
    #[instrument(name = "OpenRatesFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str) -> Result<HashMap<String, f64>> {
        let url = format!("{}/latest?base={}", self.base_url, base);
        debug!("Requesting rate table from {}", url);

        let text = get_text(&self.client, &url).await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for base {}: {}", base, e))?;

        debug!(count = data.rates.len(), "Received rate table");
        let mut rates = HashMap::with_capacity(data.rates.len());
        for (symbol, rate) in data.rates {
            let upper = symbol.to_uppercase();
            if upper == symbol {
                rates.insert(upper, rate);
            } else {
                // An exact uppercase key wins over a lowercased duplicate.
                rates.entry(upper).or_insert(rate);
            }
        }
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", "USD"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(uri: &str) -> OpenRatesProvider {
        OpenRatesProvider::new(uri, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_response = r#"{
            "base": "USD",
            "date": "2020-03-06",
            "rates": {"EUR": 0.9, "jpy": 105.2, "GBP": 0.77}
        }"#;
        let mock_server = create_mock_server(200, mock_response).await;

        let rates = provider(&mock_server.uri()).fetch_rates("USD").await.unwrap();
        assert_eq!(rates.len(), 3);
        assert_eq!(rates.get("EUR"), Some(&0.9));
        assert_eq!(rates.get("JPY"), Some(&105.2));
    }

    #[tokio::test]
    async fn test_uppercase_key_wins_over_lowercase_duplicate() {
        let mock_server =
            create_mock_server(200, r#"{"rates": {"eur": 1.0, "EUR": 0.9, "Jpy": 105.0}}"#).await;

        let rates = provider(&mock_server.uri()).fetch_rates("USD").await.unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates.get("EUR"), Some(&0.9));
        assert_eq!(rates.get("JPY"), Some(&105.0));
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let mock_server = create_mock_server(200, r#"{"rates": {"EUR": 0.9}}"#).await;
        let base_url = format!("{}/", mock_server.uri());

        let rates = provider(&base_url).fetch_rates("USD").await.unwrap();
        assert_eq!(rates.get("EUR"), Some(&0.9));
    }

    #[tokio::test]
    async fn test_server_error_response() {
        let mock_server = create_mock_server(500, "").await;

        let result = provider(&mock_server.uri()).fetch_rates("USD").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("HTTP error: 500 Internal Server Error")
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        // "rate" instead of "rates"
        let mock_server = create_mock_server(200, r#"{"rate": {"EUR": 0.9}}"#).await;

        let result = provider(&mock_server.uri()).fetch_rates("USD").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for base USD")
        );
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"rates": {}}"#)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let provider = OpenRatesProvider::new(&mock_server.uri(), Duration::from_millis(50)).unwrap();
        let result = provider.fetch_rates("USD").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Request error"));
    }
}
