use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::CurrencyRateProvider;
use crate::providers::util::{build_client, get_text};

/// Secondary provider: one pair per request, answered with a bare decimal body.
pub struct GrandTrunkProvider {
    base_url: String,
    client: reqwest::Client,
}

impl GrandTrunkProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(GrandTrunkProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl CurrencyRateProvider for GrandTrunkProvider {
    #[instrument(name = "GrandTrunkFetch", skip(self), fields(pair = %format!("{from}/{to}")))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let url = format!("{}/getlatest/{}/{}", self.base_url, from, to);
        debug!("Requesting currency rate from {}", url);

        let text = get_text(&self.client, &url).await?;
        let rate = text.trim().parse::<f64>().map_err(|e| {
            anyhow!(
                "Failed to parse rate for currency pair {}/{}: {} (body: {:?})",
                from,
                to,
                e,
                text.trim()
            )
        })?;

        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(to: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/getlatest/USD/{to}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(uri: &str) -> GrandTrunkProvider {
        GrandTrunkProvider::new(uri, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_server = create_mock_server("UAH", 200, "27.45\n").await;

        let rate = provider(&mock_server.uri())
            .get_rate("USD", "UAH")
            .await
            .expect("Failed to get rate");
        assert_eq!(rate, 27.45);
    }

    #[tokio::test]
    async fn test_unparsable_body() {
        let mock_server = create_mock_server("IRR", 200, "False").await;

        let result = provider(&mock_server.uri()).get_rate("USD", "IRR").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse rate for currency pair USD/IRR")
        );
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let mock_server = create_mock_server("UAH", 404, "").await;

        let result = provider(&mock_server.uri()).get_rate("USD", "UAH").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("HTTP error: 404 Not Found")
        );
    }
}
