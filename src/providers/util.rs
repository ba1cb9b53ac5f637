use anyhow::{Context, Result, anyhow};
use std::time::Duration;

pub const USER_AGENT: &str = concat!("fxmod/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by a provider.
///
/// `timeout` bounds every request end to end, so a hung provider only delays
/// the refresh cycle that issued the request.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Sends a GET and returns the body of a successful response.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

    if !response.status().is_success() {
        return Err(anyhow!("HTTP error: {} URL: {}", response.status(), url));
    }

    response
        .text()
        .await
        .with_context(|| format!("Failed to read response body from {url}"))
}
