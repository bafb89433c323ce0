//! Joke and quote content services

use async_trait::async_trait;
use chatbridge_core::config::ContentConfig;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::base::{ContentSource, ProviderError, ProviderResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

fn http_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> ProviderResult<T> {
    debug!("GET {}", url);
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ProviderError::ApiError(format!(
            "HTTP {}: {}",
            status, error_text
        )));
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[derive(Debug, Deserialize)]
struct Joke {
    setup: String,
    punchline: String,
}

/// Random joke service returning `{setup, punchline}`
pub struct JokeClient {
    client: Client,
    url: String,
}

impl JokeClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ContentSource for JokeClient {
    async fn fetch(&self) -> ProviderResult<String> {
        let joke: Joke = get_json(&self.client, &self.url).await?;
        Ok(format!("{}\n{}", joke.setup, joke.punchline))
    }

    fn name(&self) -> &str {
        "joke"
    }
}

#[derive(Debug, Deserialize)]
struct Quote {
    q: String,
    a: String,
}

/// Random quote service returning `[{q, a}, ...]`
pub struct QuoteClient {
    client: Client,
    url: String,
}

impl QuoteClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ContentSource for QuoteClient {
    async fn fetch(&self) -> ProviderResult<String> {
        let quotes: Vec<Quote> = get_json(&self.client, &self.url).await?;
        let quote = quotes
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("Empty quote list".to_string()))?;
        Ok(format!("\"{}\"\n- {}", quote.q, quote.a))
    }

    fn name(&self) -> &str {
        "quote"
    }
}

/// Build both content clients from the `content` section
pub fn content_sources(config: &ContentConfig) -> (JokeClient, QuoteClient) {
    (
        JokeClient::new(config.joke_url.clone()),
        QuoteClient::new(config.quote_url.clone()),
    )
}
