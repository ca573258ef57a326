use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::inputs::ProxyCredential;

/// Additional attempts after the first failed request.
const MAX_RETRIES: u32 = 3;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable request configuration shared by every worker.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub proxies: Vec<ProxyCredential>,
}

impl ClientConfig {
    /// Pick a proxy uniformly at random, if any are configured.
    pub fn pick_proxy(&self) -> Option<&ProxyCredential> {
        self.proxies.choose(&mut rand::thread_rng())
    }
}

/// Header set matching what Chrome sends to relay.link.
///
/// `Accept-Encoding` is left to reqwest so response decompression stays
/// transparent.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(header::ORIGIN, HeaderValue::from_static("https://relay.link"));
    headers.insert(header::REFERER, HeaderValue::from_static("https://relay.link/"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-site"));
    headers.insert(
        "sec-ch-ua",
        HeaderValue::from_static(
            "\"Chromium\";v=\"140\", \"Not=A?Brand\";v=\"24\", \"Google Chrome\";v=\"140\"",
        ),
    );
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
    headers
}

/// Build a fresh client for one request attempt.
///
/// Each attempt gets its own session so a proxy choice never outlives the
/// request that used it; the session is dropped when the attempt finishes.
pub fn build_session(cfg: &ClientConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .default_headers(browser_headers())
        .timeout(REQUEST_TIMEOUT);

    if let Some(proxy) = cfg.pick_proxy() {
        builder = builder
            .proxy(reqwest::Proxy::http(&proxy.http_url)?)
            .proxy(reqwest::Proxy::https(&proxy.https_url)?);
    }

    Ok(builder.build()?)
}

/// Exponential backoff with sub-second jitter: `2^attempt + uniform(0, 1)`.
fn backoff_delay(attempt: u32) -> Duration {
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    Duration::from_secs_f64(f64::from(2u32.pow(attempt)) + jitter)
}

async fn try_get<T>(cfg: &ClientConfig, url: &str, query: &[(&str, &str)]) -> Result<T>
where
    T: DeserializeOwned,
{
    let session = build_session(cfg)?;
    let response = session
        .get(url)
        .query(query)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json::<T>().await?)
}

/// GET `url` and decode the JSON body, retrying on any failure.
///
/// A failed send, a non-2xx status, and an undecodable body all count as
/// failed attempts. Exhausted retries yield `None`; errors never escape.
pub async fn get_json<T>(cfg: &ClientConfig, url: &str, query: &[(&str, &str)]) -> Option<T>
where
    T: DeserializeOwned,
{
    for attempt in 0..=MAX_RETRIES {
        match try_get(cfg, url, query).await {
            Ok(value) => return Some(value),
            Err(e) if attempt == MAX_RETRIES => {
                warn!("request to {url} failed after {} attempts: {e}", MAX_RETRIES + 1);
                return None;
            }
            Err(e) => {
                let delay = backoff_delay(attempt);
                warn!(
                    "request attempt {} failed ({e}), retrying in {:.1}s",
                    attempt + 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    None
}
