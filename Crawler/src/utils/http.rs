// src/utils/http.rs

//! HTTP client utilities.
//!
//! Every ranking page goes through [`HttpFetcher`]: one request per attempt with a
//! randomly picked User-Agent, exponential backoff with jitter between attempts
//! (driven by `tokio_retry`), and a cap on how much of the body is kept.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};
use reqwest::{Client, Response};
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::get_domain;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Source of raw ranking pages.
///
/// Crawlers only see this trait, so tests can serve canned HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its body as text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Backoff schedule between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub jitter_max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base: Duration::from_millis(config.backoff_base_ms),
            jitter_max: Duration::from_millis(config.backoff_jitter_ms),
        }
    }

    /// Same schedule with a different attempt cap.
    pub fn with_attempts(&self, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..self.clone()
        }
    }

    /// Delay before retrying after failed attempt number `attempt`, without jitter.
    pub fn min_delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(1u32 << attempt.min(16))
    }

    /// `2^attempt * base + random(0, jitter_max)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.min_delay(attempt) + random_jitter(self.jitter_max)
    }
}

fn random_jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

/// Run `attempt_fn` until it succeeds or `policy.max_attempts` is reached.
///
/// The closure receives the 1-based attempt number. Cancelling `cancel` ends
/// the whole run with [`AppError::Cancelled`], whether it is waiting between
/// attempts or inside one.
pub async fn retry_with_backoff<T, F, Fut>(
    url: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut attempt_fn: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let attempts = AtomicU32::new(0);
    let delays = (1..max_attempts).map(|attempt| policy.delay(attempt));

    let retry = RetryIf::spawn(
        delays,
        || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let pending = attempt_fn(attempt);
            async move {
                let result = pending.await;
                match &result {
                    Err(AppError::Cancelled) | Ok(_) => {}
                    Err(error) if attempt < max_attempts => log::warn!(
                        "Request failed, retrying: {} ({}/{}): {}",
                        url,
                        attempt,
                        max_attempts,
                        error
                    ),
                    Err(_) => {}
                }
                result
            }
        },
        |error: &AppError| !matches!(error, AppError::Cancelled),
    );

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AppError::Cancelled),
        result = retry => result,
    };

    match result {
        Ok(value) => Ok(value),
        Err(AppError::Cancelled) => Err(AppError::Cancelled),
        Err(error) => {
            let attempts = attempts.load(Ordering::SeqCst);
            log::warn!("Giving up on {} after {} attempts: {}", url, attempts, error);
            Err(AppError::FetchRetryExhausted {
                url: url.to_string(),
                attempts,
                source: Box::new(error),
            })
        }
    }
}

/// reqwest-backed [`PageFetcher`].
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
    user_agents: Vec<String>,
    accept_language: String,
    max_body_bytes: usize,
    cancel: CancellationToken,
}

impl HttpFetcher {
    /// Build a fetcher; `cancel` aborts retry waits on shutdown.
    pub fn new(config: &CrawlerConfig, cancel: CancellationToken) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        let user_agents: Vec<String> = config
            .user_agents
            .iter()
            .map(|ua| ua.trim().to_string())
            .filter(|ua| !ua.is_empty())
            .collect();
        if user_agents.is_empty() {
            return Err(AppError::config("no User-Agent strings configured"));
        }

        Ok(Self {
            client,
            policy: RetryPolicy::from_config(config),
            user_agents,
            accept_language: config.accept_language.clone(),
            max_body_bytes: config.max_body_bytes,
            cancel,
        })
    }

    /// Fetch a page, retrying up to `max_attempts` times.
    pub async fn fetch_with_retry(&self, url: &str, max_attempts: u32) -> Result<String> {
        let policy = self.policy.with_attempts(max_attempts);
        retry_with_backoff(url, &policy, &self.cancel, |_| self.fetch_once(url)).await
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let user_agent = self.pick_user_agent().to_string();
        log::info!(
            "Requesting {} (host: {})",
            url,
            get_domain(url).unwrap_or_default()
        );

        let mut response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, &self.accept_language)
            .header(CONNECTION, "keep-alive")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let (body, truncated) = read_capped(&mut response, self.max_body_bytes).await?;
        if truncated {
            log::warn!("Body of {} truncated at {} bytes", url, self.max_body_bytes);
        }
        log::debug!("Fetched {} - status {}, {} bytes", url, status, body.len());
        Ok(body)
    }

    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::rng())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.fetch_with_retry(url, self.policy.max_attempts).await
    }
}

/// Read the body chunk by chunk, keeping at most `limit` bytes.
async fn read_capped(response: &mut Response, limit: usize) -> Result<(String, bool)> {
    let mut out: Vec<u8> = Vec::new();
    let mut truncated = false;

    while let Some(chunk) = response.chunk().await? {
        if out.len() + chunk.len() > limit {
            let remaining = limit.saturating_sub(out.len());
            out.extend_from_slice(&chunk[..remaining]);
            truncated = true;
            break;
        }
        out.extend_from_slice(&chunk);
    }

    Ok((String::from_utf8_lossy(&out).into_owned(), truncated))
}
