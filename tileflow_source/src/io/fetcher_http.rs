//! Fetching tiles over HTTP(S) with `reqwest`.
//!
//! Connection, timeout and body errors are retried up to [`MAX_RETRIES`] times with an
//! exponential back-off of 1 s, 2 s, 4 s. `204 No Content` is an empty tile, any other
//! non-success status is an error.

use super::TileFetcher;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tokio::time::sleep;

pub const MAX_RETRIES: u32 = 3;

fn is_retryable_error(err: &reqwest::Error) -> bool {
	err.is_connect() || err.is_timeout() || err.is_body()
}

/// [`TileFetcher`] issuing plain `GET` requests.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
	client: Client,
	backoff_unit: Duration,
}

impl HttpFetcher {
	pub fn new() -> Result<HttpFetcher> {
		let client = Client::builder()
			.tcp_keepalive(Duration::from_secs(600))
			.timeout(Duration::from_secs(30))
			.build()
			.context("building HTTP client")?;

		Ok(HttpFetcher {
			client,
			backoff_unit: Duration::from_secs(1),
		})
	}

	/// Scale the retry back-off, mainly to keep tests fast.
	#[must_use]
	pub fn with_backoff_unit(mut self, unit: Duration) -> HttpFetcher {
		self.backoff_unit = unit;
		self
	}

	async fn fetch_with_retries(&self, url: &Url) -> Result<Bytes> {
		match url.scheme() {
			"http" | "https" => (),
			other => bail!("unsupported URL scheme '{other}', expected 'http' or 'https'"),
		}

		for attempt in 0..=MAX_RETRIES {
			if attempt > 0 {
				let backoff = self.backoff_unit * (1 << (attempt - 1));
				log::warn!("retry attempt {attempt}/{MAX_RETRIES} fetching '{url}', waiting {backoff:?}");
				sleep(backoff).await;
			}

			let response = match self.client.get(url.clone()).send().await {
				Ok(r) => r,
				Err(e) if is_retryable_error(&e) && attempt < MAX_RETRIES => {
					log::warn!("retryable error: {e}");
					continue;
				}
				Err(e) => return Err(e.into()),
			};

			match response.status() {
				StatusCode::NO_CONTENT => return Ok(Bytes::new()),
				status if status.is_success() => (),
				status => bail!("server answered with HTTP {status}"),
			}

			return match response.bytes().await {
				Ok(bytes) => Ok(bytes),
				Err(e) if is_retryable_error(&e) && attempt < MAX_RETRIES => {
					log::warn!("retryable error reading response body: {e}");
					continue;
				}
				Err(e) => Err(e.into()),
			};
		}

		bail!("giving up after {MAX_RETRIES} retries")
	}
}

#[async_trait]
impl TileFetcher for HttpFetcher {
	async fn fetch(&self, url: &Url) -> Result<Bytes> {
		self.fetch_with_retries(url)
			.await
			.with_context(|| format!("fetching tile '{url}'"))
	}
}
