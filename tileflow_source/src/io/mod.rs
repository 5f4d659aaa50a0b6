//! Transport used by the decode worker to load raw tile bytes.

mod fetcher_http;

pub use fetcher_http::*;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use std::fmt::Debug;

/// Loads the raw bytes of one tile.
///
/// An empty body means the tile exists but holds no data.
#[async_trait]
pub trait TileFetcher: Debug + Send + Sync {
	async fn fetch(&self, url: &Url) -> Result<Bytes>;
}
