use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use tileflow_core::{Dataframe, TileCoord};

/// One tile the [`TileClient`](super::TileClient) needs.
#[derive(Clone, Debug, PartialEq)]
pub struct TileRequest {
	pub coord: TileCoord,
	pub url: Url,
	/// All tiles of the viewport update this tile belongs to.
	pub siblings: Vec<TileCoord>,
}

/// Turns a tile request into a decoded dataframe.
#[async_trait]
pub trait TileLoader: Send + Sync {
	async fn load(&self, request: TileRequest) -> Result<Dataframe>;
}
