//! Tile-like sources as seen by a rendering layer.

mod mvt;

pub use mvt::*;

use crate::client::LayerCallback;
use anyhow::Result;
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use tileflow_core::{Cancelable, DatasetMetadata, Viewport};

/// A source serving its data as tiles.
#[async_trait]
pub trait TiledSource: Debug + Send + Sync {
	/// Name of the decoder family, sent to the decode worker.
	fn source_kind(&self) -> &'static str;

	/// Register the callback receiving every newly loaded, non-empty dataframe.
	fn bind_layer(&self, notify: LayerCallback);

	/// Start a viewport update; see [`TileClient::request_data`](crate::client::TileClient::request_data).
	fn request_data(&self, zoom: f64, viewport: &Viewport) -> Result<Cancelable<bool>>;

	async fn request_metadata(&self) -> Result<Arc<DatasetMetadata>>;

	fn remove_from_cache(&self, key: &str) -> bool;

	/// Release cached tiles and the decode worker.
	fn free(&self);

	/// An independent source with the same configuration and no cached state.
	fn clone_source(&self) -> Result<Box<dyn TiledSource>>;
}
