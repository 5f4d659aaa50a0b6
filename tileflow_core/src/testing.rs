//! Helpers for tests in this and downstream crates.

use crate::{Dataframe, DatasetMetadata, TileCoord};
use bytes::Bytes;
use std::sync::Arc;

/// Tile coordinate from literal values.
///
/// # Panics
/// If the coordinate is invalid.
#[must_use]
pub fn tile(x: u32, y: u32, z: u8) -> TileCoord {
	TileCoord::new(x, y, z).unwrap()
}

/// A non-empty dataframe whose feature buffer is the tile's cache key.
#[must_use]
pub fn sample_frame(coord: TileCoord, metadata: &Arc<DatasetMetadata>) -> Dataframe {
	let features = Bytes::from(coord.cache_key());
	Dataframe::new(coord, None, features, 1, Arc::clone(metadata))
}
