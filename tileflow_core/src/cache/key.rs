//! Defines the [`CacheKey`] trait used by the tile cache.
//!
//! A `CacheKey` is a human-readable identifier. It must be unique and stable so that
//! requests for the same tile always end up at the same cache entry.

use crate::TileCoord;
use std::{borrow::Cow, fmt::Debug};

/// Trait defining how an object is converted into a unique cache key string.
pub trait CacheKey: Debug {
	/// The cache key, borrowed when the type already is a string.
	fn cache_key(&self) -> Cow<'_, str>;
}

impl CacheKey for String {
	fn cache_key(&self) -> Cow<'_, str> {
		Cow::Borrowed(self)
	}
}

impl CacheKey for &str {
	fn cache_key(&self) -> Cow<'_, str> {
		Cow::Borrowed(self)
	}
}

/// Tiles are stored under `"{x},{y},{z}"`.
impl CacheKey for TileCoord {
	fn cache_key(&self) -> Cow<'_, str> {
		Cow::Owned(TileCoord::cache_key(self))
	}
}
