//! Mapping a viewport onto the set of tiles that cover it.
//!
//! The coordinator treats this as a pure geometric function. [`WebMercatorCover`] is the
//! default; any `Fn(u8, &Viewport) -> Result<Vec<TileCoord>>` closure can be used instead.

use crate::{TileCoord, Viewport};
use anyhow::{Result, ensure};

/// Upper bound for the number of tiles a single cover may produce.
pub const MAX_COVER_TILES: u64 = 1 << 16;

/// Computes the tiles needed to render a viewport at a given source zoom level.
pub trait TileCover: Send + Sync {
	fn tiles(&self, z: u8, viewport: &Viewport) -> Result<Vec<TileCoord>>;
}

impl<F> TileCover for F
where
	F: Fn(u8, &Viewport) -> Result<Vec<TileCoord>> + Send + Sync,
{
	fn tiles(&self, z: u8, viewport: &Viewport) -> Result<Vec<TileCoord>> {
		self(z, viewport)
	}
}

/// Covers the viewport with every Web Mercator tile it touches, row by row from the north.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercatorCover;

impl TileCover for WebMercatorCover {
	fn tiles(&self, z: u8, viewport: &Viewport) -> Result<Vec<TileCoord>> {
		// Nudge the edges inwards so a viewport ending exactly on a tile border
		// does not pull in the neighbouring row or column.
		let nw = TileCoord::from_geo(viewport.west + 1e-10, viewport.north - 1e-10, z)?;
		let se = TileCoord::from_geo(viewport.east - 1e-10, viewport.south + 1e-10, z)?;

		let (x_min, x_max) = (nw.x.min(se.x), nw.x.max(se.x));
		let (y_min, y_max) = (nw.y.min(se.y), nw.y.max(se.y));
		let count = u64::from(x_max - x_min + 1) * u64::from(y_max - y_min + 1);
		ensure!(
			count <= MAX_COVER_TILES,
			"viewport {viewport:?} needs {count} tiles at zoom {z}, more than the limit of {MAX_COVER_TILES}"
		);

		let mut tiles = Vec::with_capacity(count as usize);
		for y in y_min..=y_max {
			for x in x_min..=x_max {
				tiles.push(TileCoord { x, y, z });
			}
		}
		Ok(tiles)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn coords(list: &[(u32, u32, u8)]) -> Vec<TileCoord> {
		list.iter().map(|&(x, y, z)| TileCoord::new(x, y, z).unwrap()).collect()
	}

	#[test]
	fn world_at_level_one() {
		let tiles = WebMercatorCover.tiles(1, &Viewport::world()).unwrap();
		assert_eq!(tiles, coords(&[(0, 0, 1), (1, 0, 1), (0, 1, 1), (1, 1, 1)]));
	}

	#[test]
	fn quadrant_border_is_not_overshot() {
		// exactly the north-western quadrant of the world
		let viewport = Viewport::new(-180.0, 0.0, 0.0, 85.0).unwrap();
		let tiles = WebMercatorCover.tiles(1, &viewport).unwrap();
		assert_eq!(tiles, coords(&[(0, 0, 1)]));
	}

	#[test]
	fn small_viewport() {
		let viewport = Viewport::new(13.3, 52.4, 13.5, 52.6).unwrap();
		let tiles = WebMercatorCover.tiles(10, &viewport).unwrap();
		assert_eq!(tiles, coords(&[(549, 335, 10), (550, 335, 10), (549, 336, 10), (550, 336, 10)]));
	}

	#[test]
	fn too_many_tiles() {
		assert!(WebMercatorCover.tiles(12, &Viewport::world()).is_err());
	}

	#[test]
	fn closures_are_covers() {
		let cover = |z: u8, _: &Viewport| -> Result<Vec<TileCoord>> { Ok(vec![TileCoord::new(0, 0, z)?]) };
		assert_eq!(cover.tiles(0, &Viewport::world()).unwrap(), coords(&[(0, 0, 0)]));
	}
}
