//! Tile coordinates in a Web Mercator tile pyramid.
//!
//! A [`TileCoord`] addresses one tile by its column `x`, row `y` and zoom level `z`.
//! Besides validation it knows how to turn itself into the string cache key used by the
//! tile cache (`"{x},{y},{z}"`) and into the draw-order value attached to decoded tiles.
//!
//! # Examples
//!
//! ```
//! use tileflow_core::TileCoord;
//!
//! let coord = TileCoord::new(1, 0, 2).unwrap();
//! assert_eq!(coord.cache_key(), "1,0,2");
//! assert_eq!(coord.to_string(), "2/1/0");
//! ```

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::{
	f64::consts::PI,
	fmt::{self, Debug, Display},
};

/// Highest zoom level a tile coordinate may carry.
pub const MAX_ZOOM_LEVEL: u8 = 31;

/// A tile coordinate with column `x`, row `y` and zoom level `z`.
#[derive(Eq, PartialEq, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct TileCoord {
	/// The x index (column) of the tile.
	pub x: u32,
	/// The y index (row) of the tile, counted from the north.
	pub y: u32,
	/// The zoom level of the tile.
	pub z: u8,
}

impl TileCoord {
	/// Create a new `TileCoord`.
	///
	/// # Errors
	/// Returns an error if `z` > 31 or if `x`/`y` are outside `0..2^z`.
	pub fn new(x: u32, y: u32, z: u8) -> Result<TileCoord> {
		ensure!(z <= MAX_ZOOM_LEVEL, "z ({z}) must be <= {MAX_ZOOM_LEVEL}");
		let max = 1u64 << z;
		ensure!(u64::from(x) < max, "x ({x}) out of bounds for zoom level {z}");
		ensure!(u64::from(y) < max, "y ({y}) out of bounds for zoom level {z}");
		Ok(TileCoord { x, y, z })
	}

	/// Create a `TileCoord` containing the geographic position (`lon`, `lat`) at zoom level `z`.
	///
	/// Positions outside the Web Mercator square are clamped onto its border tiles.
	pub fn from_geo(lon: f64, lat: f64, z: u8) -> Result<TileCoord> {
		ensure!(z <= MAX_ZOOM_LEVEL, "z ({z}) must be <= {MAX_ZOOM_LEVEL}");
		ensure!(lon.is_finite() && lat.is_finite(), "position ({lon}, {lat}) must be finite");

		let size = (1u64 << z) as f64;
		let x = size * (lon / 360.0 + 0.5);
		let y = size * (0.5 - 0.5 * (lat * PI / 360.0 + PI / 4.0).tan().ln() / PI);

		let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, size - 1.0).floor() };
		TileCoord::new(clamp(x) as u32, clamp(y) as u32, z)
	}

	/// Key used to identify this tile in the tile cache, formatted as `"{x},{y},{z}"`.
	#[must_use]
	pub fn cache_key(&self) -> String {
		format!("{},{},{}", self.x, self.y, self.z)
	}

	/// Draw order of the tile: columns first, rows as a fractional tie breaker.
	#[must_use]
	pub fn order_id(&self) -> f64 {
		f64::from(self.x) + f64::from(self.y) / 1000.0
	}
}

/// Formats as `z/x/y`, the order used by most URL templates.
impl Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.z, self.x, self.y)
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_fmt(format_args!("TileCoord({}, [{}, {}])", &self.z, &self.x, &self.y))
	}
}

/// Ordering: first by zoom level `z`, then `y`, then `x`.
impl PartialOrd for TileCoord {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for TileCoord {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self
			.z
			.cmp(&other.z)
			.then(self.y.cmp(&other.y))
			.then(self.x.cmp(&other.x))
	}
}
