//! The geographic area currently shown by the renderer.

use anyhow::{Result, ensure};
use std::fmt::{self, Debug};

/// Largest latitude representable in Web Mercator.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A viewport as a geographic bounding box in WGS84 degrees.
///
/// Latitudes beyond the Web Mercator limit are clamped on construction, everything else
/// must already be valid.
///
/// ```
/// use tileflow_core::Viewport;
///
/// let viewport = Viewport::new(-10.0, -5.0, 10.0, 5.0).unwrap();
/// assert_eq!(viewport.as_tuple(), (-10.0, -5.0, 10.0, 5.0));
/// assert!(Viewport::new(10.0, 0.0, -10.0, 5.0).is_err());
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct Viewport {
	pub west: f64,
	pub south: f64,
	pub east: f64,
	pub north: f64,
}

impl Viewport {
	pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Viewport> {
		ensure!(
			west.is_finite() && south.is_finite() && east.is_finite() && north.is_finite(),
			"viewport [{west}, {south}, {east}, {north}] must be finite"
		);
		ensure!(west >= -180.0, "west ({west}) must be >= -180");
		ensure!(east <= 180.0, "east ({east}) must be <= 180");
		ensure!(west <= east, "west ({west}) must be <= east ({east})");
		ensure!(south <= north, "south ({south}) must be <= north ({north})");

		Ok(Viewport {
			west,
			south: south.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT),
			east,
			north: north.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT),
		})
	}

	/// The whole Web Mercator world.
	#[must_use]
	pub fn world() -> Viewport {
		Viewport {
			west: -180.0,
			south: -MAX_MERCATOR_LAT,
			east: 180.0,
			north: MAX_MERCATOR_LAT,
		}
	}

	/// Parse `"west,south,east,north"`.
	pub fn parse(text: &str) -> Result<Viewport> {
		let values = text
			.split(',')
			.map(|v| v.trim().parse::<f64>())
			.collect::<Result<Vec<f64>, _>>()?;
		ensure!(
			values.len() == 4,
			"viewport '{text}' must have four comma separated values: west,south,east,north"
		);
		Viewport::new(values[0], values[1], values[2], values[3])
	}

	#[must_use]
	pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
		(self.west, self.south, self.east, self.north)
	}
}

impl Debug for Viewport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Viewport[{}, {}, {}, {}]", self.west, self.south, self.east, self.north)
	}
}
