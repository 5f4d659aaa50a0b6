//! Translating the renderer's fractional viewport zoom into an integer source zoom.
//!
//! A [`ZoomPolicy`] combines a [`ZoomMapping`] (ceiling by default) with an optional maximum
//! source zoom. The mapped value is validated on every call, so a misbehaving custom mapping
//! fails fast instead of producing a corrupted tile set.

use crate::MAX_ZOOM_LEVEL;
use anyhow::{Result, bail, ensure};
use serde::Deserialize;
use std::{fmt, str::FromStr, sync::Arc};

/// Function used by [`ZoomMapping::Custom`].
pub type ZoomFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// How a viewport zoom is turned into a source zoom before clamping.
#[derive(Clone, Default)]
pub enum ZoomMapping {
	#[default]
	Ceil,
	Floor,
	Round,
	/// Arbitrary mapping, e.g. only requesting every third zoom level.
	Custom(ZoomFn),
}

impl ZoomMapping {
	pub fn custom<F>(f: F) -> ZoomMapping
	where
		F: Fn(f64) -> f64 + Send + Sync + 'static,
	{
		ZoomMapping::Custom(Arc::new(f))
	}

	#[must_use]
	pub fn apply(&self, zoom: f64) -> f64 {
		match self {
			ZoomMapping::Ceil => zoom.ceil(),
			ZoomMapping::Floor => zoom.floor(),
			ZoomMapping::Round => zoom.round(),
			ZoomMapping::Custom(f) => f(zoom),
		}
	}
}

impl fmt::Debug for ZoomMapping {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ZoomMapping::Ceil => f.write_str("Ceil"),
			ZoomMapping::Floor => f.write_str("Floor"),
			ZoomMapping::Round => f.write_str("Round"),
			ZoomMapping::Custom(_) => f.write_str("Custom(..)"),
		}
	}
}

/// Custom mappings are equal only to themselves.
impl PartialEq for ZoomMapping {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(ZoomMapping::Ceil, ZoomMapping::Ceil)
			| (ZoomMapping::Floor, ZoomMapping::Floor)
			| (ZoomMapping::Round, ZoomMapping::Round) => true,
			(ZoomMapping::Custom(a), ZoomMapping::Custom(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl FromStr for ZoomMapping {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self> {
		Ok(match s.to_ascii_lowercase().as_str() {
			"ceil" => ZoomMapping::Ceil,
			"floor" => ZoomMapping::Floor,
			"round" => ZoomMapping::Round,
			other => bail!("unknown zoom mapping '{other}', expected one of: ceil, floor, round"),
		})
	}
}

impl<'de> Deserialize<'de> for ZoomMapping {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let text = String::deserialize(deserializer)?;
		text.parse().map_err(serde::de::Error::custom)
	}
}

/// Viewport zoom → source zoom, optionally capped at `max_zoom`.
#[derive(Clone, Debug, Default)]
pub struct ZoomPolicy {
	pub mapping: ZoomMapping,
	pub max_zoom: Option<u8>,
}

impl ZoomPolicy {
	pub fn new(mapping: ZoomMapping, max_zoom: Option<u8>) -> Result<ZoomPolicy> {
		if let Some(max_zoom) = max_zoom {
			ensure!(
				max_zoom <= MAX_ZOOM_LEVEL,
				"max_zoom ({max_zoom}) must be <= {MAX_ZOOM_LEVEL}"
			);
		}
		Ok(ZoomPolicy { mapping, max_zoom })
	}

	/// Map a viewport zoom to the integer zoom level whose tiles are requested.
	pub fn source_zoom(&self, zoom: f64) -> Result<u8> {
		ensure!(zoom.is_finite(), "viewport zoom ({zoom}) must be finite");

		let mapped = self.mapping.apply(zoom);
		ensure!(
			mapped.is_finite(),
			"zoom mapping {:?} turned zoom {zoom} into the non-finite value {mapped}",
			self.mapping
		);

		let mapped = match self.max_zoom {
			Some(max_zoom) => mapped.min(f64::from(max_zoom)),
			None => mapped,
		};
		ensure!(
			(0.0..=f64::from(MAX_ZOOM_LEVEL)).contains(&mapped) && mapped.fract() == 0.0,
			"zoom mapping {:?} turned zoom {zoom} into {mapped}, expected an integer in 0..={MAX_ZOOM_LEVEL}",
			self.mapping
		);
		Ok(mapped as u8)
	}
}
