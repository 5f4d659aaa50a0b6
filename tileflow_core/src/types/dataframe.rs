//! Decoded tile payload handed to the renderer.
//!
//! A [`Dataframe`] is created once per decoded tile and then shared as `Arc<Dataframe>`
//! between the tile cache, the coordinator's active set and the rendering layer. The only
//! state that changes after creation is the `active` flag, which the coordinator flips on
//! every committed viewport update.

use crate::{DatasetMetadata, GeometryType, TileCoord};
use bytes::Bytes;
use std::{
	fmt::{self, Debug},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

pub struct Dataframe {
	coord: TileCoord,
	geom_type: Option<GeometryType>,
	features: Bytes,
	num_features: usize,
	empty: bool,
	active: AtomicBool,
	order_id: f64,
	metadata: Arc<DatasetMetadata>,
}

impl Dataframe {
	/// A tile that decoded to features.
	#[must_use]
	pub fn new(
		coord: TileCoord,
		geom_type: Option<GeometryType>,
		features: Bytes,
		num_features: usize,
		metadata: Arc<DatasetMetadata>,
	) -> Dataframe {
		Dataframe {
			coord,
			geom_type,
			features,
			num_features,
			empty: false,
			active: AtomicBool::new(false),
			order_id: coord.order_id(),
			metadata,
		}
	}

	/// A tile without any features.
	#[must_use]
	pub fn new_empty(coord: TileCoord, metadata: Arc<DatasetMetadata>) -> Dataframe {
		Dataframe {
			coord,
			geom_type: None,
			features: Bytes::new(),
			num_features: 0,
			empty: true,
			active: AtomicBool::new(false),
			order_id: coord.order_id(),
			metadata,
		}
	}

	#[must_use]
	pub fn with_order_id(mut self, order_id: f64) -> Dataframe {
		self.order_id = order_id;
		self
	}

	#[must_use]
	pub fn coord(&self) -> &TileCoord {
		&self.coord
	}

	/// Geometry type reported by the decoder, falling back to the one of the dataset.
	#[must_use]
	pub fn geom_type(&self) -> Option<GeometryType> {
		self.geom_type.or_else(|| self.metadata.geom_type())
	}

	#[must_use]
	pub fn features(&self) -> &Bytes {
		&self.features
	}

	#[must_use]
	pub fn num_features(&self) -> usize {
		self.num_features
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.empty
	}

	#[must_use]
	pub fn is_active(&self) -> bool {
		self.active.load(Ordering::Acquire)
	}

	pub fn set_active(&self, active: bool) {
		self.active.store(active, Ordering::Release);
	}

	#[must_use]
	pub fn order_id(&self) -> f64 {
		self.order_id
	}

	#[must_use]
	pub fn metadata(&self) -> &Arc<DatasetMetadata> {
		&self.metadata
	}
}

impl Debug for Dataframe {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dataframe")
			.field("coord", &self.coord)
			.field("geom_type", &self.geom_type())
			.field("num_features", &self.num_features)
			.field("bytes", &self.features.len())
			.field("empty", &self.empty)
			.field("active", &self.is_active())
			.field("order_id", &self.order_id)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::DiscoveredMetadata;

	#[test]
	fn empty_and_active_flags() {
		let meta = Arc::new(DatasetMetadata::default());
		let coord = TileCoord::new(2, 1, 3).unwrap();

		let empty = Dataframe::new_empty(coord, meta.clone());
		assert!(empty.is_empty());
		assert_eq!(empty.num_features(), 0);

		let frame = Dataframe::new(coord, None, Bytes::from_static(b"abc"), 3, meta);
		assert!(!frame.is_empty());
		assert!(!frame.is_active());
		frame.set_active(true);
		assert!(frame.is_active());
		assert!((frame.order_id() - 2.001).abs() < 1e-12);
		assert_eq!(frame.with_order_id(7.0).order_id(), 7.0);
	}

	#[test]
	fn geom_type_falls_back_to_shared_metadata() {
		let meta = Arc::new(DatasetMetadata::default());
		let coord = TileCoord::new(0, 0, 0).unwrap();
		let frame = Dataframe::new(coord, None, Bytes::new(), 0, meta.clone());
		assert_eq!(frame.geom_type(), None);

		meta.adopt(DiscoveredMetadata::from_categories(Vec::<String>::new(), Some(GeometryType::Polygon)));
		assert_eq!(frame.geom_type(), Some(GeometryType::Polygon));
		assert!(Arc::ptr_eq(frame.metadata(), &meta));

		let debug = format!("{frame:?}");
		assert!(debug.contains("Polygon"), "{debug}");
	}
}
