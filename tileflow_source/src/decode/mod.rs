//! Turning raw tile bytes into a wire payload.
//!
//! Decoders run on Tokio's blocking pool inside the decode worker. The binary tile format is
//! opaque to this crate; [`PassthroughDecoder`] keeps the raw bytes as feature buffer.

use crate::dispatch::WirePayload;
use anyhow::Result;
use bytes::Bytes;
use std::{fmt::Debug, sync::Arc};
use tileflow_core::{DatasetMetadata, DiscoveredMetadata, GeometryType, TileCoord};

/// Everything a decoder gets to see for one tile.
#[derive(Debug, Clone)]
pub struct DecodeJob {
	pub coord: TileCoord,
	pub layer_id: Option<String>,
	pub source_kind: String,
	pub bytes: Bytes,
	/// Metadata the worker received with its first request.
	pub metadata: Option<Arc<DatasetMetadata>>,
	pub siblings: Vec<TileCoord>,
}

pub trait TileDecoder: Debug + Send + Sync {
	fn decode(&self, job: &DecodeJob) -> Result<WirePayload>;
}

/// Keeps the tile bytes undecoded. Zero-length bodies become empty payloads.
#[derive(Debug, Clone, Default)]
pub struct PassthroughDecoder {
	geom_type: Option<GeometryType>,
}

impl PassthroughDecoder {
	#[must_use]
	pub fn new(geom_type: Option<GeometryType>) -> PassthroughDecoder {
		PassthroughDecoder { geom_type }
	}
}

impl TileDecoder for PassthroughDecoder {
	fn decode(&self, job: &DecodeJob) -> Result<WirePayload> {
		if job.bytes.is_empty() {
			return Ok(WirePayload::empty());
		}

		Ok(WirePayload {
			empty: false,
			geom_type: self.geom_type,
			num_features: 1,
			features: job.bytes.clone(),
			metadata: Some(DiscoveredMetadata::from_categories(Vec::<String>::new(), self.geom_type)),
		})
	}
}
