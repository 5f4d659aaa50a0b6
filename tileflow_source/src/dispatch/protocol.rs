//! Messages exchanged with the decode worker.
//!
//! Field names are camelCase on the wire, so the worker can live out of process as well:
//!
//! ```json
//! {"x":1,"y":0,"z":2,"url":"https://a.tiles.test/2/1/0.mvt","layerId":null,"id":7,"sourceKind":"MVT","tileSiblings":[{"x":1,"y":0,"z":2}]}
//! {"id":7,"payload":{"empty":false,"geomType":"point","numFeatures":3,"features":[...]}}
//! {"id":8,"type":"abort","key":"2,0,2"}
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tileflow_core::{DatasetMetadata, DiscoveredMetadata, GeometryType, TileCoord};

/// One decode request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeRequest {
	pub x: u32,
	pub y: u32,
	pub z: u8,
	pub url: String,
	#[serde(default)]
	pub layer_id: Option<String>,
	/// Only present on the first request a worker instance receives.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<DatasetMetadata>,
	pub id: u64,
	pub source_kind: String,
	#[serde(default)]
	pub tile_siblings: Vec<TileCoord>,
}

impl DecodeRequest {
	#[must_use]
	pub fn coord(&self) -> TileCoord {
		TileCoord {
			x: self.x,
			y: self.y,
			z: self.z,
		}
	}

	/// Cache key of the requested tile, as sent back in aborts.
	#[must_use]
	pub fn key(&self) -> String {
		format!("{},{},{}", self.x, self.y, self.z)
	}
}

/// A decoded tile as the worker reports it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePayload {
	#[serde(default)]
	pub empty: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub geom_type: Option<GeometryType>,
	#[serde(default)]
	pub num_features: usize,
	#[serde(default)]
	pub features: Bytes,
	/// Categories and geometry type learned while decoding.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<DiscoveredMetadata>,
}

impl WirePayload {
	#[must_use]
	pub fn empty() -> WirePayload {
		WirePayload {
			empty: true,
			..Default::default()
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
	Abort,
}

/// Worker reply, matched to its request by `id` only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecodeReply {
	Abort {
		id: u64,
		#[serde(rename = "type")]
		kind: ReplyKind,
		key: String,
	},
	Payload {
		id: u64,
		payload: WirePayload,
	},
}

impl DecodeReply {
	#[must_use]
	pub fn abort(id: u64, key: String) -> DecodeReply {
		DecodeReply::Abort {
			id,
			kind: ReplyKind::Abort,
			key,
		}
	}

	#[must_use]
	pub fn payload(id: u64, payload: WirePayload) -> DecodeReply {
		DecodeReply::Payload { id, payload }
	}

	#[must_use]
	pub fn id(&self) -> u64 {
		match self {
			DecodeReply::Abort { id, .. } | DecodeReply::Payload { id, .. } => *id,
		}
	}
}
