//! Client side of the decode worker.
//!
//! [`DecodeDispatch`] owns the worker of one source. It starts the worker on the first
//! dispatch, numbers every request with a correlation id and waits for the matching reply in
//! its [`PendingCalls`] table. Replies are routed by a task per worker instance.
//!
//! An abort reply fails the waiting call. When the call was made by a tile cache fetch, that
//! failure evicts exactly the cache entry the fetch was started for, never a newer entry for
//! the same key. The first non-empty payload that carries discovered metadata fills the
//! source's shared [`DatasetMetadata`].

use super::{DecodeReply, DecodeRequest, PendingCalls, WirePayload, WorkerHandle};
use crate::{
	client::{TileLoader, TileRequest},
	decode::TileDecoder,
	io::TileFetcher,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
	fmt::{self, Debug},
	sync::{
		Arc, Weak,
		atomic::{AtomicU64, Ordering},
	},
};
use tileflow_core::{Dataframe, DatasetMetadata, TileCoord};
use tokio::sync::mpsc;

struct DispatchInner {
	source_kind: String,
	layer_id: Option<String>,
	fetcher: Arc<dyn TileFetcher>,
	decoder: Arc<dyn TileDecoder>,
	metadata: Arc<DatasetMetadata>,
	pending: PendingCalls,
	next_id: AtomicU64,
	worker: Mutex<Option<WorkerHandle>>,
}

/// Decode dispatch of one source. Cloning shares the worker and the pending calls.
#[derive(Clone)]
pub struct DecodeDispatch {
	inner: Arc<DispatchInner>,
}

impl DecodeDispatch {
	pub fn new(
		source_kind: &str,
		layer_id: Option<String>,
		metadata: Arc<DatasetMetadata>,
		fetcher: Arc<dyn TileFetcher>,
		decoder: Arc<dyn TileDecoder>,
	) -> DecodeDispatch {
		DecodeDispatch {
			inner: Arc::new(DispatchInner {
				source_kind: source_kind.to_string(),
				layer_id,
				fetcher,
				decoder,
				metadata,
				pending: PendingCalls::new(),
				next_id: AtomicU64::new(0),
				worker: Mutex::new(None),
			}),
		}
	}

	/// Decode one tile through the worker.
	///
	/// Fails if the worker aborts the tile or stops before answering.
	pub async fn dispatch(&self, coord: TileCoord, url: &str, siblings: Vec<TileCoord>) -> Result<Dataframe> {
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		let reply = self.inner.pending.register(id)?;

		if let Err(e) = self.inner.post(id, coord, url, siblings) {
			self.inner.pending.forget(id);
			return Err(e);
		}

		let payload = reply
			.await
			.map_err(|_| anyhow!("decode worker stopped before answering request {id} for tile {coord}"))??;
		Ok(self.inner.to_dataframe(coord, payload))
	}

	/// Stop the current worker. Queued requests still get answered; the next dispatch starts
	/// a new worker and sends it the metadata again.
	pub fn free(&self) {
		if self.inner.worker.lock().take().is_some() {
			log::debug!("released {} decode worker", self.inner.source_kind);
		}
	}

	#[must_use]
	pub fn metadata(&self) -> &Arc<DatasetMetadata> {
		&self.inner.metadata
	}

	#[must_use]
	pub fn has_worker(&self) -> bool {
		self.inner.worker.lock().is_some()
	}

	/// Number of calls waiting for a reply.
	#[must_use]
	pub fn pending_calls(&self) -> usize {
		self.inner.pending.len()
	}
}

impl DispatchInner {
	fn post(self: &Arc<Self>, id: u64, coord: TileCoord, url: &str, siblings: Vec<TileCoord>) -> Result<()> {
		let mut worker = self.worker.lock();
		let first_request = worker.is_none();
		let handle = worker.get_or_insert_with(|| self.start_worker());

		handle.post(DecodeRequest {
			x: coord.x,
			y: coord.y,
			z: coord.z,
			url: url.to_string(),
			layer_id: self.layer_id.clone(),
			metadata: first_request.then(|| self.metadata.declared_copy()),
			id,
			source_kind: self.source_kind.clone(),
			tile_siblings: siblings,
		})
	}

	fn start_worker(self: &Arc<Self>) -> WorkerHandle {
		log::debug!("starting {} decode worker", self.source_kind);
		let (tx, rx) = mpsc::unbounded_channel();
		tokio::spawn(route_replies(rx, Arc::downgrade(self)));
		WorkerHandle::spawn(Arc::clone(&self.fetcher), Arc::clone(&self.decoder), tx)
	}

	fn handle_reply(&self, reply: DecodeReply) {
		match reply {
			DecodeReply::Payload { id, payload } => {
				self.pending.resolve(id, Ok(payload));
			}
			DecodeReply::Abort { id, key, .. } => {
				log::warn!("decode worker aborted tile {key} (request {id})");
				self.pending.resolve(id, Err(anyhow!("decode of tile {key} aborted")));
			}
		}
	}

	fn to_dataframe(&self, coord: TileCoord, payload: WirePayload) -> Dataframe {
		let metadata = Arc::clone(&self.metadata);
		if payload.empty {
			return Dataframe::new_empty(coord, metadata);
		}
		if let Some(discovered) = payload.metadata
			&& metadata.adopt(discovered)
		{
			log::debug!("captured dataset metadata from tile {coord}");
		}
		Dataframe::new(coord, payload.geom_type, payload.features, payload.num_features, metadata)
	}
}

async fn route_replies(mut replies: mpsc::UnboundedReceiver<DecodeReply>, dispatch: Weak<DispatchInner>) {
	while let Some(reply) = replies.recv().await {
		let Some(dispatch) = dispatch.upgrade() else {
			log::trace!("decode dispatch dropped, discarding reply {}", reply.id());
			continue;
		};
		dispatch.handle_reply(reply);
	}
}

#[async_trait]
impl TileLoader for DecodeDispatch {
	async fn load(&self, request: TileRequest) -> Result<Dataframe> {
		self.dispatch(request.coord, request.url.as_str(), request.siblings)
			.await
	}
}

impl Debug for DecodeDispatch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DecodeDispatch")
			.field("source_kind", &self.inner.source_kind)
			.field("layer_id", &self.inner.layer_id)
			.field("worker", &self.has_worker())
			.field("pending", &self.pending_calls())
			.finish()
	}
}
