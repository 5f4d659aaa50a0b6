//! The decode worker.
//!
//! A worker receives [`DecodeRequest`]s on an unbounded channel and answers each one with a
//! [`DecodeReply`] on its reply channel. Every request is handled on its own task: the tile is
//! loaded through the [`TileFetcher`] and decoded on the blocking pool through the
//! [`TileDecoder`], so replies may come back in any order. Failures are reported as aborts
//! carrying the tile's cache key.
//!
//! Dropping the [`WorkerHandle`] closes the request channel. Requests already queued are still
//! processed and answered.

use super::{DecodeReply, DecodeRequest, WirePayload};
use crate::{
	decode::{DecodeJob, TileDecoder},
	io::TileFetcher,
};
use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use std::sync::Arc;
use tileflow_core::DatasetMetadata;
use tokio::sync::mpsc;

/// Sending side of a running decode worker.
#[derive(Debug)]
pub struct WorkerHandle {
	requests: mpsc::UnboundedSender<DecodeRequest>,
}

impl WorkerHandle {
	/// Start a worker task on the current runtime. Replies go to `replies`.
	pub fn spawn(
		fetcher: Arc<dyn TileFetcher>,
		decoder: Arc<dyn TileDecoder>,
		replies: mpsc::UnboundedSender<DecodeReply>,
	) -> WorkerHandle {
		let (requests, rx) = mpsc::unbounded_channel();
		tokio::spawn(run_worker(rx, fetcher, decoder, replies));
		WorkerHandle { requests }
	}

	pub fn post(&self, request: DecodeRequest) -> Result<()> {
		self.requests
			.send(request)
			.map_err(|e| anyhow!("decode worker has stopped, cannot send request {}", e.0.id))
	}
}

async fn run_worker(
	mut requests: mpsc::UnboundedReceiver<DecodeRequest>,
	fetcher: Arc<dyn TileFetcher>,
	decoder: Arc<dyn TileDecoder>,
	replies: mpsc::UnboundedSender<DecodeReply>,
) {
	log::debug!("decode worker started");
	let mut metadata: Option<Arc<DatasetMetadata>> = None;

	while let Some(mut request) = requests.recv().await {
		if let Some(received) = request.metadata.take()
			&& metadata.is_none()
		{
			log::debug!("decode worker received dataset metadata with request {}", request.id);
			metadata = Some(Arc::new(received));
		}

		let fetcher = Arc::clone(&fetcher);
		let decoder = Arc::clone(&decoder);
		let metadata = metadata.clone();
		let replies = replies.clone();
		tokio::spawn(async move {
			let reply = handle_request(request, fetcher.as_ref(), decoder, metadata).await;
			if replies.send(reply).is_err() {
				log::trace!("reply channel closed, dropping decode reply");
			}
		});
	}

	log::debug!("decode worker stopped");
}

async fn handle_request(
	request: DecodeRequest,
	fetcher: &dyn TileFetcher,
	decoder: Arc<dyn TileDecoder>,
	metadata: Option<Arc<DatasetMetadata>>,
) -> DecodeReply {
	let id = request.id;
	let key = request.key();
	match decode_tile(request, fetcher, decoder, metadata).await {
		Ok(payload) => DecodeReply::payload(id, payload),
		Err(e) => {
			log::warn!("aborting decode of tile {key}: {e:#}");
			DecodeReply::abort(id, key)
		}
	}
}

async fn decode_tile(
	request: DecodeRequest,
	fetcher: &dyn TileFetcher,
	decoder: Arc<dyn TileDecoder>,
	metadata: Option<Arc<DatasetMetadata>>,
) -> Result<WirePayload> {
	let url = Url::parse(&request.url).with_context(|| format!("invalid tile URL '{}'", request.url))?;
	let bytes = fetcher.fetch(&url).await?;

	let job = DecodeJob {
		coord: request.coord(),
		layer_id: request.layer_id,
		source_kind: request.source_kind,
		bytes,
		metadata,
		siblings: request.tile_siblings,
	};
	tokio::task::spawn_blocking(move || decoder.decode(&job))
		.await
		.context("decode task failed")?
}
