//! Table of decode calls waiting for a worker reply.
//!
//! Every correlation id maps to one one-shot sender. An id can be registered once and
//! resolved once; resolving removes it, so a duplicate or unknown reply finds nothing and is
//! dropped.

use super::WirePayload;
use anyhow::{Result, ensure};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

pub type CallResult = Result<WirePayload>;

#[derive(Debug, Default)]
pub struct PendingCalls {
	calls: Mutex<HashMap<u64, oneshot::Sender<CallResult>>>,
}

impl PendingCalls {
	#[must_use]
	pub fn new() -> PendingCalls {
		PendingCalls::default()
	}

	/// Register `id` and get the receiver its result will arrive on.
	pub fn register(&self, id: u64) -> Result<oneshot::Receiver<CallResult>> {
		let mut calls = self.calls.lock();
		ensure!(!calls.contains_key(&id), "decode call {id} is already pending");
		let (tx, rx) = oneshot::channel();
		calls.insert(id, tx);
		Ok(rx)
	}

	/// Resolve `id` with `result`. Returns `false` if no call with this id is pending.
	pub fn resolve(&self, id: u64, result: CallResult) -> bool {
		let Some(tx) = self.calls.lock().remove(&id) else {
			log::warn!("ignoring reply for unknown or already resolved decode call {id}");
			return false;
		};
		if tx.send(result).is_err() {
			log::trace!("caller of decode call {id} is gone");
		}
		true
	}

	/// Drop a registration whose request could not be sent.
	pub fn forget(&self, id: u64) {
		self.calls.lock().remove(&id);
	}

	pub fn len(&self) -> usize {
		self.calls.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.calls.lock().is_empty()
	}
}
