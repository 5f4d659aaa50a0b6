//! Ordering of overlapping viewport updates.
//!
//! Every viewport update gets the next generation number when it starts. Updates may finish in
//! any order, but only an update whose generation is not lower than the highest committed one
//! may change the shared state. Issuing, committing and superseding all go through the single
//! mutex of a [`GenerationSequence`], so the check and the mutation happen atomically.

use crate::CancelToken;
use parking_lot::Mutex;
use std::fmt::{self, Debug};

struct SequenceState<S> {
	next: u64,
	committed: Option<u64>,
	state: S,
}

/// Generation counter plus the state that only the newest finished generation may change.
pub struct GenerationSequence<S> {
	inner: Mutex<SequenceState<S>>,
}

/// Outcome of [`GenerationSequence::commit`].
#[derive(Debug, PartialEq, Eq)]
pub enum Commit<T> {
	Applied(T),
	/// A newer generation committed first.
	Superseded,
	/// The computation was canceled before it reached the commit.
	Canceled,
}

impl<T> Commit<T> {
	pub fn applied(self) -> Option<T> {
		match self {
			Commit::Applied(value) => Some(value),
			Commit::Superseded | Commit::Canceled => None,
		}
	}
}

impl<S: Default> Default for GenerationSequence<S> {
	fn default() -> Self {
		GenerationSequence::new(S::default())
	}
}

impl<S> GenerationSequence<S> {
	pub fn new(state: S) -> GenerationSequence<S> {
		GenerationSequence {
			inner: Mutex::new(SequenceState {
				next: 0,
				committed: None,
				state,
			}),
		}
	}

	/// Allocate the next generation.
	pub fn issue(&self) -> u64 {
		let mut inner = self.inner.lock();
		let generation = inner.next;
		inner.next += 1;
		generation
	}

	/// Run `apply` on the state if `generation` is still current and `token` is not canceled.
	///
	/// Committing records `generation` as the highest committed one.
	pub fn commit<T>(&self, generation: u64, token: &CancelToken, apply: impl FnOnce(&mut S) -> T) -> Commit<T> {
		let mut inner = self.inner.lock();
		if inner.committed.is_some_and(|committed| generation < committed) {
			log::debug!(
				"discarding generation {generation}, generation {:?} already committed",
				inner.committed
			);
			return Commit::Superseded;
		}
		if token.is_canceled() {
			log::debug!("generation {generation} was canceled before commit");
			return Commit::Canceled;
		}
		inner.committed = Some(generation);
		log::debug!("committing generation {generation}");
		Commit::Applied(apply(&mut inner.state))
	}

	/// Mark every generation issued so far as superseded and reset the state.
	///
	/// Returns the state that was replaced.
	pub fn supersede_all(&self, state: S) -> S {
		let mut inner = self.inner.lock();
		let barrier = inner.next;
		inner.next += 1;
		inner.committed = Some(barrier);
		log::debug!("superseding all generations below {barrier}");
		std::mem::replace(&mut inner.state, state)
	}

	/// Read the committed state.
	pub fn with_state<T>(&self, read: impl FnOnce(&S) -> T) -> T {
		read(&self.inner.lock().state)
	}
}

impl<S> Debug for GenerationSequence<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("GenerationSequence")
			.field("next", &inner.next)
			.field("committed", &inner.committed)
			.finish_non_exhaustive()
	}
}
