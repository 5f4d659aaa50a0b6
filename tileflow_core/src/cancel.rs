//! Cooperative cancellation for long running computations.
//!
//! A [`Cancelable`] runs its work on a Tokio task right away. Canceling only flips a shared
//! flag: sub-operations that are already running (fetches, decodes) finish normally, and the
//! computation is expected to check its [`CancelToken`] before it mutates any shared state.
//!
//! Awaiting a `Cancelable` yields the result of the work. Dropping it detaches the task, which
//! keeps running to completion.

use anyhow::{Result, anyhow};
use std::{
	fmt::{self, Debug},
	future::Future,
	pin::Pin,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	task::{Context, Poll},
};
use tokio::task::JoinHandle;

/// Shared cancellation flag.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
	#[must_use]
	pub fn new() -> CancelToken {
		CancelToken::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::Release);
	}

	#[must_use]
	pub fn is_canceled(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}

impl Debug for CancelToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "CancelToken({})", self.is_canceled())
	}
}

/// A spawned computation that can be asked to skip its side effects.
pub struct Cancelable<T> {
	token: CancelToken,
	handle: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> Cancelable<T> {
	/// Start `work` on the current Tokio runtime, handing it the token it should check.
	pub fn spawn<F, Fut>(work: F) -> Cancelable<T>
	where
		F: FnOnce(CancelToken) -> Fut,
		Fut: Future<Output = Result<T>> + Send + 'static,
	{
		let token = CancelToken::new();
		let handle = tokio::spawn(work(token.clone()));
		Cancelable { token, handle }
	}
}

impl<T> Cancelable<T> {
	pub fn cancel(&self) {
		self.token.cancel();
	}

	#[must_use]
	pub fn is_canceled(&self) -> bool {
		self.token.is_canceled()
	}

	#[must_use]
	pub fn token(&self) -> &CancelToken {
		&self.token
	}

	/// `true` once the underlying task has finished.
	#[must_use]
	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}
}

impl<T> Future for Cancelable<T> {
	type Output = Result<T>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.handle).poll(cx).map(|joined| match joined {
			Ok(result) => result,
			Err(e) if e.is_panic() => Err(anyhow!("computation panicked: {e}")),
			Err(e) => Err(anyhow!("computation was aborted: {e}")),
		})
	}
}

impl<T> Debug for Cancelable<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cancelable")
			.field("canceled", &self.is_canceled())
			.field("finished", &self.is_finished())
			.finish()
	}
}
