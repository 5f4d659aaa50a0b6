//! Keyed store of decoded tiles that never runs two fetches for the same key at once.
//!
//! [`TileCache::get`] either hands out the cached value, joins the fetch that is already
//! running for the key, or starts a new one. The pending entry is registered before `get`
//! returns, so every later caller finds it. The fetch itself runs on its own Tokio task: it
//! completes even if every requester loses interest, and its result then replaces the pending
//! entry.
//!
//! A failed fetch removes its entry, so the next request retries instead of replaying the
//! failure. [`del`](TileCache::del) and [`free`](TileCache::free) never cancel running fetches;
//! every entry carries an id, and a fetch that finishes after its entry was removed or
//! replaced leaves the cache untouched.
//!
//! ```rust
//! use tileflow_core::TileCache;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache: TileCache<&str, u32> = TileCache::new();
//!     let value = cache.get(&"1,0,2", || async { Ok(42) }).await?;
//!     assert_eq!(value, 42);
//!     assert_eq!(cache.get(&"1,0,2", || async { Ok(0) }).await?, 42);
//!     Ok(())
//! }
//! ```

use super::CacheKey;
use anyhow::{Result, anyhow};
use futures::{
	FutureExt,
	future::{BoxFuture, Shared},
};
use parking_lot::Mutex;
use std::{
	collections::HashMap,
	fmt::{self, Debug, Display},
	future::Future,
	marker::PhantomData,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};

/// Error of a failed fetch, shared by every caller that waited for it.
#[derive(Clone, Debug)]
pub struct FetchError(Arc<anyhow::Error>);

impl Display for FetchError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#}", self.0)
	}
}

impl std::error::Error for FetchError {}

impl From<anyhow::Error> for FetchError {
	fn from(error: anyhow::Error) -> Self {
		FetchError(Arc::new(error))
	}
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, FetchError>>>;

enum CacheEntry<V> {
	Ready(V),
	Pending { id: u64, fetch: SharedFetch<V> },
}

enum Lookup<V> {
	Ready(V),
	Pending(SharedFetch<V>),
}

struct CacheInner<V> {
	entries: Mutex<HashMap<String, CacheEntry<V>>>,
	next_entry_id: AtomicU64,
}

impl<V: Clone> CacheInner<V> {
	/// Store the outcome of the fetch that created entry `id`, if that entry is still there.
	fn settle(&self, key: &str, id: u64, result: &Result<V>) {
		let mut entries = self.entries.lock();
		match entries.get(key) {
			Some(CacheEntry::Pending { id: current, .. }) if *current == id => {}
			_ => {
				log::trace!("dropping late fetch result for '{key}', its entry is gone");
				return;
			}
		}

		match result {
			Ok(value) => {
				entries.insert(key.to_string(), CacheEntry::Ready(value.clone()));
			}
			Err(error) => {
				log::debug!("fetch for '{key}' failed, evicting entry: {error:#}");
				entries.remove(key);
			}
		}
	}
}

/// Coalescing cache from `K` to cheaply clonable values `V` (usually `Arc<Dataframe>`).
///
/// Cloning a `TileCache` yields another handle to the same entries.
pub struct TileCache<K, V> {
	inner: Arc<CacheInner<V>>,
	_key: PhantomData<fn(&K)>,
}

impl<K, V> Clone for TileCache<K, V> {
	fn clone(&self) -> Self {
		TileCache {
			inner: Arc::clone(&self.inner),
			_key: PhantomData,
		}
	}
}

impl<K, V> Default for TileCache<K, V>
where
	K: CacheKey,
	V: Clone + Send + Sync + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V> TileCache<K, V>
where
	K: CacheKey,
	V: Clone + Send + Sync + 'static,
{
	#[must_use]
	pub fn new() -> Self {
		TileCache {
			inner: Arc::new(CacheInner {
				entries: Mutex::new(HashMap::new()),
				next_entry_id: AtomicU64::new(0),
			}),
			_key: PhantomData,
		}
	}

	/// Get the value for `key`, calling `fetch` only if there is neither a cached value nor a
	/// running fetch for it.
	///
	/// `fetch` is called synchronously while the cache is locked and must not touch the cache
	/// itself; the future it returns is spawned onto the Tokio runtime, so this has to be
	/// called from within one.
	pub fn get<F, Fut>(&self, key: &K, fetch: F) -> BoxFuture<'static, Result<V>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<V>> + Send + 'static,
	{
		let lookup = self.lookup_or_fetch(key, fetch);
		async move {
			match lookup {
				Lookup::Ready(value) => Ok(value),
				Lookup::Pending(fetch) => fetch.await.map_err(anyhow::Error::new),
			}
		}
		.boxed()
	}

	fn lookup_or_fetch<F, Fut>(&self, key: &K, fetch: F) -> Lookup<V>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<V>> + Send + 'static,
	{
		let key = key.cache_key();
		let mut entries = self.inner.entries.lock();

		match entries.get(key.as_ref()) {
			Some(CacheEntry::Ready(value)) => {
				log::trace!("cache hit for '{key}'");
				return Lookup::Ready(value.clone());
			}
			Some(CacheEntry::Pending { fetch, .. }) => {
				log::trace!("joining running fetch for '{key}'");
				return Lookup::Pending(fetch.clone());
			}
			None => {}
		}

		let id = self.inner.next_entry_id.fetch_add(1, Ordering::Relaxed);
		let key = key.into_owned();
		log::trace!("cache miss for '{key}', starting fetch #{id}");

		let inner = Arc::clone(&self.inner);
		let task_key = key.clone();
		let future = fetch();
		let handle = tokio::spawn(async move {
			let result = future.await;
			inner.settle(&task_key, id, &result);
			result.map_err(FetchError::from)
		});

		let shared = async move {
			handle
				.await
				.unwrap_or_else(|e| Err(FetchError::from(anyhow!("fetch task failed: {e}"))))
		}
		.boxed()
		.shared();

		entries.insert(
			key,
			CacheEntry::Pending {
				id,
				fetch: shared.clone(),
			},
		);
		Lookup::Pending(shared)
	}

	/// The cached value for `key`, ignoring running fetches.
	pub fn get_ready(&self, key: &K) -> Option<V> {
		match self.inner.entries.lock().get(key.cache_key().as_ref()) {
			Some(CacheEntry::Ready(value)) => Some(value.clone()),
			_ => None,
		}
	}

	/// Remove a single entry, cached or pending. Returns `true` if there was one.
	pub fn del(&self, key: &str) -> bool {
		let removed = self.inner.entries.lock().remove(key).is_some();
		if removed {
			log::debug!("evicted '{key}' from the tile cache");
		}
		removed
	}

	/// Remove every entry. Running fetches keep running, their results are dropped.
	pub fn free(&self) {
		let mut entries = self.inner.entries.lock();
		log::debug!("freeing tile cache with {} entries", entries.len());
		entries.clear();
	}

	pub fn contains_key(&self, key: &K) -> bool {
		self.inner.entries.lock().contains_key(key.cache_key().as_ref())
	}

	pub fn is_pending(&self, key: &K) -> bool {
		matches!(
			self.inner.entries.lock().get(key.cache_key().as_ref()),
			Some(CacheEntry::Pending { .. })
		)
	}

	pub fn len(&self) -> usize {
		self.inner.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.entries.lock().is_empty()
	}
}

impl<K, V> Debug for TileCache<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let entries = self.inner.entries.lock();
		let pending = entries
			.values()
			.filter(|e| matches!(e, CacheEntry::Pending { .. }))
			.count();
		f.debug_struct("TileCache")
			.field("entries", &entries.len())
			.field("pending", &pending)
			.finish()
	}
}
