//! The tile request coordinator.
//!
//! A [`TileClient`] turns viewport updates into tile requests and keeps track of the tiles the
//! renderer should currently draw, the *active set*. For every update it
//!
//! 1. maps the viewport zoom to a source zoom and covers the viewport with tiles,
//! 2. takes the next generation,
//! 3. gets every tile from the [`TileCache`], loading missing ones through its [`TileLoader`],
//! 4. waits for all tiles and commits the result, unless a newer update has already committed
//!    or the update was canceled.
//!
//! Committing marks the old active set inactive and the new one active, and reports whether
//! the set changed, comparing dataframes by identity. Tiles that fail to load are logged and
//! left out; the cache forgets them, so the next update retries.
//!
//! The bound layer is notified once for every non-empty dataframe, right after it was loaded.

use super::{TileLoader, TileRequest};
use anyhow::Result;
use arc_swap::ArcSwapOption;
use futures::future::join_all;
use itertools::Itertools;
use std::{
	fmt::{self, Debug},
	sync::Arc,
};
use tileflow_core::{
	Cancelable, CancelToken, Dataframe, GenerationSequence, TileCache, TileCoord, TileCover, TileUrlTemplate,
	Viewport, WebMercatorCover, ZoomPolicy,
};

/// Receives every newly loaded, non-empty dataframe.
pub type LayerCallback = Box<dyn Fn(Arc<Dataframe>) + Send + Sync>;

/// Cache of decoded tiles as used by the [`TileClient`].
pub type DataframeCache = TileCache<TileCoord, Arc<Dataframe>>;

/// How a [`TileClient`] selects and addresses tiles.
#[derive(Clone)]
pub struct TileClientOptions {
	pub templates: TileUrlTemplate,
	pub zoom_policy: ZoomPolicy,
	pub cover: Arc<dyn TileCover>,
}

impl TileClientOptions {
	/// Default zoom policy and Web Mercator cover.
	#[must_use]
	pub fn new(templates: TileUrlTemplate) -> TileClientOptions {
		TileClientOptions {
			templates,
			zoom_policy: ZoomPolicy::default(),
			cover: Arc::new(WebMercatorCover),
		}
	}

	#[must_use]
	pub fn with_zoom_policy(mut self, zoom_policy: ZoomPolicy) -> TileClientOptions {
		self.zoom_policy = zoom_policy;
		self
	}

	#[must_use]
	pub fn with_cover(mut self, cover: Arc<dyn TileCover>) -> TileClientOptions {
		self.cover = cover;
		self
	}
}

struct ClientInner {
	options: TileClientOptions,
	loader: Arc<dyn TileLoader>,
	cache: DataframeCache,
	active: GenerationSequence<Vec<Arc<Dataframe>>>,
	layer: ArcSwapOption<LayerCallback>,
}

/// Coordinates viewport updates of one source. Clones share all state.
#[derive(Clone)]
pub struct TileClient {
	inner: Arc<ClientInner>,
}

impl TileClient {
	pub fn new(options: TileClientOptions, loader: Arc<dyn TileLoader>) -> TileClient {
		TileClient {
			inner: Arc::new(ClientInner {
				options,
				loader,
				cache: TileCache::new(),
				active: GenerationSequence::default(),
				layer: ArcSwapOption::empty(),
			}),
		}
	}

	/// Register the callback for newly loaded dataframes, replacing the previous one.
	pub fn bind_layer<F>(&self, notify: F)
	where
		F: Fn(Arc<Dataframe>) + Send + Sync + 'static,
	{
		self.bind_layer_boxed(Box::new(notify));
	}

	pub fn bind_layer_boxed(&self, notify: LayerCallback) {
		self.inner.layer.store(Some(Arc::new(notify)));
	}

	/// Start a viewport update.
	///
	/// Fails right away if the zoom or the viewport cannot be turned into a tile set. The
	/// returned computation resolves to `true` if the active set changed; superseded or
	/// canceled updates resolve to `false`.
	pub fn request_data(&self, zoom: f64, viewport: &Viewport) -> Result<Cancelable<bool>> {
		let source_zoom = self.inner.options.zoom_policy.source_zoom(zoom)?;
		let tiles = self.inner.options.cover.tiles(source_zoom, viewport)?;
		log::trace!(
			"viewport {viewport:?} at zoom {zoom} needs {} tiles at source zoom {source_zoom}",
			tiles.len()
		);
		Ok(self.request_tiles(tiles))
	}

	/// Start an update for an explicit set of tiles.
	pub fn request_tiles(&self, tiles: Vec<TileCoord>) -> Cancelable<bool> {
		let tiles: Vec<TileCoord> = tiles.into_iter().unique().collect();
		let generation = self.inner.active.issue();

		// Cache lookups happen now, so later updates join these fetches.
		let lookups = tiles
			.iter()
			.map(|coord| {
				let inner = Arc::clone(&self.inner);
				let coord = *coord;
				let siblings = tiles.clone();
				self.inner
					.cache
					.get(&coord, move || inner.load_tile(coord, siblings))
			})
			.collect::<Vec<_>>();

		let inner = Arc::clone(&self.inner);
		Cancelable::spawn(move |token| async move {
			let results = join_all(lookups).await;
			let frames = results
				.into_iter()
				.zip(&tiles)
				.filter_map(|(result, coord)| match result {
					Ok(frame) => Some(frame),
					Err(e) => {
						log::warn!("tile {coord} failed: {e:#}");
						None
					}
				})
				.collect::<Vec<_>>();
			Ok(inner.commit(generation, &token, frames))
		})
	}

	/// Evict one tile from the cache by its key `"{x},{y},{z}"`.
	pub fn remove_from_cache(&self, key: &str) -> bool {
		self.inner.cache.del(key)
	}

	/// Drop all cached tiles and the active set. Updates still running can no longer commit.
	pub fn free(&self) {
		self.inner.cache.free();
		for frame in self.inner.active.supersede_all(Vec::new()) {
			frame.set_active(false);
		}
	}

	/// Dataframes of the last committed update, in draw order.
	#[must_use]
	pub fn active_dataframes(&self) -> Vec<Arc<Dataframe>> {
		let mut frames = self.inner.active.with_state(Clone::clone);
		frames.sort_by(|a, b| a.order_id().total_cmp(&b.order_id()));
		frames
	}

	#[must_use]
	pub fn cache(&self) -> &DataframeCache {
		&self.inner.cache
	}

	#[must_use]
	pub fn options(&self) -> &TileClientOptions {
		&self.inner.options
	}
}

impl ClientInner {
	async fn load_tile(self: Arc<Self>, coord: TileCoord, siblings: Vec<TileCoord>) -> Result<Arc<Dataframe>> {
		let url = self.options.templates.url_for(&coord)?;
		let frame = self.loader.load(TileRequest { coord, url, siblings }).await?;
		let frame = Arc::new(frame.with_order_id(coord.order_id()));

		if !frame.is_empty()
			&& let Some(notify) = self.layer.load_full()
		{
			notify(Arc::clone(&frame));
		}
		Ok(frame)
	}

	fn commit(&self, generation: u64, token: &CancelToken, frames: Vec<Arc<Dataframe>>) -> bool {
		self.active
			.commit(generation, token, |current| {
				for frame in current.iter() {
					frame.set_active(false);
				}
				for frame in &frames {
					frame.set_active(true);
				}
				let changed = !same_frames(current, &frames);
				*current = frames;
				changed
			})
			.applied()
			.unwrap_or(false)
	}
}

/// Set equality by dataframe identity.
fn same_frames(a: &[Arc<Dataframe>], b: &[Arc<Dataframe>]) -> bool {
	let identities = |frames: &[Arc<Dataframe>]| frames.iter().map(Arc::as_ptr).sorted().dedup().collect::<Vec<_>>();
	identities(a) == identities(b)
}

impl Debug for TileClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TileClient")
			.field("templates", &self.inner.options.templates.templates())
			.field("zoom_policy", &self.inner.options.zoom_policy)
			.field("cache", &self.inner.cache)
			.field("active", &self.inner.active)
			.finish()
	}
}
