//! Mapbox Vector Tile sources.
//!
//! An [`MvtSource`] wires a [`TileClient`] to a [`DecodeDispatch`]: tiles missing from the cache
//! are decoded by the source's worker. A tile the worker aborts fails its cache fetch, which
//! evicts the entry that fetch created. All dataframes of a source share one [`DatasetMetadata`].

use super::TiledSource;
use crate::{
	client::{LayerCallback, TileClient, TileClientOptions},
	decode::{PassthroughDecoder, TileDecoder},
	dispatch::DecodeDispatch,
	io::{HttpFetcher, TileFetcher},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{
	fmt::{self, Debug},
	sync::Arc,
};
use tileflow_core::{Cancelable, DatasetMetadata, TileUrlTemplate, Viewport, ZoomMapping, ZoomPolicy};

/// Options of an MVT source.
#[derive(Clone, Debug, Default)]
pub struct MvtOptions {
	/// Layer to decode; may be omitted if the tiles hold a single layer.
	pub layer_id: Option<String>,
	pub zoom_mapping: ZoomMapping,
	/// Never request tiles above this zoom level.
	pub max_zoom: Option<u8>,
}

pub struct MvtSource {
	templates: TileUrlTemplate,
	options: MvtOptions,
	fetcher: Arc<dyn TileFetcher>,
	decoder: Arc<dyn TileDecoder>,
	client: TileClient,
	dispatch: DecodeDispatch,
}

impl MvtSource {
	pub const SOURCE_KIND: &'static str = "MVT";

	/// Source loading tiles over HTTP, keeping tile bytes undecoded.
	pub fn new(templates: TileUrlTemplate, metadata: DatasetMetadata, options: MvtOptions) -> Result<MvtSource> {
		let fetcher = Arc::new(HttpFetcher::new()?);
		MvtSource::with_transport(
			templates,
			metadata,
			options,
			fetcher,
			Arc::new(PassthroughDecoder::default()),
		)
	}

	pub fn with_transport(
		templates: TileUrlTemplate,
		metadata: DatasetMetadata,
		options: MvtOptions,
		fetcher: Arc<dyn TileFetcher>,
		decoder: Arc<dyn TileDecoder>,
	) -> Result<MvtSource> {
		metadata.validate().context("invalid MVT metadata")?;
		let zoom_policy = ZoomPolicy::new(options.zoom_mapping.clone(), options.max_zoom)?;
		let metadata = Arc::new(metadata);

		let dispatch = DecodeDispatch::new(
			MvtSource::SOURCE_KIND,
			options.layer_id.clone(),
			metadata,
			Arc::clone(&fetcher),
			Arc::clone(&decoder),
		);
		let client = TileClient::new(
			TileClientOptions::new(templates.clone()).with_zoom_policy(zoom_policy),
			Arc::new(dispatch.clone()),
		);

		Ok(MvtSource {
			templates,
			options,
			fetcher,
			decoder,
			client,
			dispatch,
		})
	}

	#[must_use]
	pub fn client(&self) -> &TileClient {
		&self.client
	}

	#[must_use]
	pub fn dispatch(&self) -> &DecodeDispatch {
		&self.dispatch
	}

	#[must_use]
	pub fn metadata(&self) -> &Arc<DatasetMetadata> {
		self.dispatch.metadata()
	}

	#[must_use]
	pub fn options(&self) -> &MvtOptions {
		&self.options
	}
}

#[async_trait]
impl TiledSource for MvtSource {
	fn source_kind(&self) -> &'static str {
		MvtSource::SOURCE_KIND
	}

	fn bind_layer(&self, notify: LayerCallback) {
		self.client.bind_layer_boxed(notify);
	}

	fn request_data(&self, zoom: f64, viewport: &Viewport) -> Result<Cancelable<bool>> {
		self.client.request_data(zoom, viewport)
	}

	async fn request_metadata(&self) -> Result<Arc<DatasetMetadata>> {
		Ok(Arc::clone(self.metadata()))
	}

	fn remove_from_cache(&self, key: &str) -> bool {
		self.client.remove_from_cache(key)
	}

	fn free(&self) {
		self.client.free();
		self.dispatch.free();
	}

	fn clone_source(&self) -> Result<Box<dyn TiledSource>> {
		Ok(Box::new(MvtSource::with_transport(
			self.templates.clone(),
			self.metadata().declared_copy(),
			self.options.clone(),
			Arc::clone(&self.fetcher),
			Arc::clone(&self.decoder),
		)?))
	}
}

impl Debug for MvtSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MvtSource")
			.field("templates", &self.templates.templates())
			.field("options", &self.options)
			.field("dispatch", &self.dispatch)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{decode::DecodeJob, dispatch::WirePayload};
	use anyhow::bail;
	use bytes::Bytes;
	use parking_lot::Mutex;
	use reqwest::Url;
	use tileflow_core::{DiscoveredMetadata, GeometryType, PropertyDef};

	#[derive(Debug, Default)]
	struct UrlLog(Mutex<Vec<String>>);

	#[async_trait]
	impl TileFetcher for UrlLog {
		async fn fetch(&self, url: &Url) -> Result<Bytes> {
			self.0.lock().push(url.to_string());
			if url.path().starts_with("/fail") {
				bail!("timed out");
			}
			Ok(Bytes::from_static(b"tile"))
		}
	}

	#[derive(Debug, Default)]
	struct LayerDecoder(Mutex<Vec<Option<String>>>);

	impl TileDecoder for LayerDecoder {
		fn decode(&self, job: &DecodeJob) -> Result<WirePayload> {
			self.0.lock().push(job.layer_id.clone());
			Ok(WirePayload {
				empty: false,
				geom_type: Some(GeometryType::Polygon),
				num_features: 2,
				features: job.bytes.clone(),
				metadata: Some(DiscoveredMetadata::from_categories(["park"], Some(GeometryType::Polygon))),
			})
		}
	}

	fn source(template: &str, options: MvtOptions) -> (MvtSource, Arc<UrlLog>, Arc<LayerDecoder>) {
		let fetcher = Arc::new(UrlLog::default());
		let decoder = Arc::new(LayerDecoder::default());
		let metadata = DatasetMetadata::default().with_property("area", PropertyDef::number());
		let source = MvtSource::with_transport(
			TileUrlTemplate::single(template).unwrap(),
			metadata,
			options,
			fetcher.clone(),
			decoder.clone(),
		)
		.unwrap();
		(source, fetcher, decoder)
	}

	#[tokio::test]
	async fn max_zoom_and_layer_id() -> Result<()> {
		let options = MvtOptions {
			layer_id: Some("parks".into()),
			max_zoom: Some(1),
			..Default::default()
		};
		let (source, fetcher, decoder) = source("https://t.test/{z}/{x}/{y}.mvt", options);
		assert_eq!(source.source_kind(), "MVT");

		assert!(source.request_data(5.2, &Viewport::world())?.await?);
		let mut urls = fetcher.0.lock().clone();
		urls.sort();
		assert_eq!(urls.len(), 4);
		assert_eq!(urls[0], "https://t.test/1/0/0.mvt");
		assert!(decoder.0.lock().iter().all(|l| l.as_deref() == Some("parks")));

		let metadata = source.request_metadata().await?;
		assert_eq!(metadata.category_id("park"), Some(0));
		Ok(())
	}

	#[tokio::test]
	async fn aborted_tiles_are_evicted() -> Result<()> {
		let (source, fetcher, _) = source("https://t.test/fail/{z}/{x}/{y}.mvt", MvtOptions::default());
		assert!(!source.request_data(0.0, &Viewport::world())?.await?);
		assert!(source.client().cache().is_empty());

		source.request_data(0.0, &Viewport::world())?.await?;
		assert_eq!(fetcher.0.lock().len(), 2);
		Ok(())
	}

	#[tokio::test]
	async fn clones_are_independent() -> Result<()> {
		let (source, _, _) = source("https://t.test/{z}/{x}/{y}.mvt", MvtOptions::default());
		source.request_data(0.0, &Viewport::world())?.await?;
		assert!(source.metadata().discovered().is_some());

		let clone = source.clone_source()?;
		let cloned_metadata = clone.request_metadata().await?;
		assert!(cloned_metadata.discovered().is_none());
		assert!(cloned_metadata.properties.contains_key("area"));
		assert!(!Arc::ptr_eq(&cloned_metadata, source.metadata()));

		source.free();
		assert!(!source.dispatch().has_worker());
		assert!(source.client().active_dataframes().is_empty());
		Ok(())
	}
}
