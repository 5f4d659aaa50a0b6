//! Guarantees of the tile pipeline that hold for every source.


use anyhow::Result;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use test_utilities::*;
use tileflow_core::{DatasetMetadata, PropertyDef, TileUrlTemplate, Viewport, testing::tile};
use tileflow_source::{
	decode::{DecodeJob, TileDecoder},
	dispatch::WirePayload,
	source::{MvtOptions, MvtSource, TiledSource},
};

#[tokio::test]
async fn unchanged_viewport_reports_no_change() -> Result<()> {
	let h = harness();
	let viewport = Viewport::new(5.0, 45.0, 15.0, 55.0)?;

	assert!(h.source.request_data(4.7, &viewport)?.await?);
	let notified = h.notifications.total();
	assert!(!h.source.request_data(4.7, &viewport)?.await?);
	assert!(!h.source.request_data(4.2, &viewport)?.await?);
	assert_eq!(h.notifications.total(), notified);
	Ok(())
}

#[tokio::test]
async fn concurrent_updates_fetch_each_tile_once() -> Result<()> {
	let h = harness();
	let viewport = Viewport::new(-20.0, -20.0, 20.0, 20.0)?;
	h.fetcher.gate(tile(3, 3, 3));

	let updates = (0..4)
		.map(|_| h.source.request_data(3.0, &viewport))
		.collect::<Result<Vec<_>>>()?;
	h.fetcher.wait_for_calls(tile(3, 3, 3), 1).await;
	h.fetcher.release(tile(3, 3, 3));

	let results = futures::future::join_all(updates).await;
	assert!(results.into_iter().all(|r| r.is_ok()));
	for coord in active_coords(&h.source) {
		assert_eq!(h.fetcher.calls(coord), 1, "tile {coord} fetched more than once");
		assert_eq!(h.notifications.count(coord), 1);
	}
	Ok(())
}

#[tokio::test]
async fn metadata_comes_from_first_non_empty_tile() -> Result<()> {
	let h = harness();
	h.fetcher.set_body(tile(0, 0, 1), "");
	h.fetcher.set_body(tile(1, 0, 1), "park,lake");
	h.fetcher.set_body(tile(0, 1, 1), "road");

	h.source.client().request_tiles(vec![tile(0, 0, 1)]).await?;
	assert!(h.source.metadata().discovered().is_none());
	let empty = h.source.client().active_dataframes().remove(0);
	assert!(empty.is_empty());
	assert_eq!(h.notifications.total(), 0);

	h.source.client().request_tiles(vec![tile(1, 0, 1)]).await?;
	h.source.client().request_tiles(vec![tile(0, 1, 1)]).await?;

	let metadata = h.source.request_metadata().await?;
	assert_eq!(metadata.category_id("park"), Some(0));
	assert_eq!(metadata.category_id("lake"), Some(1));
	assert_eq!(metadata.category_id("road"), None);

	let road = h.source.client().active_dataframes().remove(0);
	assert!(Arc::ptr_eq(road.metadata(), &metadata));
	assert!(Arc::ptr_eq(empty.metadata(), &metadata));
	Ok(())
}

/// Records whether each decode saw the declared metadata.
#[derive(Debug, Default)]
struct MetadataProbe(Mutex<Vec<Option<String>>>);

impl TileDecoder for MetadataProbe {
	fn decode(&self, job: &DecodeJob) -> Result<WirePayload> {
		let id_property = job.metadata.as_ref().map(|m| m.id_property.clone());
		self.0.lock().push(id_property);
		CategoryDecoder.decode(job)
	}
}

#[tokio::test]
async fn worker_receives_declared_metadata_once_per_instance() -> Result<()> {
	let probe = Arc::new(MetadataProbe::default());
	let metadata = DatasetMetadata::new(Default::default(), Some("gid".into()))
		.with_property("population", PropertyDef::number_range(0.0, 1e6));
	let source = MvtSource::with_transport(
		TileUrlTemplate::single(TEMPLATE)?,
		metadata,
		MvtOptions::default(),
		Arc::new(MockFetcher::default()),
		probe.clone(),
	)?;

	source.client().request_tiles(vec![tile(0, 0, 1), tile(1, 0, 1)]).await?;
	source.free();
	assert!(!source.dispatch().has_worker());
	source.client().request_tiles(vec![tile(0, 0, 1)]).await?;

	let seen = probe.0.lock().clone();
	assert_eq!(seen, vec![Some("gid".to_string()); 3]);
	Ok(())
}

#[tokio::test]
async fn persistent_failures_are_retried_by_every_update() -> Result<()> {
	let h = harness();
	h.fetcher.fail(tile(0, 0, 0));

	for attempt in 1..=3 {
		assert!(!h.source.request_data(0.0, &Viewport::world())?.await?);
		assert_eq!(h.fetcher.calls(tile(0, 0, 0)), attempt);
	}
	assert!(h.source.client().cache().is_empty());
	Ok(())
}
