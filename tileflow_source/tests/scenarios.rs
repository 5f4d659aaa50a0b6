//! Viewport update scenarios driven through an MVT source with a scripted transport.


use anyhow::Result;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use test_utilities::*;
use tileflow_core::{Viewport, testing::tile};
use tileflow_source::source::TiledSource;

#[tokio::test]
async fn overlapping_updates_share_the_pending_fetch() -> Result<()> {
	let h = harness();
	h.fetcher.gate(tile(0, 0, 2));

	let first = h.source.client().request_tiles(vec![tile(0, 0, 2)]);
	let second = h.source.client().request_tiles(vec![tile(0, 0, 2), tile(1, 0, 2)]);
	h.fetcher.wait_for_calls(tile(0, 0, 2), 1).await;
	h.fetcher.release(tile(0, 0, 2));

	first.await?;
	assert!(second.await?);

	assert_eq!(h.fetcher.calls(tile(0, 0, 2)), 1);
	assert_eq!(active_coords(&h.source), vec![tile(0, 0, 2), tile(1, 0, 2)]);
	assert_eq!(h.notifications.count(tile(0, 0, 2)), 1);
	Ok(())
}

#[tokio::test]
async fn aborted_tile_is_evicted_and_fetched_again() -> Result<()> {
	let h = harness();
	h.fetcher.fail(tile(1, 0, 2));

	let changed = h
		.source
		.client()
		.request_tiles(vec![tile(0, 0, 2), tile(1, 0, 2)])
		.await?;
	assert!(changed);
	assert!(!h.source.client().cache().contains_key(&tile(1, 0, 2)));
	assert!(!h.source.remove_from_cache("1,0,2"));
	assert_eq!(active_coords(&h.source), vec![tile(0, 0, 2)]);
	assert_eq!(h.notifications.count(tile(1, 0, 2)), 0);

	h.fetcher.heal(tile(1, 0, 2));
	let viewport = Viewport::new(-179.0, 1.0, -1.0, 85.0)?;
	assert!(h.source.request_data(2.0, &viewport)?.await?);

	assert_eq!(h.fetcher.calls(tile(1, 0, 2)), 2);
	assert_eq!(h.fetcher.calls(tile(0, 0, 2)), 1);
	assert_eq!(active_coords(&h.source), vec![tile(0, 0, 2), tile(1, 0, 2), tile(0, 1, 2), tile(1, 1, 2)]);
	Ok(())
}

#[tokio::test]
async fn older_update_finishing_last_is_discarded() -> Result<()> {
	let h = harness();
	h.fetcher.gate(tile(3, 3, 2));

	let older = h.source.client().request_tiles(vec![tile(0, 0, 2), tile(3, 3, 2)]);
	let newer = h.source.client().request_tiles(vec![tile(0, 0, 2), tile(2, 0, 2)]);

	assert!(newer.await?);
	let committed = h.source.client().active_dataframes();
	assert_eq!(active_coords(&h.source), vec![tile(0, 0, 2), tile(2, 0, 2)]);

	h.fetcher.release(tile(3, 3, 2));
	assert!(!older.await?);

	let after = h.source.client().active_dataframes();
	assert_eq!(after.len(), committed.len());
	assert!(after.iter().zip(&committed).all(|(a, b)| Arc::ptr_eq(a, b)));
	assert!(after.iter().all(|f| f.is_active()));

	let stale = h.source.client().cache().get_ready(&tile(3, 3, 2)).unwrap();
	assert!(!stale.is_active());
	assert_eq!(h.notifications.count(tile(0, 0, 2)), 1);
	assert_eq!(h.notifications.count(tile(2, 0, 2)), 1);
	Ok(())
}

#[tokio::test]
async fn panned_viewport_moves_the_active_set() -> Result<()> {
	let h = harness();
	let west = Viewport::new(-170.0, 10.0, -100.0, 80.0)?;
	let east = Viewport::new(-80.0, 10.0, -10.0, 80.0)?;

	assert!(h.source.request_data(1.2, &west)?.await?);
	let west_frames = h.source.client().active_dataframes();
	assert!(h.source.request_data(1.2, &east)?.await?);

	assert!(west_frames.iter().all(|f| !f.is_active()));
	assert_eq!(active_coords(&h.source), vec![tile(1, 0, 2), tile(1, 1, 2)]);

	assert!(h.source.request_data(1.2, &west)?.await?);
	assert_eq!(h.fetcher.calls(tile(0, 0, 2)), 1);
	assert!(west_frames.iter().all(|f| f.is_active()));
	Ok(())
}

#[tokio::test]
async fn canceled_update_keeps_loaded_tiles_in_cache() -> Result<()> {
	let h = harness();
	h.fetcher.gate(tile(0, 0, 1));

	let update = h.source.client().request_tiles(vec![tile(0, 0, 1)]);
	h.fetcher.wait_for_calls(tile(0, 0, 1), 1).await;
	update.cancel();
	h.fetcher.release(tile(0, 0, 1));

	assert!(!update.await?);
	assert!(h.source.client().active_dataframes().is_empty());

	assert!(h.source.client().request_tiles(vec![tile(0, 0, 1)]).await?);
	assert_eq!(h.fetcher.calls(tile(0, 0, 1)), 1);
	Ok(())
}

#[tokio::test]
async fn free_during_update_prevents_its_commit() -> Result<()> {
	let h = harness();
	h.fetcher.gate(tile(0, 0, 0));

	let update = h.source.client().request_tiles(vec![tile(0, 0, 0)]);
	h.fetcher.wait_for_calls(tile(0, 0, 0), 1).await;
	h.source.free();
	h.fetcher.release(tile(0, 0, 0));

	assert!(!update.await?);
	assert!(h.source.client().active_dataframes().is_empty());
	assert!(h.source.client().cache().is_empty());
	assert_eq!(h.source.dispatch().pending_calls(), 0);

	assert!(h.source.client().request_tiles(vec![tile(0, 0, 0)]).await?);
	assert_eq!(h.fetcher.calls(tile(0, 0, 0)), 2);
	Ok(())
}

#[tokio::test]
async fn late_abort_leaves_the_recreated_entry_alone() -> Result<()> {
	let h = harness();
	let coord = tile(0, 0, 0);
	h.fetcher.gate(coord);
	h.fetcher.fail(coord);

	let before_free = h.source.client().request_tiles(vec![coord]);
	h.fetcher.wait_for_calls(coord, 1).await;
	h.source.free();

	let after_free = h.source.client().request_tiles(vec![coord]);
	h.fetcher.wait_for_calls(coord, 2).await;
	assert!(h.source.client().cache().is_pending(&coord));

	// the fetch started before free() now fails and its tile is aborted
	h.fetcher.release_one(coord);
	assert!(!before_free.await?);
	assert!(h.source.client().cache().is_pending(&coord));

	h.fetcher.heal(coord);
	let joining = h.source.client().request_tiles(vec![coord]);
	assert_eq!(h.fetcher.calls(coord), 2);

	h.fetcher.release(coord);
	after_free.await?;
	joining.await?;
	assert_eq!(h.fetcher.calls(coord), 2);
	assert_eq!(active_coords(&h.source), vec![coord]);
	assert_eq!(h.notifications.count(coord), 1);
	Ok(())
}

#[tokio::test]
async fn late_abort_after_remove_from_cache() -> Result<()> {
	let h = harness();
	let coord = tile(1, 1, 1);
	h.fetcher.gate(coord);
	h.fetcher.fail(coord);

	let first = h.source.client().request_tiles(vec![coord]);
	h.fetcher.wait_for_calls(coord, 1).await;
	assert!(h.source.remove_from_cache("1,1,1"));

	let second = h.source.client().request_tiles(vec![coord]);
	h.fetcher.wait_for_calls(coord, 2).await;

	h.fetcher.release_one(coord);
	first.await?;
	assert!(h.source.client().cache().is_pending(&coord));

	h.fetcher.heal(coord);
	h.fetcher.release(coord);
	assert!(second.await?);
	assert_eq!(h.fetcher.calls(coord), 2);
	assert!(h.source.client().cache().get_ready(&coord).is_some());
	Ok(())
}
