//! Core building blocks of the tileflow tile pipeline.
//!
//! This crate holds everything that does not depend on a transport or a decode worker:
//! - [`TileCoord`], [`Viewport`] and the [`TileCover`] that maps a viewport onto a tile set,
//! - [`ZoomPolicy`] turning a viewport zoom into a source zoom,
//! - [`TileUrlTemplate`] for building per-tile URLs,
//! - [`DatasetMetadata`] and the decoded tile payload [`Dataframe`],
//! - the coalescing [`TileCache`],
//! - the cooperative [`Cancelable`] computation,
//! - the [`GenerationSequence`] used to drop superseded viewport updates.
//!
//! # Quick start
//! ```rust
//! use tileflow_core::*;
//!
//! let viewport = Viewport::new(13.0, 52.3, 13.8, 52.7).unwrap();
//! let zoom = ZoomPolicy::default().source_zoom(9.4).unwrap();
//! let tiles = WebMercatorCover.tiles(zoom, &viewport).unwrap();
//! assert_eq!(zoom, 10);
//! assert!(!tiles.is_empty());
//! ```

mod cache;
pub use cache::*;

mod cancel;
pub use cancel::*;

mod generation;
pub use generation::*;

pub mod types;
pub use types::*;

#[cfg(any(test, feature = "test"))]
pub mod testing;
