//! Fetching, decoding and coordinating map tiles for a tileflow source.
//!
//! The crate is layered bottom-up:
//! - [`io`]: the [`TileFetcher`](io::TileFetcher) transport seam and its HTTP implementation,
//! - [`decode`]: the [`TileDecoder`](decode::TileDecoder) seam, run on the blocking pool,
//! - [`dispatch`]: the decode worker, its wire protocol and the [`DecodeDispatch`](dispatch::DecodeDispatch)
//!   that matches replies to callers,
//! - [`client`]: the [`TileClient`](client::TileClient) coordinating viewport updates,
//! - [`source`]: the [`TiledSource`](source::TiledSource) trait and the MVT source,
//! - [`config`]: YAML configuration for sources.
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use tileflow_core::{Dataframe, Viewport};
//! use tileflow_source::{config::SourceConfig, source::TiledSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SourceConfig::from_string("urls: https://tiles.example.org/{z}/{x}/{y}.mvt")?;
//!     let source = config.build_mvt_source()?;
//!     source.bind_layer(Box::new(|frame: Arc<Dataframe>| println!("new tile {}", frame.coord())));
//!     let changed = source.request_data(3.4, &Viewport::world())?.await?;
//!     println!("active set changed: {changed}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod decode;
pub mod dispatch;
pub mod io;
pub mod source;
