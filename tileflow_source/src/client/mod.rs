//! Coordinating viewport updates over the tile cache.

mod loader;
mod tile_client;

pub use loader::*;
pub use tile_client::*;
