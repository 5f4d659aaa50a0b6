//! Tile cache with request coalescing.
//!
//! - [`CacheKey`]: how a key is turned into the string the cache is indexed by
//! - [`TileCache`]: keyed store of decoded payloads sharing one in-flight fetch per key

mod key;
mod tile_cache;

pub use key::CacheKey;
pub use tile_cache::{FetchError, TileCache};
