//! Contains types like tile coordinates, viewports, metadata and decoded tile payloads.

mod dataframe;
pub use dataframe::*;

mod dataset_metadata;
pub use dataset_metadata::*;

mod tile_coord;
pub use tile_coord::*;

mod tile_cover;
pub use tile_cover::*;

mod url_template;
pub use url_template::*;

mod viewport;
pub use viewport::*;

mod zoom_policy;
pub use zoom_policy::*;
