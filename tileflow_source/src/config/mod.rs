//! YAML configuration of tile sources.

mod source_config;

pub use source_config::*;
