//! Configuration of one MVT source.
//!
//! ```yaml
//! urls:
//!   - https://a.example.org/{z}/{x}/{y}.mvt
//!   - https://b.example.org/{z}/{x}/{y}.mvt
//! base_url: https://example.org/app/
//! layer_id: roads
//! zoom_mapping: ceil
//! max_zoom: 14
//! metadata:
//!   id_property: cartodb_id
//!   properties:
//!     population: { type: number, min: 0, max: 100000 }
//!     kind: { type: category }
//! ```
//!
//! `urls` also accepts a single string. Everything except `urls` is optional.

use crate::source::{MvtOptions, MvtSource};
use anyhow::{Context, Result, ensure};
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use std::{
	fs::File,
	io::{BufReader, Read},
	path::Path,
};
use tileflow_core::{DatasetMetadata, MAX_ZOOM_LEVEL, TileUrlTemplate, ZoomMapping};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
	/// Tile URL templates with `{x}`, `{y}` and `{z}` placeholders.
	#[serde(deserialize_with = "one_or_many")]
	pub urls: Vec<String>,

	/// Base for templates starting with `.` or `/`.
	#[serde(default)]
	pub base_url: Option<String>,

	#[serde(default)]
	pub layer_id: Option<String>,

	#[serde(default)]
	pub zoom_mapping: ZoomMapping,

	#[serde(default)]
	pub max_zoom: Option<u8>,

	#[serde(default)]
	pub metadata: DatasetMetadata,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum OneOrMany {
		One(String),
		Many(Vec<String>),
	}

	Ok(match OneOrMany::deserialize(deserializer)? {
		OneOrMany::One(url) => vec![url],
		OneOrMany::Many(urls) => urls,
	})
}

impl SourceConfig {
	/// Configuration for the given templates, everything else at its default.
	#[must_use]
	pub fn from_urls(urls: Vec<String>) -> SourceConfig {
		SourceConfig {
			urls,
			base_url: None,
			layer_id: None,
			zoom_mapping: ZoomMapping::default(),
			max_zoom: None,
			metadata: DatasetMetadata::default(),
		}
	}

	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		Ok(serde_yaml_ng::from_reader(reader)?)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		Ok(serde_yaml_ng::from_str(text)?)
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("opening source config '{}'", path.display()))?;
		SourceConfig::from_reader(BufReader::new(file))
			.with_context(|| format!("parsing source config '{}'", path.display()))
	}

	pub fn validate(&self) -> Result<()> {
		ensure!(!self.urls.is_empty(), "source config needs at least one URL in 'urls'");
		if let Some(max_zoom) = self.max_zoom {
			ensure!(
				max_zoom <= MAX_ZOOM_LEVEL,
				"max_zoom ({max_zoom}) must be <= {MAX_ZOOM_LEVEL}"
			);
		}
		self.metadata.validate()?;
		self.templates()?;
		Ok(())
	}

	pub fn templates(&self) -> Result<TileUrlTemplate> {
		let base = match &self.base_url {
			Some(base) => Some(Url::parse(base).with_context(|| format!("invalid base_url '{base}'"))?),
			None => None,
		};
		TileUrlTemplate::new(self.urls.clone(), base)
	}

	#[must_use]
	pub fn mvt_options(&self) -> MvtOptions {
		MvtOptions {
			layer_id: self.layer_id.clone(),
			zoom_mapping: self.zoom_mapping.clone(),
			max_zoom: self.max_zoom,
		}
	}

	/// Validate the configuration and build an HTTP backed MVT source from it.
	pub fn build_mvt_source(&self) -> Result<MvtSource> {
		self.validate()?;
		MvtSource::new(self.templates()?, self.metadata.clone(), self.mvt_options())
	}
}
