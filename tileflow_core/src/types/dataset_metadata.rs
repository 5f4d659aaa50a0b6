//! Per-source description of the dataset behind the tiles.
//!
//! A [`DatasetMetadata`] has two halves:
//! - the **declared** part, supplied by the user: property names, their types and optional
//!   numeric ranges, plus the name of the feature id property;
//! - the **discovered** part ([`DiscoveredMetadata`]): category tables and the geometry type,
//!   which are only known after the first non-empty tile has been decoded.
//!
//! The discovered part is written at most once. All decoded tiles of a source share the same
//! `Arc<DatasetMetadata>`, so once it is filled every tile sees it without further locking.

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::OnceLock};

/// Type of a dataset property as it is encoded in the tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
	Number,
	/// Must be used for properties encoded as strings, regardless of their real type.
	Category,
}

/// Declaration of one dataset property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDef {
	#[serde(rename = "type")]
	pub kind: PropertyType,
	/// Smallest value in the whole dataset, used by global aggregations.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub min: Option<f64>,
	/// Largest value in the whole dataset, used by global aggregations.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max: Option<f64>,
}

impl PropertyDef {
	#[must_use]
	pub fn number() -> PropertyDef {
		PropertyDef {
			kind: PropertyType::Number,
			min: None,
			max: None,
		}
	}

	#[must_use]
	pub fn number_range(min: f64, max: f64) -> PropertyDef {
		PropertyDef {
			kind: PropertyType::Number,
			min: Some(min),
			max: Some(max),
		}
	}

	#[must_use]
	pub fn category() -> PropertyDef {
		PropertyDef {
			kind: PropertyType::Category,
			min: None,
			max: None,
		}
	}
}

/// Geometry type of the features in a source. Mixing geometry types is not supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryType {
	Point,
	Line,
	Polygon,
}

/// Metadata learned from decoding tiles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredMetadata {
	pub num_categories: u32,
	pub category_to_id: BTreeMap<String, u32>,
	#[serde(rename = "IDToCategory", alias = "idToCategory")]
	pub id_to_category: BTreeMap<u32, String>,
	pub geom_type: Option<GeometryType>,
}

impl DiscoveredMetadata {
	/// Build the category tables from category names, numbering them in the given order.
	pub fn from_categories<I, S>(categories: I, geom_type: Option<GeometryType>) -> DiscoveredMetadata
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut meta = DiscoveredMetadata {
			geom_type,
			..Default::default()
		};
		for name in categories {
			let name = name.into();
			if meta.category_to_id.contains_key(&name) {
				continue;
			}
			let id = meta.num_categories;
			meta.category_to_id.insert(name.clone(), id);
			meta.id_to_category.insert(id, name);
			meta.num_categories += 1;
		}
		meta
	}
}

fn default_id_property() -> String {
	String::from("cartodb_id")
}

fn is_unset(value: &OnceLock<DiscoveredMetadata>) -> bool {
	value.get().is_none()
}

/// Metadata of one source; see the module documentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DatasetMetadata {
	#[serde(default)]
	pub properties: BTreeMap<String, PropertyDef>,
	#[serde(default = "default_id_property", alias = "id_property")]
	pub id_property: String,
	#[serde(default, with = "once_lock_serde", skip_serializing_if = "is_unset")]
	discovered: OnceLock<DiscoveredMetadata>,
}

impl Default for DatasetMetadata {
	fn default() -> Self {
		DatasetMetadata {
			properties: BTreeMap::new(),
			id_property: default_id_property(),
			discovered: OnceLock::new(),
		}
	}
}

impl DatasetMetadata {
	#[must_use]
	pub fn new(properties: BTreeMap<String, PropertyDef>, id_property: Option<String>) -> DatasetMetadata {
		DatasetMetadata {
			properties,
			id_property: id_property.unwrap_or_else(default_id_property),
			discovered: OnceLock::new(),
		}
	}

	#[must_use]
	pub fn with_property(mut self, name: &str, property: PropertyDef) -> DatasetMetadata {
		self.properties.insert(name.to_string(), property);
		self
	}

	pub fn validate(&self) -> Result<()> {
		ensure!(!self.id_property.is_empty(), "id property name must not be empty");
		for (name, property) in &self.properties {
			for value in [property.min, property.max].into_iter().flatten() {
				ensure!(value.is_finite(), "range of property '{name}' must be finite");
			}
			if let (Some(min), Some(max)) = (property.min, property.max) {
				ensure!(min <= max, "property '{name}' has min ({min}) > max ({max})");
			}
			if property.kind == PropertyType::Category {
				ensure!(
					property.min.is_none() && property.max.is_none(),
					"category property '{name}' cannot have a numeric range"
				);
			}
		}
		Ok(())
	}

	/// The discovered half, if a non-empty tile has supplied it yet.
	#[must_use]
	pub fn discovered(&self) -> Option<&DiscoveredMetadata> {
		self.discovered.get()
	}

	/// Store discovered metadata unless some was stored before.
	///
	/// Returns `true` if this call stored it.
	pub fn adopt(&self, discovered: DiscoveredMetadata) -> bool {
		self.discovered.set(discovered).is_ok()
	}

	#[must_use]
	pub fn geom_type(&self) -> Option<GeometryType> {
		self.discovered().and_then(|d| d.geom_type)
	}

	#[must_use]
	pub fn category_id(&self, name: &str) -> Option<u32> {
		self.discovered().and_then(|d| d.category_to_id.get(name).copied())
	}

	#[must_use]
	pub fn category_name(&self, id: u32) -> Option<&str> {
		self.discovered().and_then(|d| d.id_to_category.get(&id).map(String::as_str))
	}

	/// A copy holding only the declared half, for starting a fresh source.
	#[must_use]
	pub fn declared_copy(&self) -> DatasetMetadata {
		DatasetMetadata::new(self.properties.clone(), Some(self.id_property.clone()))
	}
}

mod once_lock_serde {
	use super::DiscoveredMetadata;
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use std::sync::OnceLock;

	pub fn serialize<S: Serializer>(value: &OnceLock<DiscoveredMetadata>, serializer: S) -> Result<S::Ok, S::Error> {
		value.get().serialize(serializer)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OnceLock<DiscoveredMetadata>, D::Error> {
		let lock = OnceLock::new();
		if let Some(value) = Option::<DiscoveredMetadata>::deserialize(deserializer)? {
			let _ = lock.set(value);
		}
		Ok(lock)
	}
}
