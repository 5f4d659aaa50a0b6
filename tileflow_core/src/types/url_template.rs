//! URL templates for tile requests.
//!
//! A source can be served from several hosts (`a.`, `b.`, `c.` subdomains) to let clients run
//! more requests in parallel. [`TileUrlTemplate`] picks a template per tile with
//! `|x + y| mod n`, the same spreading Leaflet uses, and substitutes `{x}`, `{y}` and `{z}`.
//!
//! Templates starting with `.` or `/` are relative and get resolved against a base URL.
//!
//! ```
//! use tileflow_core::{TileCoord, TileUrlTemplate};
//!
//! let templates = TileUrlTemplate::new(
//!     vec!["https://a.example.org/{z}/{x}/{y}.mvt".into(), "https://b.example.org/{z}/{x}/{y}.mvt".into()],
//!     None,
//! ).unwrap();
//! let url = templates.url_for(&TileCoord::new(1, 0, 2).unwrap()).unwrap();
//! assert_eq!(url.as_str(), "https://b.example.org/2/1/0.mvt");
//! ```

use crate::TileCoord;
use anyhow::{Context, Result, bail, ensure};
use reqwest::Url;

const PLACEHOLDERS: [&str; 3] = ["{x}", "{y}", "{z}"];

#[derive(Clone, Debug, PartialEq)]
pub struct TileUrlTemplate {
	templates: Vec<String>,
	base: Option<Url>,
}

impl TileUrlTemplate {
	/// Create a template set. Every template must contain `{x}`, `{y}` and `{z}`.
	///
	/// # Errors
	/// Fails if the list is empty, a placeholder is missing, or a relative template
	/// cannot be resolved because `base` is `None`.
	pub fn new(templates: Vec<String>, base: Option<Url>) -> Result<TileUrlTemplate> {
		ensure!(!templates.is_empty(), "at least one tile URL template is required");
		for template in &templates {
			for placeholder in PLACEHOLDERS {
				ensure!(
					template.contains(placeholder),
					"tile URL template '{template}' is missing the placeholder {placeholder}"
				);
			}
		}

		let result = TileUrlTemplate { templates, base };
		for template in &result.templates {
			result
				.resolve(template)
				.with_context(|| format!("invalid tile URL template '{template}'"))?;
		}
		Ok(result)
	}

	/// Convenience constructor for a single absolute template.
	pub fn single(template: &str) -> Result<TileUrlTemplate> {
		TileUrlTemplate::new(vec![template.to_string()], None)
	}

	#[must_use]
	pub fn templates(&self) -> &[String] {
		&self.templates
	}

	/// Index of the template serving `coord`.
	#[must_use]
	pub fn subdomain_index(&self, coord: &TileCoord) -> usize {
		((u64::from(coord.x) + u64::from(coord.y)) % self.templates.len() as u64) as usize
	}

	/// Build the absolute URL of a tile.
	pub fn url_for(&self, coord: &TileCoord) -> Result<Url> {
		let template = &self.templates[self.subdomain_index(coord)];
		let url = template
			.replace("{x}", &coord.x.to_string())
			.replace("{y}", &coord.y.to_string())
			.replace("{z}", &coord.z.to_string());
		self.resolve(&url)
	}

	fn resolve(&self, url: &str) -> Result<Url> {
		if url.starts_with('.') || url.starts_with('/') {
			match &self.base {
				Some(base) => Ok(base.join(url)?),
				None => bail!("relative URL '{url}' needs a base URL"),
			}
		} else {
			Ok(Url::parse(url)?)
		}
	}
}
