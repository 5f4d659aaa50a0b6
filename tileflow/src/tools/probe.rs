use anyhow::{Result, bail};
use clap::Args;
use parking_lot::Mutex;
use std::{path::PathBuf, sync::Arc};
use tileflow_core::{Dataframe, Viewport, ZoomMapping};
use tileflow_source::{config::SourceConfig, source::TiledSource};

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// Viewport as "west,south,east,north" in degrees
	#[arg(long, short = 'b', allow_hyphen_values = true)]
	viewport: String,

	/// Zoom level of the viewport, may be fractional
	#[arg(long, short)]
	zoom: f64,

	/// Source configuration in YAML
	#[arg(long, short)]
	config: Option<PathBuf>,

	/// Tile URL template, may be repeated; replaces the URLs of the config file
	#[arg(long = "url", short = 'u')]
	urls: Vec<String>,

	/// Base URL for relative templates
	#[arg(long)]
	base_url: Option<String>,

	/// Layer to decode
	#[arg(long)]
	layer_id: Option<String>,

	/// How the viewport zoom is mapped to a source zoom: ceil, floor or round
	#[arg(long, value_parser = str::parse::<ZoomMapping>)]
	zoom_mapping: Option<ZoomMapping>,

	/// Never request tiles above this zoom level
	#[arg(long)]
	max_zoom: Option<u8>,

	/// Run the same viewport update this many times
	#[arg(long, default_value_t = 1)]
	repeat: u32,
}

impl Subcommand {
	/// The config file, if any, with the command line flags applied on top.
	fn source_config(&self) -> Result<SourceConfig> {
		let mut config = match &self.config {
			Some(path) => SourceConfig::from_path(path)?,
			None => {
				if self.urls.is_empty() {
					bail!("either --config or at least one --url is required");
				}
				SourceConfig::from_urls(Vec::new())
			}
		};

		if !self.urls.is_empty() {
			config.urls.clone_from(&self.urls);
		}
		if self.base_url.is_some() {
			config.base_url.clone_from(&self.base_url);
		}
		if self.layer_id.is_some() {
			config.layer_id.clone_from(&self.layer_id);
		}
		if let Some(mapping) = &self.zoom_mapping {
			config.zoom_mapping = mapping.clone();
		}
		if self.max_zoom.is_some() {
			config.max_zoom = self.max_zoom;
		}

		config.validate()?;
		Ok(config)
	}
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	let config = arguments.source_config()?;
	let viewport = Viewport::parse(&arguments.viewport)?;
	let source = config.build_mvt_source()?;

	let source_zoom = source.client().options().zoom_policy.source_zoom(arguments.zoom)?;
	eprintln!("probe {viewport:?} at zoom {} (source zoom {source_zoom})", arguments.zoom);

	let received: Arc<Mutex<Vec<Arc<Dataframe>>>> = Arc::default();
	let sink = Arc::clone(&received);
	source.bind_layer(Box::new(move |frame| sink.lock().push(frame)));

	for round in 1..=arguments.repeat {
		let changed = source.request_data(arguments.zoom, &viewport)?.await?;
		println!("update {round}: active set changed: {changed}");
	}

	let active = source.client().active_dataframes();
	let empty = active.iter().filter(|f| f.is_empty()).count();
	println!("active tiles: {} ({empty} empty)", active.len());
	for frame in &active {
		println!(
			"  {}: {} features, {} bytes{}",
			frame.coord(),
			frame.num_features(),
			frame.features().len(),
			if frame.is_empty() { ", empty" } else { "" }
		);
	}
	println!("tiles handed to the layer: {}", received.lock().len());

	let metadata = source.request_metadata().await?;
	match metadata.discovered() {
		Some(discovered) => println!(
			"geometry type: {:?}, categories: {}",
			discovered.geom_type, discovered.num_categories
		),
		None => println!("no metadata discovered"),
	}

	source.free();
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Cli, Commands, tests::run_command};
	use clap::Parser;
	use pretty_assertions::assert_eq;
	use std::io::Write;

	fn probe_args(args: &[&str]) -> Subcommand {
		let mut argv = vec!["tileflow", "probe"];
		argv.extend_from_slice(args);
		match Cli::try_parse_from(argv).unwrap().command {
			Commands::Probe(arguments) => arguments,
		}
	}

	#[test]
	fn flags_build_a_config() {
		let args = probe_args(&[
			"-b",
			"-10,-5,10,5",
			"-z",
			"3.5",
			"-u",
			"https://a.tiles.test/{z}/{x}/{y}.mvt",
			"-u",
			"https://b.tiles.test/{z}/{x}/{y}.mvt",
			"--zoom-mapping",
			"floor",
			"--max-zoom",
			"12",
		]);
		let config = args.source_config().unwrap();
		assert_eq!(config.urls.len(), 2);
		assert_eq!(config.zoom_mapping, ZoomMapping::Floor);
		assert_eq!(config.max_zoom, Some(12));
		assert_eq!(args.repeat, 1);
	}

	#[test]
	fn flags_override_the_config_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "urls: https://t.test/{{z}}/{{x}}/{{y}}.mvt\nlayer_id: roads\nmax_zoom: 9").unwrap();
		let path = file.path().to_str().unwrap();

		let args = probe_args(&["-b", "0,0,1,1", "-z", "2", "-c", path, "--layer-id", "water"]);
		let config = args.source_config().unwrap();
		assert_eq!(config.urls, vec!["https://t.test/{z}/{x}/{y}.mvt".to_string()]);
		assert_eq!(config.layer_id.as_deref(), Some("water"));
		assert_eq!(config.max_zoom, Some(9));
	}

	#[test]
	fn needs_a_source() {
		let args = probe_args(&["-b", "0,0,1,1", "-z", "2"]);
		let err = args.source_config().unwrap_err().to_string();
		assert!(err.contains("--url"), "{err}");
	}

	#[test]
	fn invalid_viewport_fails() {
		let err = run_command(vec![
			"tileflow",
			"probe",
			"-b",
			"10,0,-10,5",
			"-z",
			"2",
			"-u",
			"https://t.test/{z}/{x}/{y}.mvt",
		])
		.unwrap_err();
		assert!(!format!("{err:#}").is_empty());
	}
}
