mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{ErrorLevel, Verbosity};

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[command(flatten)]
	verbose: Verbosity<ErrorLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Load the tiles of a viewport from a source and report what arrived
	Probe(tools::probe::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	run(cli)
}

fn run(cli: Cli) -> Result<()> {
	match &cli.command {
		Commands::Probe(arguments) => tools::probe::run(arguments),
	}
}

#[cfg(test)]
mod tests {
	use crate::{Cli, run};
	use anyhow::Result;
	use clap::Parser;

	pub fn run_command(arg_vec: Vec<&str>) -> Result<String> {
		let cli = Cli::try_parse_from(arg_vec)?;
		let msg = format!("{cli:?}");
		run(cli)?;
		Ok(msg)
	}

	#[test]
	fn help() {
		let err = run_command(vec!["tileflow"]).unwrap_err().to_string();
		assert!(err.starts_with("Client-side map tile pipeline"), "{err}");
		assert!(err.contains("\nUsage: tileflow [OPTIONS] <COMMAND>"), "{err}");
	}

	#[test]
	fn version() {
		let err = run_command(vec!["tileflow", "-V"]).unwrap_err().to_string();
		assert!(err.starts_with("tileflow "));
	}

	#[test]
	fn probe_subcommand() {
		let output = run_command(vec!["tileflow", "probe"]).unwrap_err().to_string();
		assert!(
			output.starts_with("Load the tiles of a viewport from a source and report what arrived"),
			"{output}"
		);
	}
}
