use clap::Parser;

mod util;

mod decompile;
mod compile;
mod dump;
mod rebuild;

use util::emit;

#[derive(Debug, Clone, Parser)]
#[command(disable_help_subcommand = true)]
struct Cli {
	#[clap(subcommand)]
	command: Command,
}

#[derive(Debug, Clone, clap::Subcommand)]
enum Command {
	/// Turn script bytecode into editable text [dec]
	#[clap(alias = "dec")]
	Decompile(decompile::Command),
	/// Turn text back into script bytecode [com]
	#[clap(alias = "com")]
	Compile(compile::Command),
	/// Decompile every script in an unpacked archive
	Dump(dump::Command),
	/// Recompile every script in an unpacked archive, applying edited text
	Rebuild(rebuild::Command),
}

fn main() -> eyre::Result<()> {
	use tracing_subscriber::prelude::*;
	use tracing_subscriber::{fmt, EnvFilter};

	let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
	let filter_layer = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new("info"))?;

	tracing_subscriber::registry()
		.with(filter_layer)
		.with(fmt_layer)
		.init();

	let cli = Cli::parse();
	let ok = match cli.command {
		Command::Decompile(cmd) => emit(decompile::run(&cmd)),
		Command::Compile(cmd) => emit(compile::run(&cmd)),
		Command::Dump(cmd) => emit(dump::run(&cmd)),
		Command::Rebuild(cmd) => emit(rebuild::run(&cmd)),
	};
	if ok.is_none() {
		std::process::exit(1);
	}
	Ok(())
}
