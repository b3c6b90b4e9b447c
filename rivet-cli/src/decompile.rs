use std::io::Write;
use std::path::{Path, PathBuf};

use clap::ValueHint;
use rivet::Scripts;

use crate::util::{emit, get_output, output_path, read_input};

#[derive(Debug, Clone, clap::Args)]
#[command(arg_required_else_help = true)]
/// Turns script bytecode into text, one instruction per line.
pub struct Command {
	/// Where to place the output.
	///
	/// If unspecified, the text is placed next to each input with a .txt suffix. If there are
	/// several inputs, this is a directory.
	#[clap(long, short, value_hint = ValueHint::AnyPath)]
	output: Option<PathBuf>,

	/// Inputs are entries as stored in the archive, with a header and compression.
	#[clap(long, short)]
	container: bool,

	/// The files to decompile. Can be `-` to read from stdin.
	#[clap(value_hint = ValueHint::FilePath, required = true)]
	file: Vec<PathBuf>,
}

pub fn run(cmd: &Command) -> eyre::Result<()> {
	let scripts = Scripts::default();
	let failed = cmd.file.iter()
		.filter(|file| {
			let _span = tracing::info_span!("decompile", path = %file.display()).entered();
			emit(decompile(cmd, &scripts, file)).is_none()
		})
		.count();
	eyre::ensure!(failed == 0, "{failed} of {} files failed", cmd.file.len());
	Ok(())
}

fn decompile(cmd: &Command, scripts: &Scripts, file: &Path) -> eyre::Result<()> {
	let data = read_input(file)?;
	let name = file.to_string_lossy();
	let text = if cmd.container {
		scripts.decompile_entry(&name, &data)?
	} else {
		scripts.decompile(&name, &data)?
	};

	let out = output_path(cmd.output.as_deref(), file, cmd.file.len() > 1, "txt");
	get_output(&out)?.write_all(text.as_bytes())?;
	tracing::debug!(out=%out.display(), lines = text.lines().count(), "decompiled");
	Ok(())
}
