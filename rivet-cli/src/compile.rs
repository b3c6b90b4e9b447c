use std::io::Write;
use std::path::{Path, PathBuf};

use clap::ValueHint;
use rivet::{Scripts, PSP};

use crate::util::{emit, get_output, output_path, print_diags, read_input};

#[derive(Debug, Clone, clap::Args)]
#[command(arg_required_else_help = true)]
/// Turns text back into script bytecode.
pub struct Command {
	/// Where to place the output.
	///
	/// If unspecified, the bytecode is placed next to each input with a .bin suffix. If there are
	/// several inputs, this is a directory.
	#[clap(long, short, value_hint = ValueHint::AnyPath)]
	output: Option<PathBuf>,

	/// Compress the output as for storing in the archive.
	///
	/// No container header is written.
	#[clap(long, short = 'z')]
	compress: bool,

	/// The files to compile. Can be `-` to read from stdin.
	#[clap(value_hint = ValueHint::FilePath, required = true)]
	file: Vec<PathBuf>,
}

pub fn run(cmd: &Command) -> eyre::Result<()> {
	let scripts = Scripts::default();
	let failed = cmd.file.iter()
		.filter(|file| {
			let _span = tracing::info_span!("compile", path = %file.display()).entered();
			emit(compile(cmd, &scripts, file)).is_none()
		})
		.count();
	eyre::ensure!(failed == 0, "{failed} of {} files failed", cmd.file.len());
	Ok(())
}

fn compile(cmd: &Command, scripts: &Scripts, file: &Path) -> eyre::Result<()> {
	let src = String::from_utf8(read_input(file)?)?;
	let filename = if file.as_os_str() == "-" {
		"<stdin>".into()
	} else {
		file.to_string_lossy()
	};

	let result = if cmd.compress {
		scripts.compile(&filename, &src)
	} else {
		rivet::assemble(&PSP, scripts.codec(), &src)
	};
	let data = match result {
		Ok(data) => data,
		Err(e) => {
			print_diags(&filename, &src, &e);
			eyre::bail!("failed with {} errors", e.diags.len())
		}
	};

	let out = output_path(cmd.output.as_deref(), file, cmd.file.len() > 1, "bin");
	get_output(&out)?.write_all(&data)?;
	tracing::debug!(out=%out.display(), len = data.len(), "compiled");
	Ok(())
}
