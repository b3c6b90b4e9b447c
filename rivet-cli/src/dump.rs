use std::path::PathBuf;

use clap::ValueHint;
use rivet::archive::{self, DirArchive};
use rivet::Scripts;

use crate::util::emit;

#[derive(Debug, Clone, clap::Args)]
#[command(arg_required_else_help = true)]
/// Decompiles every script in an unpacked archive.
///
/// Entries that are not scripts, such as debug menus, are skipped.
pub struct Command {
	/// Directory to place the text files in.
	///
	/// If unspecified, a directory will be created next to the archive directory, with a .txt
	/// suffix.
	#[clap(long, short, value_hint = ValueHint::DirPath)]
	output: Option<PathBuf>,

	/// The directory holding the archive's entries.
	#[clap(value_hint = ValueHint::DirPath)]
	archive: PathBuf,
}

#[tracing::instrument(skip_all, fields(path=%cmd.archive.display()))]
pub fn run(cmd: &Command) -> eyre::Result<()> {
	let archive = DirArchive::open(&cmd.archive)?;
	let outdir = match &cmd.output {
		Some(v) => v.clone(),
		None => cmd.archive.with_extension("txt"),
	};
	std::fs::create_dir_all(&outdir)?;

	let scripts = Scripts::default();
	let results = archive::dump(&archive, &scripts);
	let total = results.len();
	let mut failed = 0;
	for (name, text) in results {
		let r = text.map_err(eyre::Report::from).and_then(|text| {
			std::fs::write(outdir.join(format!("{name}.txt")), text)?;
			Ok(())
		});
		if emit(r).is_none() {
			failed += 1;
		}
	}
	eyre::ensure!(failed == 0, "{failed} of {total} scripts failed");
	tracing::info!(count = total, out=%outdir.display(), "dumped");
	Ok(())
}
