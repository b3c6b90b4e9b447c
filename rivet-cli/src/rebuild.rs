use std::path::PathBuf;

use clap::ValueHint;
use rivet::archive::{self, DirArchive, RebuildError};
use rivet::{scripts, Scripts};

use crate::util::print_diags;

#[derive(Debug, Clone, clap::Args)]
#[command(arg_required_else_help = true)]
/// Recompiles every script in an unpacked archive, taking edited text where there is any.
///
/// Scripts without a text file are recompiled from the archive's own bytecode. If any script
/// fails, nothing is written.
///
/// Compiled entries are written as bare compressed payloads, without the header that stored
/// entries have.
pub struct Command {
	/// The directory holding the archive's entries.
	#[clap(value_hint = ValueHint::DirPath)]
	archive: PathBuf,

	/// Directory of `<entry>.txt` files, as produced by `dump`.
	#[clap(value_hint = ValueHint::DirPath)]
	text: PathBuf,
}

#[tracing::instrument(skip_all, fields(path=%cmd.archive.display()))]
pub fn run(cmd: &Command) -> eyre::Result<()> {
	let mut archive = DirArchive::open(&cmd.archive)?;
	let scripts = Scripts::default();

	for ent in std::fs::read_dir(&cmd.text)? {
		let path = ent?.path();
		let Some(name) = path.file_name().and_then(|a| a.to_str()).and_then(|a| a.strip_suffix(".txt")) else {
			continue
		};
		scripts.set_text(name, std::fs::read_to_string(&path)?);
		tracing::trace!(entry = name, "loaded text");
	}

	match archive::rebuild(&mut archive, &scripts) {
		Ok(count) => {
			tracing::info!(count, "rebuilt");
			Ok(())
		}
		Err(e) => {
			if let RebuildError::Script { name, source: scripts::Error::Assemble(err) } = &e {
				if let Some(src) = scripts.text(name) {
					print_diags(&cmd.text.join(format!("{name}.txt")).to_string_lossy(), &src, err);
				}
			}
			Err(e.into())
		}
	}
}
