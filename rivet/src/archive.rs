//! Whole-archive operations, over any store of named entries.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::scripts::{self, Scripts};

/// A set of named entries, each holding one stored script or other file.
///
/// Writes are staged by [`set_data`](Archive::set_data) and only persisted by
/// [`save`](Archive::save).
pub trait Archive: Sync {
	fn entries(&self) -> Vec<String>;
	fn load(&self, name: &str) -> io::Result<Vec<u8>>;
	fn set_data(&mut self, name: &str, data: Vec<u8>);
	fn save(&mut self) -> io::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum RebuildError {
	#[error("{name}: failed to load: {source}")]
	Load { name: String, source: io::Error },
	#[error("{name}: {source}")]
	Script { name: String, source: scripts::Error },
	#[error("failed to save archive")]
	Save(#[source] io::Error),
}

impl RebuildError {
	pub fn name(&self) -> Option<&str> {
		match self {
			RebuildError::Load { name, .. } => Some(name),
			RebuildError::Script { name, .. } => Some(name),
			RebuildError::Save(_) => None,
		}
	}
}

const IGNORED: &[&str] = &[
	"DBG", "MAIN", "DMENU", "SHORTCUT", "INIT", "CLRFLG", "DICT", "APPEND", "STARTUP",
];

/// Whether an entry holds a script that should be translated. `DATA` entries always are.
pub fn is_script(name: &str) -> bool {
	name.starts_with("DATA") || !IGNORED.iter().any(|p| name.starts_with(p))
}

fn script_text(archive: &dyn Archive, scripts: &Scripts, name: &str) -> Result<String, RebuildError> {
	if let Some(text) = scripts.text(name) {
		return Ok(text)
	}
	let stored = archive.load(name)
		.map_err(|source| RebuildError::Load { name: name.to_owned(), source })?;
	scripts.decompile_entry(name, &stored)
		.map_err(|source| RebuildError::Script { name: name.to_owned(), source })
}

/// Decompiles every script in the archive. Results are in entry order.
#[tracing::instrument(skip_all)]
pub fn dump(archive: &dyn Archive, scripts: &Scripts) -> Vec<(String, Result<String, RebuildError>)> {
	let names = archive.entries().into_iter().filter(|n| is_script(n)).collect::<Vec<_>>();
	tracing::debug!(count = names.len(), "dumping");
	names.into_par_iter()
		.map(|name| {
			let text = script_text(archive, scripts, &name);
			(name, text)
		})
		.collect()
}

/// Recompiles every script in the archive and saves it.
///
/// Scripts are compiled in parallel. If any fails, the first failure in entry order is returned
/// and the archive is left untouched.
#[tracing::instrument(skip_all)]
pub fn rebuild(archive: &mut dyn Archive, scripts: &Scripts) -> Result<usize, RebuildError> {
	let names = archive.entries().into_iter()
		.filter(|n| is_script(n) && scripts.check_and_clear_modified(n))
		.collect::<Vec<_>>();

	let compiled = {
		let archive = &*archive;
		names.into_par_iter()
			.map(|name| -> Result<_, RebuildError> {
				let _span = tracing::debug_span!("compile", script = %name).entered();
				let text = script_text(archive, scripts, &name)?;
				let data = scripts.compile(&name, &text).map_err(|e| RebuildError::Script {
					name: name.clone(),
					source: e.into(),
				})?;
				Ok((name, data))
			})
			.collect::<Vec<_>>()
	};
	let compiled = compiled.into_iter().collect::<Result<Vec<_>, _>>()?;

	let count = compiled.len();
	for (name, data) in compiled {
		archive.set_data(&name, data);
	}
	archive.save().map_err(RebuildError::Save)?;
	tracing::debug!(count, "rebuilt");
	Ok(count)
}

/// An archive unpacked into a directory, one file per entry.
#[derive(Debug)]
pub struct DirArchive {
	dir: PathBuf,
	names: Vec<String>,
	staged: BTreeMap<String, Vec<u8>>,
}

impl DirArchive {
	pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
		let dir = dir.as_ref().to_path_buf();
		let mut names = Vec::new();
		for ent in std::fs::read_dir(&dir)? {
			let ent = ent?;
			if !ent.file_type()?.is_file() {
				continue
			}
			match ent.file_name().into_string() {
				Ok(name) if !name.ends_with(".tmp") => names.push(name),
				Ok(_) => {}
				Err(name) => tracing::warn!(file = ?name, "skipping non-UTF-8 file name"),
			}
		}
		names.sort();
		Ok(DirArchive { dir, names, staged: BTreeMap::new() })
	}

	pub fn path(&self) -> &Path {
		&self.dir
	}
}

impl Archive for DirArchive {
	fn entries(&self) -> Vec<String> {
		self.names.clone()
	}

	fn load(&self, name: &str) -> io::Result<Vec<u8>> {
		match self.staged.get(name) {
			Some(data) => Ok(data.clone()),
			None => std::fs::read(self.dir.join(name)),
		}
	}

	fn set_data(&mut self, name: &str, data: Vec<u8>) {
		if let Err(i) = self.names.binary_search_by(|n| n.as_str().cmp(name)) {
			self.names.insert(i, name.to_owned());
		}
		self.staged.insert(name.to_owned(), data);
	}

	#[tracing::instrument(skip_all, fields(path = %self.dir.display()))]
	fn save(&mut self) -> io::Result<()> {
		// All temporaries are written before any entry is replaced.
		let mut written = Vec::with_capacity(self.staged.len());
		for (name, data) in &self.staged {
			let tmp = self.dir.join(format!("{name}.tmp"));
			if let Err(e) = std::fs::write(&tmp, data) {
				for tmp in &written {
					let _ = std::fs::remove_file(tmp);
				}
				return Err(e)
			}
			written.push(tmp);
		}
		for (name, tmp) in self.staged.keys().zip(&written) {
			std::fs::rename(tmp, self.dir.join(name))?;
			tracing::debug!(entry = %name, "saved");
		}
		self.staged.clear();
		Ok(())
	}
}

#[test]
fn script_filter() {
	assert!(is_script("SCRIPT01"));
	assert!(is_script("DATA"));
	assert!(is_script("DATA_01"));
	assert!(!is_script("DBG_TEST"));
	assert!(!is_script("MAIN"));
	assert!(!is_script("STARTUP"));
	assert!(!is_script("APPEND01"));
	assert!(is_script("dbg"));
}
