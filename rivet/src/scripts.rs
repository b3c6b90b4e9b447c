use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::asm::{assemble, AssembleError};
use crate::catalog::{Catalog, PSP};
use crate::container::{self, BoxError, Compression, Lzss};
use crate::disasm::{self, disassemble};
use crate::text::TextCodec;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("entry has no header")]
	Header(#[source] gospel::read::Error),
	#[error("failed to decompress")]
	Decompress(#[source] BoxError),
	#[error(transparent)]
	Disasm(#[from] disasm::Error),
	#[error(transparent)]
	Assemble(#[from] AssembleError),
}

#[derive(Debug, Clone)]
struct Entry {
	text: String,
	modified: bool,
}

/// Translates scripts in both directions, remembering the text of each script by name.
///
/// Shareable between threads. Concurrent edits of the same script are not coordinated; the last
/// one wins.
pub struct Scripts {
	catalog: &'static Catalog,
	codec: TextCodec,
	container: Box<dyn Compression>,
	cache: Mutex<HashMap<String, Entry>>,
}

impl std::fmt::Debug for Scripts {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Scripts")
			.field("codec", &self.codec)
			.field("cached", &self.lock().len())
			.finish_non_exhaustive()
	}
}

impl Default for Scripts {
	fn default() -> Self {
		Scripts::new(&PSP, TextCodec::default(), Box::new(Lzss))
	}
}

impl Scripts {
	pub fn new(catalog: &'static Catalog, codec: TextCodec, container: Box<dyn Compression>) -> Self {
		Scripts { catalog, codec, container, cache: Mutex::default() }
	}

	pub fn codec(&self) -> TextCodec {
		self.codec
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
		// The map is always left consistent, so a panic elsewhere does not invalidate it.
		self.cache.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Returns the text of a script, disassembling `bytecode` only if the script has not been seen
	/// before.
	pub fn decompile(&self, name: &str, bytecode: &[u8]) -> Result<String, disasm::Error> {
		if let Some(e) = self.lock().get(name) {
			tracing::trace!(script = name, "cached");
			return Ok(e.text.clone())
		}
		let text = disassemble(self.catalog, self.codec, bytecode)?;
		tracing::debug!(script = name, len = bytecode.len(), "decompiled");
		let mut cache = self.lock();
		let e = cache.entry(name.to_owned()).or_insert(Entry { text, modified: false });
		Ok(e.text.clone())
	}

	/// Like [`decompile`](Self::decompile), but takes an entry as stored in the archive.
	pub fn decompile_entry(&self, name: &str, stored: &[u8]) -> Result<String, Error> {
		if let Some(text) = self.text(name) {
			return Ok(text)
		}
		let payload = container::strip_header(stored).map_err(Error::Header)?;
		let bytecode = self.container.decompress(payload).map_err(Error::Decompress)?;
		Ok(self.decompile(name, &bytecode)?)
	}

	pub fn text(&self, name: &str) -> Option<String> {
		self.lock().get(name).map(|e| e.text.clone())
	}

	/// Replaces the text of a script, marking it modified.
	pub fn set_text(&self, name: &str, text: impl Into<String>) {
		let text = text.into();
		self.lock().insert(name.to_owned(), Entry { text, modified: true });
	}

	/// Clears the modified flag of a script.
	///
	/// Always returns true: scripts are recompiled on every rebuild whether or not they were
	/// edited. The flag is still tracked so that this can be made to skip unchanged scripts.
	pub fn check_and_clear_modified(&self, name: &str) -> bool {
		if let Some(e) = self.lock().get_mut(name) {
			e.modified = false;
		}
		true
	}

	/// Whether a script has been edited since it was last checked.
	pub fn is_modified(&self, name: &str) -> bool {
		self.lock().get(name).map_or(false, |e| e.modified)
	}

	/// Assembles and compresses a script.
	///
	/// The result is the bare compressed payload; it does not have the header that
	/// [`decompile_entry`](Self::decompile_entry) expects.
	#[tracing::instrument(skip_all, fields(script = name))]
	pub fn compile(&self, name: &str, text: &str) -> Result<Vec<u8>, AssembleError> {
		let bytecode = assemble(self.catalog, self.codec, text)?;
		let packed = self.container.compress(&bytecode);
		tracing::debug!(len = bytecode.len(), packed = packed.len(), "compiled");
		Ok(packed)
	}
}
