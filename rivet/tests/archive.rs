use std::collections::BTreeMap;
use std::io;

use rivet::archive::{self, Archive, DirArchive, RebuildError};
use rivet::container::{Compression, Lzss, HEADER_LEN};
use rivet::scripts::{self, Scripts};
use rivet::asm::ErrorKind;

#[derive(Debug, Default)]
struct MemArchive {
	entries: BTreeMap<String, Vec<u8>>,
	staged: BTreeMap<String, Vec<u8>>,
	saves: usize,
}

impl MemArchive {
	fn insert(&mut self, name: &str, bytecode: &[u8]) {
		let mut stored = vec![0; HEADER_LEN];
		stored.extend(Lzss.compress(bytecode));
		self.entries.insert(name.to_owned(), stored);
	}
}

impl Archive for MemArchive {
	fn entries(&self) -> Vec<String> {
		self.entries.keys().cloned().collect()
	}

	fn load(&self, name: &str) -> io::Result<Vec<u8>> {
		self.entries.get(name).cloned().ok_or_else(|| io::ErrorKind::NotFound.into())
	}

	fn set_data(&mut self, name: &str, data: Vec<u8>) {
		self.staged.insert(name.to_owned(), data);
	}

	fn save(&mut self) -> io::Result<()> {
		self.saves += 1;
		self.entries.append(&mut self.staged);
		Ok(())
	}
}

fn message(text: &str) -> Vec<u8> {
	let mut data = vec![0x73, 0, 0, 0, 12, 0, 0, 0, 0, 0, 0, 0];
	data.extend_from_slice(text.as_bytes());
	data.push(0);
	data
}

fn sample() -> MemArchive {
	let mut a = MemArchive::default();
	a.insert("SCRIPT_A", &message("first"));
	a.insert("SCRIPT_B", &message("second"));
	a.insert("DATA", &message("data"));
	// Not a script, and not valid bytecode either.
	a.insert("DBG_MENU", &[0xEE]);
	a
}

#[test]
fn dump_skips_non_scripts() {
	let a = sample();
	let scripts = Scripts::default();
	let out = archive::dump(&a, &scripts);
	let names = out.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>();
	assert_eq!(names, ["DATA", "SCRIPT_A", "SCRIPT_B"]);
	for (_, text) in &out {
		assert!(text.as_ref().unwrap().starts_with("msg_disp2.12~"));
	}
	assert_eq!(
		scripts.text("SCRIPT_B").unwrap(),
		"msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00~@second\n",
	);
}

#[test]
fn rebuild_applies_edits() {
	let mut a = sample();
	let scripts = Scripts::default();
	scripts.set_text("SCRIPT_B", "msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00~@edited\n");

	assert_eq!(archive::rebuild(&mut a, &scripts).unwrap(), 3);
	assert_eq!(a.saves, 1);
	assert!(!scripts.is_modified("SCRIPT_B"));

	// Compiled entries are stored without a header.
	let stored = &a.entries["SCRIPT_B"];
	assert_eq!(Lzss.decompress(stored).unwrap(), message("edited"));
	let stored = &a.entries["SCRIPT_A"];
	assert_eq!(Lzss.decompress(stored).unwrap(), message("first"));
	assert_eq!(a.entries["DBG_MENU"][HEADER_LEN..], Lzss.compress(&[0xEE]));
}

#[test]
fn rebuild_stops_at_first_failure() {
	let mut a = sample();
	let before = a.entries.clone();
	let scripts = Scripts::default();
	scripts.set_text("SCRIPT_A", "end.2~01-00\nend.5~01-00\n");
	scripts.set_text("SCRIPT_B", "bogus.1~00\n");

	let err = archive::rebuild(&mut a, &scripts).unwrap_err();
	assert_eq!(err.name(), Some("SCRIPT_A"));
	let RebuildError::Script { source: scripts::Error::Assemble(e), .. } = &err else {
		panic!("{err:?}")
	};
	assert_eq!(e.diags[0].loc.line, 2);
	assert_eq!(e.diags[0].kind, ErrorKind::LengthMismatch { declared: 5, actual: 2 });
	assert!(err.to_string().starts_with("SCRIPT_A: 2:1: "));

	assert_eq!(a.saves, 0);
	assert!(a.staged.is_empty());
	assert_eq!(a.entries, before);
}

#[test]
fn dir_archive_saves_staged_entries() {
	let dir = std::env::temp_dir().join(format!("rivet-test-{}", std::process::id()));
	std::fs::create_dir_all(&dir).unwrap();
	std::fs::write(dir.join("SCRIPT_A"), [1, 2, 3]).unwrap();
	std::fs::write(dir.join("MAIN"), [4]).unwrap();

	let mut a = DirArchive::open(&dir).unwrap();
	assert_eq!(a.entries(), ["MAIN", "SCRIPT_A"]);
	a.set_data("SCRIPT_A", vec![9]);
	assert_eq!(a.load("SCRIPT_A").unwrap(), [9]);
	assert_eq!(std::fs::read(dir.join("SCRIPT_A")).unwrap(), [1, 2, 3]);
	a.save().unwrap();
	assert_eq!(std::fs::read(dir.join("SCRIPT_A")).unwrap(), [9]);
	assert!(!dir.join("SCRIPT_A.tmp").exists());

	std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_save_replaces_nothing() {
	let dir = std::env::temp_dir().join(format!("rivet-test-save-{}", std::process::id()));
	std::fs::create_dir_all(&dir).unwrap();
	std::fs::write(dir.join("SCRIPT_A"), [1]).unwrap();
	std::fs::write(dir.join("SCRIPT_B"), [2]).unwrap();
	// Blocks the temporary file for the second entry.
	std::fs::create_dir_all(dir.join("SCRIPT_B.tmp")).unwrap();

	let mut a = DirArchive::open(&dir).unwrap();
	a.set_data("SCRIPT_A", vec![3]);
	a.set_data("SCRIPT_B", vec![4]);
	assert!(a.save().is_err());
	assert_eq!(std::fs::read(dir.join("SCRIPT_A")).unwrap(), [1]);
	assert_eq!(std::fs::read(dir.join("SCRIPT_B")).unwrap(), [2]);
	assert!(!dir.join("SCRIPT_A.tmp").exists());

	// The same through a whole rebuild.
	let scripts = Scripts::default();
	scripts.set_text("SCRIPT_A", "end.2~01-00\n");
	scripts.set_text("SCRIPT_B", "end.2~01-00\n");
	let mut a = DirArchive::open(&dir).unwrap();
	let err = archive::rebuild(&mut a, &scripts).unwrap_err();
	assert!(matches!(err, RebuildError::Save(_)));
	assert_eq!(std::fs::read(dir.join("SCRIPT_A")).unwrap(), [1]);
	assert_eq!(std::fs::read(dir.join("SCRIPT_B")).unwrap(), [2]);

	std::fs::remove_dir_all(&dir).unwrap();
}
