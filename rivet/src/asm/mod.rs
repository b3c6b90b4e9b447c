//! IR text to bytecode.
//!
//! Assembly is two passes. [`scan`] walks the text once, writing instruction bytes and recording
//! everything that can only be filled in later: references to labels defined further down, and the
//! slots that will hold string offsets. [`link`] then resolves the references and lays out the
//! string table directly after the code, followed by the trailer.

use crate::catalog::Catalog;
use crate::span::Loc;
use crate::text::{EncodeError, TextCodec};

mod link;
mod scan;

pub use link::link;
pub use scan::{scan, Fixup, Scan, StringRecord};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
	#[error("unknown instruction `{0}`")]
	UnknownOpcode(String),
	#[error("instruction is {actual} bytes, but is declared as {declared}")]
	LengthMismatch { declared: usize, actual: usize },
	#[error("undefined label `&{0}`")]
	UndefinedLabel(String),
	#[error("label `&{0}` is already defined")]
	DuplicateLabel(String),
	#[error("label `&{name}` is at {pos:#X}, which does not fit in 16 bits")]
	LabelRange { name: String, pos: usize },
	#[error("string {text:?} would be placed at {offset:#X}, past the 64KiB mark")]
	StringTableOverflow { offset: usize, text: String },
	#[error(transparent)]
	Encoding(EncodeError),
	#[error("string slot has no string")]
	MissingString,
	#[error("{0}")]
	Syntax(String),
}

/// An error at a position in the source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{loc}: {kind}")]
pub struct Diag {
	pub loc: Loc,
	pub kind: ErrorKind,
}

impl Diag {
	pub fn new(loc: Loc, kind: ErrorKind) -> Diag {
		Diag { loc, kind }
	}
}

/// One or more errors that prevented assembly. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleError {
	pub diags: Vec<Diag>,
}

impl std::error::Error for AssembleError {}

impl std::fmt::Display for AssembleError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.diags.as_slice() {
			[] => f.write_str("assembly failed"),
			[d] => write!(f, "{d}"),
			[d, rest@..] => write!(f, "{d} (and {} more)", rest.len()),
		}
	}
}

impl From<Diag> for AssembleError {
	fn from(d: Diag) -> Self {
		AssembleError { diags: vec![d] }
	}
}

pub fn assemble(catalog: &Catalog, codec: TextCodec, src: &str) -> Result<Vec<u8>, AssembleError> {
	let scan = scan(catalog, src)?;
	link(scan, codec)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::catalog::PSP;
	use crate::span::Span;

	fn asm(src: &str) -> Result<Vec<u8>, AssembleError> {
		assemble(&PSP, TextCodec::ShiftJis, src)
	}

	fn kinds(src: &str) -> Vec<ErrorKind> {
		asm(src).unwrap_err().diags.into_iter().map(|d| d.kind).collect()
	}

	#[test]
	fn plain_instruction() {
		assert_eq!(asm("end.2~01-00\n").unwrap(), [0x01, 0x00]);
		assert_eq!(asm("end.2~01-00").unwrap(), [0x01, 0x00]);
		assert_eq!(asm("end.2~01-00\r\n").unwrap(), [0x01, 0x00]);
	}

	#[test]
	fn relocates_string() {
		let src = "msg_disp2.12~73-00-01-02-S-00-00-05-06-07-08-09-0A~@test\n";
		let mut expect = vec![0x73, 0x00, 0x01, 0x02, 0x0C, 0x00, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A];
		expect.extend_from_slice(b"test\0");
		assert_eq!(asm(src).unwrap(), expect);

		// The legacy offset after `S` is ignored.
		let legacy = "msg_disp2.12~73-00-01-02-S-34-12-05-06-07-08-09-0A~@test\n";
		assert_eq!(asm(legacy).unwrap(), expect);
	}

	#[test]
	fn strings_in_declaration_order() {
		let src = concat!(
			"sel_disp2.22~74-02-00-00-00-00-S-00-00-00-00-00-00-00-00-S-00-00-00-00-00-00-00-00~§a b §~@c\n",
			"msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00~@d\n",
			"trailer.3~01-02-03\n",
		);
		let out = asm(src).unwrap();
		assert_eq!(&out[6..8], [34, 0]);
		assert_eq!(&out[14..16], [39, 0]);
		assert_eq!(&out[26..28], [41, 0]);
		assert_eq!(&out[34..], b"a b \0c\0d\0\x01\x02\x03");
	}

	#[test]
	fn comments_and_blank_lines() {
		let src = "# header\n\n   \n\tend.2~01-00\n  # trailing\n";
		assert_eq!(asm(src).unwrap(), [0x01, 0x00]);
	}

	#[test]
	fn length_is_enforced() {
		assert_eq!(kinds("end.3~01-00"), [ErrorKind::LengthMismatch { declared: 3, actual: 2 }]);
		assert_eq!(kinds("end.1~01-00"), [ErrorKind::LengthMismatch { declared: 1, actual: 2 }]);
		assert_eq!(kinds("trailer.2~01"), [ErrorKind::LengthMismatch { declared: 2, actual: 1 }]);
	}

	#[test]
	fn labels_resolve_both_ways() {
		let src = concat!(
			"int_goto.4~03-00-&end\n",
			"&top: nop.1~00\n",
			"&end:\n",
			"int_goto.4~03-00-&end\n",
			"int_goto.4~03-00-&top\n",
		);
		let out = asm(src).unwrap();
		assert_eq!(out, [0x03, 0x00, 5, 0, 0x00, 0x03, 0x00, 5, 0, 0x03, 0x00, 4, 0]);
	}

	#[test]
	fn undefined_labels_are_all_reported() {
		let err = asm("int_goto.4~03-00-&a\nint_goto.4~03-00-&b\n").unwrap_err();
		assert_eq!(err.diags.len(), 2);
		assert_eq!(err.diags[0].kind, ErrorKind::UndefinedLabel("a".into()));
		assert_eq!(err.diags[1].kind, ErrorKind::UndefinedLabel("b".into()));
		assert_eq!(err.diags[1].loc.line, 2);
		assert_eq!(err.diags[1].loc.column, 18);
		assert_eq!(err.to_string(), "1:18: undefined label `&a` (and 1 more)");
	}

	#[test]
	fn duplicate_label() {
		assert_eq!(
			kinds("&a: nop.1~00\n&a: nop.1~00\n"),
			[ErrorKind::DuplicateLabel("a".into())],
		);
	}

	#[test]
	fn unknown_opcode() {
		let err = asm("end.2~01-00\n  bogus.1~00\n").unwrap_err();
		assert_eq!(err.diags[0].kind, ErrorKind::UnknownOpcode("bogus".into()));
		assert_eq!(err.diags[0].loc.span, Span::new(14, 19));
		assert_eq!((err.diags[0].loc.line, err.diags[0].loc.column), (2, 3));
	}

	#[test]
	fn string_slots_must_be_filled() {
		assert_eq!(
			kinds("msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00\n"),
			[ErrorKind::MissingString],
		);
		assert!(matches!(
			kinds("end.2~01-00~@stray").as_slice(),
			[ErrorKind::Syntax(_)],
		));
	}

	#[test]
	fn syntax_errors() {
		for src in [
			"end2~01-00",
			"end.2 01-00",
			"end.~01-00",
			"end.2~01-0",
			"end.2~01-00-zz",
			"msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00~§open",
			"msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00-00-00~@x",
			"trailer.1~00\nend.2~01-00",
			"&: nop.1~00",
		] {
			let err = asm(src).unwrap_err();
			assert_eq!(err.diags.len(), 1, "{src}");
		}
	}

	#[test]
	fn encoding_error_points_at_character() {
		let src = "msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00~@ab€\n";
		let err = asm(src).unwrap_err();
		let d = &err.diags[0];
		assert!(matches!(d.kind, ErrorKind::Encoding(EncodeError { index: 2, ch: '€', .. })));
		assert_eq!(d.loc.column, src.find('€').unwrap() + 1);
		assert_eq!(&src[d.loc.span.as_range()], "€");
	}

	#[test]
	fn guillemets_become_fullwidth() {
		let src = "msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00~@«x»\n";
		let out = asm(src).unwrap();
		let expect = TextCodec::ShiftJis.encode("《x》").unwrap();
		assert_eq!(&out[12..out.len()-1], expect);
	}

	#[test]
	fn string_table_overflow() {
		let mut src = String::new();
		for _ in 0..0x1000 {
			src.push_str("msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00~@0123456789ABCDEF\n");
		}
		let err = asm(&src).unwrap_err();
		assert!(matches!(
			&err.diags[0].kind,
			ErrorKind::StringTableOverflow { offset, text } if *offset > 0xFFFF && text == "0123456789ABCDEF",
		));
	}

	#[test]
	fn label_out_of_range() {
		let mut src = "nop.1~00\n".repeat(0xFFFF);
		src.push_str("&last:\nnop.1~00\n&far:\nend.2~01-00\n");
		let err = asm(&src).unwrap_err();
		assert_eq!(err.diags.len(), 1);
		let d = &err.diags[0];
		assert_eq!(d.kind, ErrorKind::LabelRange { name: "far".into(), pos: 0x10000 });
		assert_eq!((d.loc.line, d.loc.column), (0x10002, 1));

		// The last addressable byte is still fine.
		let src = "nop.1~00\n".repeat(0xFFFF) + "&last:\nend.2~01-00\nint_goto.4~03-00-&last\n";
		let out = asm(&src).unwrap();
		assert_eq!(out[0x10001..], [0x03, 0x00, 0xFF, 0xFF]);
	}
}
