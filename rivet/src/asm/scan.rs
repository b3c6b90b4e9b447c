use std::collections::HashMap;

use gospel::write::{Slot, Writer};

use crate::catalog::Catalog;
use crate::span::{Loc, Span};
use super::{Diag, ErrorKind};

/// The output of the first assembly pass.
#[derive(Debug, Clone, Default)]
pub struct Scan {
	/// Code with zeroes in every label and string slot.
	pub code: Writer,
	pub labels: HashMap<String, u16>,
	/// References to labels that were not yet defined when they were encountered.
	pub fixups: Vec<Fixup>,
	/// In the order they appear in the text, which is the order of the string table.
	pub strings: Vec<StringRecord>,
	pub trailer: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixup {
	pub slot: Slot,
	pub label: String,
	pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRecord {
	pub slot: Slot,
	pub text: String,
	/// Location of the text itself, excluding the delimiters.
	pub loc: Loc,
}

struct Line<'a> {
	text: &'a str,
	base: usize,
	number: usize,
	pos: usize,
}

impl<'a> Line<'a> {
	fn rest(&self) -> &'a str {
		&self.text[self.pos..]
	}

	fn peek(&self) -> Option<char> {
		self.rest().chars().next()
	}

	fn is_done(&self) -> bool {
		self.pos == self.text.len()
	}

	fn eat(&mut self, c: char) -> bool {
		if self.rest().starts_with(c) {
			self.pos += c.len_utf8();
			true
		} else {
			false
		}
	}

	fn take_while(&mut self, f: impl Fn(char) -> bool) -> &'a str {
		let rest = self.rest();
		let len = rest.find(|c| !f(c)).unwrap_or(rest.len());
		self.pos += len;
		&rest[..len]
	}

	fn skip_blank(&mut self) {
		self.take_while(|c| c == ' ' || c == '\t');
	}

	fn ident(&mut self) -> &'a str {
		self.take_while(|c| c.is_ascii_alphanumeric() || c == '_')
	}

	fn hex_byte(&mut self) -> Option<u8> {
		let digits = self.rest().get(..2)?;
		if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
			return None
		}
		let v = u8::from_str_radix(digits, 16).ok()?;
		self.pos += 2;
		Some(v)
	}

	fn loc(&self, start: usize, end: usize) -> Loc {
		Loc {
			span: Span::new(self.base + start, self.base + end),
			line: self.number,
			column: self.text[..start].chars().count() + 1,
		}
	}

	/// Location from `start` to the current position.
	fn since(&self, start: usize) -> Loc {
		self.loc(start, self.pos)
	}

	/// Location of the next character, or the end of the line.
	fn here(&self) -> Loc {
		self.loc(self.pos, self.pos + self.peek().map_or(0, char::len_utf8))
	}

	fn syntax(&self, msg: impl Into<String>) -> Diag {
		Diag::new(self.here(), ErrorKind::Syntax(msg.into()))
	}

	fn expect(&mut self, c: char) -> Result<(), Diag> {
		if self.eat(c) {
			Ok(())
		} else {
			Err(self.syntax(format!("expected `{c}`")))
		}
	}

	fn number(&mut self) -> Result<usize, Diag> {
		let start = self.pos;
		let digits = self.take_while(|c| c.is_ascii_digit());
		digits.parse().map_err(|_| Diag::new(self.since(start), ErrorKind::Syntax("expected a length".into())))
	}
}

/// First assembly pass. Stops at the first error.
pub fn scan(catalog: &Catalog, src: &str) -> Result<Scan, Diag> {
	let mut s = Scan::default();
	let mut seen_trailer = false;
	let mut base = 0;
	for (i, raw) in src.split('\n').enumerate() {
		let text = raw.strip_suffix('\r').unwrap_or(raw);
		let mut l = Line { text, base, number: i + 1, pos: 0 };
		base += raw.len() + 1;

		l.skip_blank();
		if l.is_done() || l.peek() == Some('#') {
			continue
		}
		if seen_trailer {
			return Err(l.syntax("nothing may follow the trailer"))
		}

		while l.peek() == Some('&') {
			label_def(&mut s, &mut l)?;
			l.skip_blank();
		}
		if l.is_done() {
			continue
		}

		let start = l.pos;
		let name = l.ident();
		if name.is_empty() {
			return Err(l.syntax("expected an instruction name"))
		}
		let op = catalog.by_name(name)
			.ok_or_else(|| Diag::new(l.since(start), ErrorKind::UnknownOpcode(name.to_owned())))?;
		let head = l.since(start);
		l.expect('.')?;
		let declared = l.number()?;
		l.expect('~')?;

		let actual = if op.is_trailer() {
			seen_trailer = true;
			s.trailer = trailer(&mut l)?;
			s.trailer.len()
		} else {
			let insn_start = s.code.len();
			insn(&mut s, &mut l)?;
			s.code.len() - insn_start
		};
		if actual != declared {
			return Err(Diag::new(head, ErrorKind::LengthMismatch { declared, actual }))
		}
	}
	Ok(s)
}

fn label_def(s: &mut Scan, l: &mut Line) -> Result<(), Diag> {
	let start = l.pos;
	l.expect('&')?;
	let name = l.ident();
	if name.is_empty() {
		return Err(l.syntax("expected a label name"))
	}
	l.expect(':')?;
	let loc = l.since(start);
	let pos = s.code.len();
	let pos = u16::try_from(pos)
		.map_err(|_| Diag::new(loc, ErrorKind::LabelRange { name: name.to_owned(), pos }))?;
	if s.labels.insert(name.to_owned(), pos).is_some() {
		return Err(Diag::new(loc, ErrorKind::DuplicateLabel(name.to_owned())))
	}
	Ok(())
}

fn insn(s: &mut Scan, l: &mut Line) -> Result<(), Diag> {
	// Placeholders of this instruction, filled in order by the string literals.
	let mut slots: Vec<(Slot, Loc)> = Vec::new();
	let mut filled = 0;

	while let Some(c) = l.peek() {
		let start = l.pos;
		match c {
			' ' | '\t' | '-' | '~' => {
				l.pos += 1;
			}
			'S' => {
				l.pos += 1;
				let legacy = l.eat('-') && l.hex_byte().is_some() && l.eat('-') && l.hex_byte().is_some();
				if !legacy {
					return Err(l.syntax("expected `-hh-hh` after `S`"))
				}
				slots.push((s.code.reserve_u16(), l.since(start)));
			}
			'§' => {
				l.pos += '§'.len_utf8();
				let Some(len) = l.rest().find('§') else {
					return Err(Diag::new(l.since(start), ErrorKind::Syntax("unterminated `§` string".into())))
				};
				let text = &l.rest()[..len];
				fill(s, &slots, &mut filled, l, start, text)?;
				l.pos += len + '§'.len_utf8();
			}
			'@' => {
				l.pos += 1;
				let text = l.rest();
				fill(s, &slots, &mut filled, l, start, text)?;
				l.pos = l.text.len();
			}
			'&' => {
				l.pos += 1;
				let name = l.ident();
				if name.is_empty() {
					return Err(l.syntax("expected a label name"))
				}
				match s.labels.get(name) {
					Some(&pos) => s.code.u16(pos),
					None => {
						let slot = s.code.reserve_u16();
						s.fixups.push(Fixup { slot, label: name.to_owned(), loc: l.since(start) });
					}
				}
			}
			_ => match l.hex_byte() {
				Some(b) => s.code.u8(b),
				None => return Err(l.syntax(format!("unexpected {c:?}"))),
			},
		}
	}

	if let Some(&(_, loc)) = slots.get(filled) {
		return Err(Diag::new(loc, ErrorKind::MissingString))
	}
	Ok(())
}

/// Assigns a string literal to the next unfilled placeholder. The line must be positioned at the
/// start of `text`, just after the delimiter at `delim`.
fn fill(
	s: &mut Scan,
	slots: &[(Slot, Loc)],
	filled: &mut usize,
	l: &Line,
	delim: usize,
	text: &str,
) -> Result<(), Diag> {
	let Some(&(slot, _)) = slots.get(*filled) else {
		return Err(Diag::new(l.since(delim), ErrorKind::Syntax("string has no slot to fill".into())))
	};
	*filled += 1;
	s.strings.push(StringRecord { slot, text: text.to_owned(), loc: l.loc(l.pos, l.pos + text.len()) });
	Ok(())
}

fn trailer(l: &mut Line) -> Result<Vec<u8>, Diag> {
	let mut out = Vec::new();
	loop {
		l.take_while(|c| c == '-' || c == ' ' || c == '\t');
		if l.is_done() {
			return Ok(out)
		}
		match l.hex_byte() {
			Some(b) => out.push(b),
			None => return Err(l.syntax("expected a hex byte")),
		}
	}
}

#[test]
fn records_fixups_and_strings() {
	let src = "&a:\nint_goto.4~03-00-&b\n&b: msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00~@hi\n";
	let s = scan(&crate::catalog::PSP, src).unwrap();
	assert_eq!(s.labels["a"], 0);
	assert_eq!(s.labels["b"], 4);
	assert_eq!(s.fixups.len(), 1);
	assert_eq!(s.fixups[0].slot.pos(), 2);
	assert_eq!(s.strings.len(), 1);
	assert_eq!(s.strings[0].slot.pos(), 8);
	assert_eq!(s.strings[0].text, "hi");
	assert_eq!(&src[s.strings[0].loc.span.as_range()], "hi");
	assert_eq!(s.code.len(), 16);
	assert!(s.trailer.is_empty());
}
