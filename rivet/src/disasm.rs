//! Bytecode to IR text.
//!
//! Scripts have no header and no end-of-code marker: instructions are followed directly by the
//! strings they reference, and then by an opaque trailer. The only way to find where code ends is
//! to watch the string offsets go by; the lowest one seen so far is the earliest place code could
//! end, and decoding stops as soon as it is reached or passed.

use gospel::read::Reader;

use crate::catalog::{Catalog, Opcode, TRAILER};
use crate::text::{DecodeError, TextCodec};
use crate::writer::Context;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("unknown opcode {id:#04X} at {pos:#X}")]
	UnknownOpcode { pos: usize, id: u8 },
	#[error("{name} at {pos:#X} is {len} bytes, but only {left} remain")]
	Truncated { pos: usize, name: &'static str, len: usize, left: usize },
	#[error("bad string referenced from {slot:#X}: {reason}")]
	MalformedString { slot: usize, #[source] reason: StringError },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StringError {
	#[error(transparent)]
	Read(#[from] gospel::read::Error),
	#[error(transparent)]
	Decode(#[from] DecodeError),
	#[error("{text:?} contains {ch:?}, which cannot be written in a text dump")]
	Unrepresentable { text: String, ch: char },
	#[error("{0:?} does not encode back to the same bytes")]
	Lossy(String),
}

/// A decoded string together with the bytes it occupies, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Str {
	pub start: usize,
	pub end: usize,
	pub text: String,
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insn<'a> {
	pub op: &'static Opcode,
	pub pos: usize,
	pub data: &'a [u8],
	/// Positions of string offsets within `data`.
	pub slots: Vec<usize>,
	pub strings: Vec<Str>,
}

pub fn disassemble(catalog: &Catalog, codec: TextCodec, data: &[u8]) -> Result<String, Error> {
	let mut ctx = Context::new();
	let f = &mut Reader::new(data);
	// Lowest string start and highest string end so far.
	let mut bounds: Option<(usize, usize)> = None;

	while !f.is_empty() {
		let pos = f.pos();
		let Some(insn) = read_insn(catalog, codec, f)? else {
			write_trailer(&mut ctx, &data[pos..]);
			break
		};

		for s in &insn.strings {
			bounds = Some(match bounds {
				None => (s.start, s.end),
				Some((start, end)) => (start.min(s.start), end.max(s.end)),
			});
		}
		write_insn(&mut ctx, &insn);

		if let Some((start, end)) = bounds {
			if f.pos() >= start {
				write_trailer(&mut ctx, &data[end..]);
				break
			}
		}
	}
	Ok(ctx.finish())
}

/// Reads the instruction at the reader's position, or `None` if it is the trailer marker.
pub fn read_insn<'a>(
	catalog: &Catalog,
	codec: TextCodec,
	f: &mut Reader<'a>,
) -> Result<Option<Insn<'a>>, Error> {
	let pos = f.pos();
	let rest = f.remaining();
	let &id = rest.first().ok_or(Error::Truncated { pos, name: TRAILER, len: 1, left: 0 })?;
	let op = catalog.by_id(id).ok_or(Error::UnknownOpcode { pos, id })?;
	if op.is_trailer() {
		return Ok(None)
	}

	let len = op.len(rest);
	let data = f.slice(len).map_err(|_| Error::Truncated { pos, name: op.name, len, left: rest.len() })?;

	let slots = op.string_slots(data);
	let strings = slots.iter().enumerate()
		.map(|(i, &slot)| {
			read_string(codec, f, pos + slot, i + 1 == slots.len())
				.map_err(|reason| Error::MalformedString { slot: pos + slot, reason })
		})
		.collect::<Result<Vec<_>, _>>()?;

	Ok(Some(Insn { op, pos, data, slots, strings }))
}

fn read_string(codec: TextCodec, f: &Reader, slot: usize, last: bool) -> Result<Str, StringError> {
	let mut g = f.at(slot)?.ptr16()?;
	let start = g.pos();
	let bytes = g.cstr()?;
	let text = codec.decode(bytes)?;

	let forbidden = |c: char| c == '\n' || c == '\r' || (!last && c == '§');
	if let Some(ch) = text.chars().find(|&c| forbidden(c)) {
		return Err(StringError::Unrepresentable { text, ch })
	}
	if codec.encode(&text).ok().as_deref() != Some(bytes) {
		return Err(StringError::Lossy(text))
	}

	Ok(Str { start, end: g.pos(), text })
}

fn write_insn(ctx: &mut Context, insn: &Insn) {
	ctx.head(insn.op.name, insn.data.len());
	let mut i = 0;
	while i < insn.data.len() {
		if insn.slots.contains(&i) {
			ctx.placeholder();
			i += 2;
		} else {
			ctx.byte(insn.data[i]);
			i += 1;
		}
	}
	for (i, s) in insn.strings.iter().enumerate() {
		ctx.string(&s.text, i + 1 == insn.strings.len());
	}
	ctx.line();
}

fn write_trailer(ctx: &mut Context, data: &[u8]) {
	if !data.is_empty() {
		ctx.head(TRAILER, data.len()).bytes(data).line();
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::catalog::PSP;

	fn dis(data: &[u8]) -> Result<String, Error> {
		disassemble(&PSP, TextCodec::ShiftJis, data)
	}

	#[test]
	fn plain_instruction() {
		assert_eq!(dis(&[0x01, 0x00]).unwrap(), "end.2~01-00\n");
	}

	#[test]
	fn message_string() {
		let mut data = vec![0x73, 0x00, 0x01, 0x02, 0x0C, 0x00, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A];
		data.extend_from_slice(b"test\0");
		assert_eq!(
			dis(&data).unwrap(),
			"msg_disp2.12~73-00-01-02-S-00-00-05-06-07-08-09-0A~@test\n",
		);
	}

	#[test]
	fn choices_and_trailer() {
		let mut data = vec![
			0x74, 0x02, 0xA0, 0xA1, 0xA2, 0xA3,
			0x18, 0x00, 1, 2, 3, 4, 5, 6,
			0x1B, 0x00, 7, 8, 9, 10, 11, 12,
			0x01, 0x00,
		];
		data.extend_from_slice(b"no\0yes\0");
		data.extend_from_slice(&[0xDE, 0xAD]);
		assert_eq!(dis(&data).unwrap(), concat!(
			"sel_disp2.22~74-02-A0-A1-A2-A3-S-00-00-01-02-03-04-05-06-S-00-00-07-08-09-0A-0B-0C~§no§~@yes\n",
			"end.2~01-00\n",
			"trailer.2~DE-AD\n",
		));
	}

	#[test]
	fn code_ends_at_first_string() {
		// Whatever follows the lowest string offset is never decoded as code, even bytes that
		// would be valid instructions.
		let mut data = vec![0x01, 0x00];
		data.extend_from_slice(&[0x73, 0, 0, 0, 0x0E, 0x00, 0, 0, 0, 0, 0, 0]);
		data.extend_from_slice(b"a\0");
		data.extend_from_slice(&[0x01, 0x00, 0x01, 0x00]);
		let ir = dis(&data).unwrap();
		assert_eq!(ir.lines().count(), 3);
		assert!(ir.ends_with("trailer.4~01-00-01-00\n"));
	}

	#[test]
	fn padding_decodes_as_nops() {
		let mut data = vec![0x73, 0, 0, 0, 0x10, 0x00, 0, 0, 0, 0, 0, 0];
		data.extend_from_slice(&[0, 0, 0, 0]);
		data.extend_from_slice(b"x\0");
		let ir = dis(&data).unwrap();
		assert_eq!(ir.lines().filter(|l| *l == "nop.1~00").count(), 4);
	}

	#[test]
	fn trailer_opcode_stops_decoding() {
		assert_eq!(dis(&[0x01, 0x00, 0xFF, 0x12]).unwrap(), "end.2~01-00\ntrailer.2~FF-12\n");
	}

	#[test]
	fn unknown_opcode() {
		assert_eq!(dis(&[0x01, 0x00, 0x8C]), Err(Error::UnknownOpcode { pos: 2, id: 0x8C }));
	}

	#[test]
	fn truncated_instruction() {
		assert_eq!(
			dis(&[0x02, 0x00, 0x00]),
			Err(Error::Truncated { pos: 0, name: "if", len: 10, left: 3 }),
		);
	}

	#[test]
	fn bad_strings() {
		let offset_past_end = [0x73, 0, 0, 0, 0x40, 0x00, 0, 0, 0, 0, 0, 0];
		assert!(matches!(
			dis(&offset_past_end),
			Err(Error::MalformedString { slot: 4, reason: StringError::Read(_) }),
		));

		let mut unterminated = offset_past_end.to_vec();
		unterminated[4] = 0x0C;
		unterminated.extend_from_slice(b"abc");
		assert!(matches!(
			dis(&unterminated),
			Err(Error::MalformedString { reason: StringError::Read(gospel::read::Error::Unterminated { .. }), .. }),
		));

		let mut newline = offset_past_end.to_vec();
		newline[4] = 0x0C;
		newline.extend_from_slice(b"a\nb\0");
		assert!(matches!(
			dis(&newline),
			Err(Error::MalformedString { reason: StringError::Unrepresentable { ch: '\n', .. }, .. }),
		));
	}

	#[test]
	fn code_running_past_strings() {
		// The `end` at 12 swallows the first byte of the string at 13; decoding still stops there.
		let mut data = vec![0x73, 0, 0, 0, 0x0D, 0x00, 0, 0, 0, 0, 0, 0];
		data.extend_from_slice(&[0x01, b'a', 0x00, 0xDE, 0xAD]);
		assert_eq!(dis(&data).unwrap(), concat!(
			"msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00~@a\n",
			"end.2~01-61\n",
			"trailer.2~DE-AD\n",
		));

		// A string inside its own instruction: the empty string at 10 ends at 11.
		let mut data = vec![0x73, 0, 0, 0, 0x0A, 0x00, 0, 0, 0, 0, 0, 0];
		data.extend_from_slice(b"z\0");
		assert_eq!(dis(&data).unwrap(), concat!(
			"msg_disp2.12~73-00-00-00-S-00-00-00-00-00-00-00-00~@\n",
			"trailer.3~00-7A-00\n",
		));
	}
}
