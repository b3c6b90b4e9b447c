use crate::text::{fullwidth_quotes, TextCodec};
use super::{AssembleError, Diag, ErrorKind, Scan};

/// Second assembly pass: resolves forward label references, then appends the string table and the
/// trailer.
///
/// All undefined labels are reported together. String errors stop at the first one, since every
/// later offset depends on it.
pub fn link(scan: Scan, codec: TextCodec) -> Result<Vec<u8>, AssembleError> {
	let Scan { mut code, labels, fixups, strings, trailer } = scan;

	let mut diags = Vec::new();
	for fixup in &fixups {
		match labels.get(&fixup.label) {
			Some(&pos) => code.patch_u16(fixup.slot, pos),
			None => diags.push(Diag::new(fixup.loc, ErrorKind::UndefinedLabel(fixup.label.clone()))),
		}
	}
	if !diags.is_empty() {
		return Err(AssembleError { diags })
	}

	for s in &strings {
		let offset = code.len();
		let Ok(offset16) = u16::try_from(offset) else {
			let kind = ErrorKind::StringTableOverflow { offset, text: s.text.clone() };
			return Err(Diag::new(s.loc, kind).into())
		};
		code.patch_u16(s.slot, offset16);

		// The substitution maps single characters to single characters, so indices still
		// line up with the source.
		let text = fullwidth_quotes(&s.text);
		let bytes = codec.encode(&text)
			.map_err(|e| Diag::new(s.loc.char_at(&s.text, e.index), ErrorKind::Encoding(e)))?;
		code.slice(&bytes);
		code.u8(0);
	}

	code.slice(&trailer);
	Ok(code.finish())
}
