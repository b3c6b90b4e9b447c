use std::borrow::Cow;

use encoding_rs::{Encoding, BIG5, SHIFT_JIS};

/// The narrow encoding of the script's strings.
///
/// Shift-JIS is what the game uses. Big5 is only reachable through the library, for the Chinese
/// fan translations that reuse the same engine; nothing in the default pipeline selects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextCodec {
	#[default]
	ShiftJis,
	Big5,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {codec} string {text:?}")]
pub struct DecodeError {
	pub codec: TextCodec,
	/// The text with invalid sequences replaced.
	pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{ch:?} cannot be encoded as {codec}")]
pub struct EncodeError {
	pub codec: TextCodec,
	/// Index of the offending character, counted in characters.
	pub index: usize,
	pub ch: char,
}

impl std::fmt::Display for TextCodec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			TextCodec::ShiftJis => "Shift-JIS",
			TextCodec::Big5 => "Big5",
		})
	}
}

impl TextCodec {
	fn encoding(self) -> &'static Encoding {
		match self {
			TextCodec::ShiftJis => SHIFT_JIS,
			TextCodec::Big5 => BIG5,
		}
	}

	pub fn decode(self, bytes: &[u8]) -> Result<String, DecodeError> {
		let enc = self.encoding();
		match enc.decode_without_bom_handling_and_without_replacement(bytes) {
			Some(text) => Ok(text.into_owned()),
			None => Err(DecodeError {
				codec: self,
				text: enc.decode_without_bom_handling(bytes).0.into_owned(),
			}),
		}
	}

	/// Encodes strictly: any character without a mapping is an error, never a substitution.
	pub fn encode(self, text: &str) -> Result<Vec<u8>, EncodeError> {
		let enc = self.encoding();
		let (bytes, _, had_errors) = enc.encode(text);
		if !had_errors {
			return Ok(bytes.into_owned())
		}
		let mut buf = [0; 4];
		for (index, ch) in text.chars().enumerate() {
			if enc.encode(ch.encode_utf8(&mut buf)).2 {
				return Err(EncodeError { codec: self, index, ch })
			}
		}
		// Rejected as a whole but not character by character; blame the start.
		Err(EncodeError { codec: self, index: 0, ch: text.chars().next().unwrap_or('\0') })
	}
}

/// Replaces the ASCII-typable guillemets with the full-width brackets the game's font has.
pub fn fullwidth_quotes(text: &str) -> Cow<str> {
	if text.contains(['«', '»']) {
		Cow::Owned(text.replace('«', "《").replace('»', "》"))
	} else {
		Cow::Borrowed(text)
	}
}

#[test]
fn shift_jis_roundtrip() {
	let bytes = TextCodec::ShiftJis.encode("【アリス】「こんにちは」").unwrap();
	assert_eq!(&bytes[..2], [0x81, 0x79]);
	assert_eq!(TextCodec::ShiftJis.decode(&bytes).unwrap(), "【アリス】「こんにちは」");
}

#[test]
fn encode_reports_character() {
	let err = TextCodec::ShiftJis.encode("ab€c").unwrap_err();
	assert_eq!((err.index, err.ch), (2, '€'));
	let err = TextCodec::ShiftJis.encode("«x»").unwrap_err();
	assert_eq!(err.index, 0);
	assert!(TextCodec::ShiftJis.encode(&fullwidth_quotes("«x»")).is_ok());
}

#[test]
fn encode_errors_point_into_the_text() {
	for text in ["€", "a€", "\u{FFFF}b", "😀😀", "x\u{10FFFF}"] {
		for codec in [TextCodec::ShiftJis, TextCodec::Big5] {
			let err = codec.encode(text).unwrap_err();
			assert_eq!(text.chars().nth(err.index), Some(err.ch), "{codec} {text:?}");
		}
	}
	assert_eq!(TextCodec::Big5.encode("").unwrap(), b"");
}

#[test]
fn decode_is_strict() {
	assert!(TextCodec::ShiftJis.decode(&[0x82]).is_err());
	assert_eq!(TextCodec::ShiftJis.decode(b"plain").unwrap(), "plain");
}

#[test]
fn big5_is_selectable() {
	let bytes = TextCodec::Big5.encode("你好").unwrap();
	assert_eq!(bytes, [0xA7, 0x41, 0xA6, 0x6E]);
	assert_eq!(TextCodec::Big5.decode(&bytes).unwrap(), "你好");
	assert!(TextCodec::ShiftJis.decode(&bytes).map_or(true, |s| s != "你好"));
}

#[test]
fn quotes_are_replaced() {
	assert_eq!(fullwidth_quotes("«a» b"), "《a》 b");
	assert!(matches!(fullwidth_quotes("plain"), Cow::Borrowed(_)));
}
