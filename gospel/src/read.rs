#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("out-of-bounds seek to {pos:#X} (size {size:#X})")]
	Seek { pos: usize, size: usize },
	#[error("out-of-bounds read of {pos:#X}+{len} (size {size:#X})")]
	Read { pos: usize, len: usize, size: usize },
	#[error("unterminated string at {pos:#X} (size {size:#X})")]
	Unterminated { pos: usize, size: usize },
}

pub type Result<T, E=Error> = std::result::Result<T, E>;

impl Error {
	pub fn pos(&self) -> usize {
		match self {
			Error::Seek { pos, .. } => *pos,
			Error::Read { pos, .. } => *pos,
			Error::Unterminated { pos, .. } => *pos,
		}
	}
}

/// An incremental reader from a byte slice.
///
/// Cloning this type is cheap, but it does not implement [`Copy`] for similar reasons as
/// [`Range`](`std::ops::Range`).
#[derive(Clone)]
pub struct Reader<'a> {
	pos: usize,
	data: &'a [u8],
}

impl<'a> std::fmt::Debug for Reader<'a> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Reader")
			.field("pos", &self.pos)
			.field("data", &format_args!("[_; {}]", self.data.len()))
			.finish()
	}
}

impl<'a> Reader<'a> {
	pub fn new(data: &'a [u8]) -> Reader<'a> {
		Self { pos: 0, data }
	}

	/// Reads a slice of data from the input. No copying is done.
	///
	/// Returns an error if there is not enough data left, in which case the read position is
	/// unchanged.
	pub fn slice(&mut self, len: usize) -> Result<&'a [u8]> {
		if len > self.remaining().len() {
			return Err(Error::Read { pos: self.pos, len, size: self.len() });
		}
		let pos = self.pos;
		self.pos += len;
		Ok(&self.data[pos..pos+len])
	}

	pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let mut x = [0; N];
		x.copy_from_slice(self.slice(N)?);
		Ok(x)
	}

	pub fn u8(&mut self) -> Result<u8> {
		Ok(u8::from_le_bytes(self.array()?))
	}

	pub fn u16(&mut self) -> Result<u16> {
		Ok(u16::from_le_bytes(self.array()?))
	}

	pub fn u32(&mut self) -> Result<u32> {
		Ok(u32::from_le_bytes(self.array()?))
	}

	/// Reads a NUL-terminated byte string, returning it without the terminator.
	///
	/// The terminator is consumed. On error the read position is unchanged.
	pub fn cstr(&mut self) -> Result<&'a [u8]> {
		let rest = self.remaining();
		let Some(len) = rest.iter().position(|&b| b == 0) else {
			return Err(Error::Unterminated { pos: self.pos, size: self.len() });
		};
		self.pos += len + 1;
		Ok(&rest[..len])
	}

	#[must_use]
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Returns the total length of the input, not the number of bytes left.
	#[must_use]
	pub fn len(&self) -> usize {
		self.data.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.remaining().is_empty()
	}

	#[must_use]
	pub fn remaining(&self) -> &'a [u8] {
		&self.data[self.pos..]
	}

	#[must_use]
	pub fn data(&self) -> &'a [u8] {
		self.data
	}

	pub fn seek(&mut self, pos: usize) -> Result<()> {
		if pos > self.len() {
			return Err(Error::Seek { pos, size: self.len() })
		}
		self.pos = pos;
		Ok(())
	}

	/// Returns a copy of the reader at the specified position.
	pub fn at(&self, pos: usize) -> Result<Self> {
		let mut a = self.clone();
		a.seek(pos)?;
		Ok(a)
	}

	/// Reads a `u16` and returns a new `Reader` at that absolute position.
	///
	/// Shorthand for `f.at(f.u16()? as usize)`.
	pub fn ptr16(&mut self) -> Result<Self> {
		let pos = self.u16()? as usize;
		self.at(pos)
	}
}

#[test]
fn reads_le() {
	let mut f = Reader::new(&[0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xFF]);
	assert_eq!(f.u16(), Ok(0x1234));
	assert_eq!(f.u32(), Ok(0x12345678));
	assert_eq!(f.u8(), Ok(0xFF));
	assert!(f.is_empty());
	assert_eq!(f.u8(), Err(Error::Read { pos: 7, len: 1, size: 7 }));
}

#[test]
fn cstr_consumes_terminator() {
	let mut f = Reader::new(b"ab\0c");
	assert_eq!(f.cstr(), Ok(&b"ab"[..]));
	assert_eq!(f.pos(), 3);
	assert_eq!(f.cstr(), Err(Error::Unterminated { pos: 3, size: 4 }));
	assert_eq!(f.pos(), 3);
}

#[test]
fn ptr16_follows_offset() {
	let data = [0x03, 0x00, 0xAA, 0xBB];
	let mut f = Reader::new(&data);
	let g = f.ptr16().unwrap();
	assert_eq!(g.pos(), 3);
	assert_eq!(g.remaining(), &[0xBB]);
	assert_eq!(Reader::new(&[9, 0]).ptr16().unwrap_err(), Error::Seek { pos: 9, size: 2 });
}
