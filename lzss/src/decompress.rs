use gospel::read::Reader;

use crate::{RING_SIZE, RING_START, MIN_LEN};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("truncated back-reference: {source}")]
	Read { #[from] source: gospel::read::Error },
}

type Result<A, E=Error> = std::result::Result<A, E>;

struct Ring {
	buf: [u8; RING_SIZE],
	pos: usize,
}

impl Ring {
	fn new() -> Self {
		Ring {
			buf: [0; RING_SIZE],
			pos: RING_START,
		}
	}

	fn push(&mut self, b: u8, out: &mut Vec<u8>) {
		out.push(b);
		self.buf[self.pos] = b;
		self.pos = (self.pos + 1) % RING_SIZE;
	}

	fn repeat(&mut self, from: usize, n: usize, out: &mut Vec<u8>) {
		for k in 0..n {
			let b = self.buf[(from + k) % RING_SIZE];
			self.push(b, out);
		}
	}
}

/// Decompresses a whole stream, appending to `out`.
///
/// A stream may end after any complete item; only a back-reference cut in half is an error.
pub fn decompress(data: &[u8], out: &mut Vec<u8>) -> Result<()> {
	let f = &mut Reader::new(data);
	let mut ring = Ring::new();
	while !f.is_empty() {
		let flags = f.u8()?;
		for bit in 0..8 {
			if f.is_empty() {
				break
			}
			if flags & (1 << bit) != 0 {
				ring.push(f.u8()?, out);
			} else {
				let lo = f.u8()? as usize;
				let hi = f.u8()? as usize;
				let from = lo | (hi & 0xF0) << 4;
				let n = (hi & 0x0F) + MIN_LEN;
				ring.repeat(from, n, out);
			}
		}
	}
	Ok(())
}

#[test]
fn cut_reference_is_an_error() {
	let mut out = Vec::new();
	assert!(matches!(decompress(&[0x00, 0xEE], &mut out), Err(Error::Read { .. })));
}
