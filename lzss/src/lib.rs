//! The LZSS variant used to pack script entries.
//!
//! This is the classic 4 KiB ring-buffer scheme: each group of eight items is preceded by a flag
//! byte read least significant bit first, where a set bit means a literal byte and a clear bit
//! means a two-byte back-reference `oooooooo OOOOllll`. The 12-bit `O:o` is an absolute position
//! in the ring buffer and `l + 3` is the copy length. The ring starts zero-filled, with the write
//! cursor at `0xFEE`.
//!
//! There is no framing: the stream simply ends when the input does.

mod decompress;
mod compress;

pub use decompress::{decompress, Error};
pub use compress::compress;

pub(crate) const RING_SIZE: usize = 0x1000;
pub(crate) const MAX_LEN: usize = 18;
pub(crate) const MIN_LEN: usize = 3;
pub(crate) const RING_START: usize = RING_SIZE - MAX_LEN;

pub fn decompress_to_vec(data: &[u8]) -> Result<Vec<u8>, Error> {
	let mut out = Vec::with_capacity(data.len() * 2);
	decompress(data, &mut out)?;
	Ok(out)
}

pub fn compress_to_vec(data: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(data.len());
	compress(data, &mut out);
	out
}

#[test]
fn literals_only() {
	let data = [0xFF, b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h', 0x01, b'i'];
	assert_eq!(decompress_to_vec(&data).unwrap(), b"abcdefghi");
}

#[test]
fn reference_into_initial_ring() {
	// A back-reference before anything is written reads the zero-filled ring.
	assert_eq!(decompress_to_vec(&[0x00, 0x00, 0x00]).unwrap(), [0u8; 3]);
}

#[test]
fn compresses_repetition() {
	assert_eq!(compress_to_vec(b"abcabcabc"), [0x07, b'a', b'b', b'c', 0xEE, 0xF3]);
}

#[test]
fn should_roundtrip() {
	let mut data = Vec::new();
	for i in 0..20000u32 {
		data.extend_from_slice(format!("line {} {}\n", i % 97, i / 13).as_bytes());
	}
	data.extend(std::iter::repeat(0).take(5000));
	data.extend((0..=255u8).cycle().take(9000));
	let packed = compress_to_vec(&data);
	assert!(packed.len() < data.len());
	assert_eq!(decompress_to_vec(&packed).unwrap(), data);
}

#[test]
fn empty_roundtrip() {
	assert!(compress_to_vec(&[]).is_empty());
	assert!(decompress_to_vec(&[]).unwrap().is_empty());
}
