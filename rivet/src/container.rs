//! The compressed wrapper around each script in the archive.

use gospel::read::Reader;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Length of the header that precedes the compressed payload of a stored entry.
pub const HEADER_LEN: usize = 4;

/// A byte-oriented compressor, as used for archive entries.
pub trait Compression: Send + Sync {
	fn compress(&self, data: &[u8]) -> Vec<u8>;
	fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, BoxError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Lzss;

impl Compression for Lzss {
	fn compress(&self, data: &[u8]) -> Vec<u8> {
		lzss::compress_to_vec(data)
	}

	fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, BoxError> {
		Ok(lzss::decompress_to_vec(data)?)
	}
}

/// Returns the compressed payload of a stored entry.
pub fn strip_header(data: &[u8]) -> Result<&[u8], gospel::read::Error> {
	let mut f = Reader::new(data);
	f.slice(HEADER_LEN)?;
	Ok(f.remaining())
}

#[test]
fn strips_header() {
	assert_eq!(strip_header(&[1, 2, 3, 4, 5]), Ok(&[5u8][..]));
	assert_eq!(strip_header(&[1, 2, 3, 4]), Ok(&[][..]));
	assert!(strip_header(&[1, 2]).is_err());
}

#[test]
fn lzss_roundtrip() {
	let data = b"msg_disp2 msg_disp2 msg_disp2".repeat(10);
	let packed = Lzss.compress(&data);
	assert_eq!(Lzss.decompress(&packed).unwrap(), data);
}
