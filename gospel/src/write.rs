/// An incremental writer to a `Vec<u8>`, with support for backfilling reserved slots.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Writer {
	data: Vec<u8>,
}

/// A reserved two-byte slot, to be filled with [`Writer::patch_u16`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(usize);

impl Slot {
	pub fn pos(self) -> usize {
		self.0
	}
}

impl Writer {
	pub fn new() -> Self {
		Self { data: Vec::new() }
	}

	pub fn finish(self) -> Vec<u8> {
		self.data
	}

	#[inline(always)]
	pub fn slice(&mut self, data: &[u8]) {
		self.data.extend_from_slice(data)
	}

	#[inline(always)]
	pub fn u8(&mut self, val: u8) {
		self.data.push(val)
	}

	#[inline(always)]
	pub fn u16(&mut self, val: u16) {
		self.slice(&val.to_le_bytes())
	}

	/// Writes two zero bytes to be filled in later.
	pub fn reserve_u16(&mut self) -> Slot {
		let slot = Slot(self.len());
		self.u16(0);
		slot
	}

	/// Overwrites a previously reserved slot.
	///
	/// Panics if the slot was not produced by this writer.
	pub fn patch_u16(&mut self, slot: Slot, val: u16) {
		self.data[slot.0..slot.0+2].copy_from_slice(&val.to_le_bytes());
	}

	/// Returns the number of bytes written so far, including reserved ones.
	#[must_use]
	#[inline(always)]
	pub fn len(&self) -> usize {
		self.data.len()
	}

	#[must_use]
	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[test]
fn patch_fills_reserved_slot() {
	let mut w = Writer::new();
	w.u8(0x73);
	let slot = w.reserve_u16();
	w.u16(0xBEEF);
	assert_eq!(slot.pos(), 1);
	w.patch_u16(slot, 0x1234);
	assert_eq!(w.finish(), [0x73, 0x34, 0x12, 0xEF, 0xBE]);
}
