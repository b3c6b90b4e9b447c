// Greedy longest-match compressor. It does not try to reproduce the game's own output byte for
// byte, only to produce a stream the game's decompressor accepts.

use crate::{RING_SIZE, RING_START, MAX_LEN, MIN_LEN};

// Keeps every referenced byte clear of the bytes being written by the same copy.
const MAX_DIST: usize = RING_SIZE - MAX_LEN;
const CHAIN_LIMIT: usize = 256;
const HASH_BITS: usize = 12;
const NONE: usize = usize::MAX;

pub fn compress(input: &[u8], out: &mut Vec<u8>) {
	let mut tri = Trigrams::new(input);
	let mut g = Groups::new(out);
	let mut pos = 0;
	while pos < input.len() {
		let (mut n, from) = tri.find(pos);
		if n >= MIN_LEN {
			let ring = (RING_START + from) % RING_SIZE;
			g.item(false);
			g.out.push(ring as u8);
			g.out.push((ring >> 4) as u8 & 0xF0 | (n - MIN_LEN) as u8);
		} else {
			n = 1;
			g.item(true);
			g.out.push(input[pos]);
		}
		for p in pos..pos+n {
			tri.insert(p);
		}
		pos += n;
	}
}

fn count_equal(a: &[u8], b: &[u8], limit: usize) -> usize {
	std::iter::zip(a, b)
		.take(limit)
		.take_while(|(a, b)| a == b)
		.count()
}

struct Groups<'a> {
	out: &'a mut Vec<u8>,
	flag_pos: usize,
	bit: u8,
}

impl<'a> Groups<'a> {
	fn new(out: &'a mut Vec<u8>) -> Self {
		Groups { out, flag_pos: 0, bit: 8 }
	}

	fn item(&mut self, literal: bool) {
		if self.bit == 8 {
			self.flag_pos = self.out.len();
			self.out.push(0);
			self.bit = 0;
		}
		if literal {
			self.out[self.flag_pos] |= 1 << self.bit;
		}
		self.bit += 1;
	}
}

struct Trigrams<'a> {
	input: &'a [u8],
	head: Vec<usize>,
	prev: Vec<usize>,
}

impl<'a> Trigrams<'a> {
	fn new(input: &'a [u8]) -> Self {
		Trigrams {
			input,
			head: vec![NONE; 1 << HASH_BITS],
			prev: vec![NONE; input.len()],
		}
	}

	fn hash(&self, pos: usize) -> Option<usize> {
		let t = self.input.get(pos..pos+MIN_LEN)?;
		let h = (t[0] as usize) << 8 ^ (t[1] as usize) << 4 ^ t[2] as usize;
		Some(h & ((1 << HASH_BITS) - 1))
	}

	fn insert(&mut self, pos: usize) {
		if let Some(h) = self.hash(pos) {
			self.prev[pos] = self.head[h];
			self.head[h] = pos;
		}
	}

	/// Returns the length and position of the longest match for the data at `pos`.
	fn find(&self, pos: usize) -> (usize, usize) {
		let Some(h) = self.hash(pos) else {
			return (0, 0)
		};
		let limit = MAX_LEN.min(self.input.len() - pos);
		let mut best = (0, 0);
		let mut cand = self.head[h];
		let mut steps = 0;
		while cand != NONE && pos - cand <= MAX_DIST && steps < CHAIN_LIMIT {
			let n = count_equal(&self.input[cand..], &self.input[pos..], limit);
			if n > best.0 {
				best = (n, cand);
				if n == limit {
					break
				}
			}
			cand = self.prev[cand];
			steps += 1;
		}
		best
	}
}

#[test]
fn stays_within_window() {
	let mut data = b"0123456789abcdefghij".to_vec();
	data.extend(std::iter::repeat(0x55).take(MAX_DIST));
	data.extend_from_slice(b"0123456789abcdefghij");
	let mut out = Vec::new();
	compress(&data, &mut out);
	let mut back = Vec::new();
	crate::decompress(&out, &mut back).unwrap();
	assert_eq!(back, data);
}
