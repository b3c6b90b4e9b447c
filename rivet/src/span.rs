use std::ops::Range;

/// A byte range in the source text.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Span {
	pub start: usize,
	pub end: usize,
}

impl std::fmt::Debug for Span {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}+{}", self.start, self.end-self.start)
	}
}

impl Span {
	pub fn new(start: usize, end: usize) -> Self {
		assert!(start <= end);
		Span { start, end }
	}

	pub fn as_range(self) -> Range<usize> {
		self.start..self.end
	}
}

/// A span together with its human-readable position. Both `line` and `column` are 1-based, and
/// `column` counts characters rather than bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loc {
	pub span: Span,
	pub line: usize,
	pub column: usize,
}

impl Loc {
	/// Narrows a location that starts at `text` down to its `index`th character.
	pub fn char_at(self, text: &str, index: usize) -> Loc {
		let Some((pos, ch)) = text.char_indices().nth(index) else {
			return self
		};
		let start = self.span.start + pos;
		Loc {
			span: Span::new(start, start + ch.len_utf8()),
			line: self.line,
			column: self.column + index,
		}
	}
}

impl std::fmt::Display for Loc {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.line, self.column)
	}
}

#[test]
fn char_at_counts_characters() {
	let loc = Loc { span: Span::new(10, 20), line: 3, column: 5 };
	let narrowed = loc.char_at("a§b", 2);
	assert_eq!(narrowed.span, Span::new(13, 14));
	assert_eq!(narrowed.column, 7);
	assert_eq!(loc.char_at("ab", 9), loc);
}
