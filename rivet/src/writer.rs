/// Builds IR text one instruction line at a time.
#[derive(Debug, Default)]
pub struct Context {
	out: String,
	sep: bool,
}

impl Context {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn finish(self) -> String {
		self.out
	}

	/// Starts a line with `name.len~`.
	pub fn head(&mut self, name: &str, len: usize) -> &mut Self {
		write!(self, "{name}.{len}~");
		self.sep = false;
		self
	}

	fn put_sep(&mut self) {
		if self.sep {
			self.out.push('-');
		}
		self.sep = true;
	}

	pub fn byte(&mut self, b: u8) -> &mut Self {
		self.put_sep();
		write!(self, "{b:02X}");
		self
	}

	pub fn bytes(&mut self, bs: &[u8]) -> &mut Self {
		for &b in bs {
			self.byte(b);
		}
		self
	}

	/// A string slot, in the legacy form that keeps the slot's width.
	pub fn placeholder(&mut self) -> &mut Self {
		self.put_sep();
		self.out.push_str("S-00-00");
		self
	}

	pub fn string(&mut self, text: &str, last: bool) -> &mut Self {
		if last {
			write!(self, "~@{text}");
		} else {
			write!(self, "~§{text}§");
		}
		self
	}

	pub fn line(&mut self) -> &mut Self {
		self.out.push('\n');
		self
	}

	pub fn write_fmt(&mut self, args: std::fmt::Arguments<'_>) {
		std::fmt::Write::write_fmt(&mut self.out, args).unwrap();
	}
}

#[test]
fn formats_instruction_lines() {
	let mut ctx = Context::new();
	ctx.head("end", 2).bytes(&[0x01, 0x00]).line();
	ctx.head("msg_disp2", 6).bytes(&[0x73, 0xAB]).placeholder().bytes(&[0x0C, 0x0D]).string("hi", true).line();
	ctx.head("x", 1).byte(0).string("a", false).string("b", true).line();
	assert_eq!(ctx.finish(), "end.2~01-00\nmsg_disp2.6~73-AB-S-00-00-0C-0D~@hi\nx.1~00~§a§~@b\n");
}
