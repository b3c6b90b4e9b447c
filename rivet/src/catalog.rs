//! The opcode catalog of the PSP script engine.
//!
//! Only the binary layout of each instruction is known: its id, its encoded length, and where it
//! keeps pointers into the string table. Names follow the engine's own debug symbols, typos
//! included, since existing text dumps refer to them.

use std::collections::HashMap;

/// `base_len` value for instructions whose length is not known. They are decoded as exactly this
/// many bytes.
pub const VARIABLE: u8 = 0xFF;

/// Where an instruction keeps its 16-bit absolute string offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strings {
	None,
	/// Fixed positions within the instruction.
	At(&'static [usize]),
	/// One offset per record, the record count being the byte after the opcode.
	Choices { first: usize, stride: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
	pub name: &'static str,
	pub id: u8,
	/// Encoded length including the opcode byte. Zero for the trailer pseudo-opcode.
	pub base_len: u8,
	/// Number of bytes added per unit of the count byte following the opcode, or zero.
	pub per_count: usize,
	pub strings: Strings,
}

impl Opcode {
	const fn new(name: &'static str, id: u8, base_len: u8) -> Self {
		Opcode { name, id, base_len, per_count: 0, strings: Strings::None }
	}

	const fn per_count(self, per_count: usize) -> Self {
		Opcode { per_count, ..self }
	}

	const fn strings(self, strings: Strings) -> Self {
		Opcode { strings, ..self }
	}

	pub fn is_trailer(&self) -> bool {
		self.base_len == 0
	}

	pub fn is_variable(&self) -> bool {
		self.base_len == VARIABLE
	}

	/// Full length of the instruction starting at `insn[0]`.
	///
	/// The count byte is read only for opcodes that have a dynamic extension; if it is missing the
	/// base length is returned, which is always longer than the available input.
	pub fn len(&self, insn: &[u8]) -> usize {
		let count = match self.per_count {
			0 => 0,
			_ => insn.get(1).copied().unwrap_or(0) as usize,
		};
		self.base_len as usize + count * self.per_count
	}

	/// Positions of the string offsets inside a complete instruction.
	pub fn string_slots(&self, insn: &[u8]) -> Vec<usize> {
		match self.strings {
			Strings::None => Vec::new(),
			Strings::At(pos) => pos.to_vec(),
			Strings::Choices { first, stride } => {
				let count = insn.get(1).copied().unwrap_or(0) as usize;
				(0..count).map(|i| first + i * stride).collect()
			}
		}
	}
}

pub struct Catalog {
	ops: &'static [Opcode],
	by_id: [Option<&'static Opcode>; 256],
	by_name: HashMap<&'static str, &'static Opcode>,
}

impl std::fmt::Debug for Catalog {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Catalog")
			.field("ops", &format_args!("[_; {}]", self.ops.len()))
			.finish()
	}
}

impl Catalog {
	/// Builds the lookup tables.
	///
	/// Panics if an id or name occurs twice.
	pub fn new(ops: &'static [Opcode]) -> Self {
		let mut by_id = [None; 256];
		let mut by_name = HashMap::with_capacity(ops.len());
		for op in ops {
			if let Some(prev) = by_id[op.id as usize].replace(op) {
				panic!("opcode {:#04X} defined as both {} and {}", op.id, prev.name, op.name)
			}
			if by_name.insert(op.name, op).is_some() {
				panic!("opcode name {} defined twice", op.name)
			}
		}
		Catalog { ops, by_id, by_name }
	}

	pub fn by_id(&self, id: u8) -> Option<&'static Opcode> {
		self.by_id[id as usize]
	}

	pub fn by_name(&self, name: &str) -> Option<&'static Opcode> {
		self.by_name.get(name).copied()
	}

	pub fn iter(&self) -> impl Iterator<Item=&'static Opcode> {
		self.ops.iter()
	}
}

lazy_static::lazy_static! {
	pub static ref PSP: Catalog = Catalog::new(PSP_OPCODES);
}

pub const TRAILER: &str = "trailer";

#[rustfmt::skip]
static PSP_OPCODES: &[Opcode] = &[
	Opcode::new("nop",              0x00, 1),
	Opcode::new("end",              0x01, 2),
	Opcode::new("if",               0x02, 10),
	Opcode::new("int_goto",         0x03, 4),
	Opcode::new("int_call",         0x04, 4),
	Opcode::new("int_return",       0x05, VARIABLE),
	Opcode::new("ext_goto",         0x06, 2),
	Opcode::new("ext_call",         0x07, 12),
	Opcode::new("ext_return",       0x08, 2),
	Opcode::new("reg_calc",         0x09, 6),
	Opcode::new("count_clear",      0x0A, 2),
	Opcode::new("count_wait",       0x0B, 4),
	Opcode::new("time_wait",        0x0C, 4),
	Opcode::new("pad_wait",         0x0D, 4),
	Opcode::new("pad_get",          0x0E, 4),
	Opcode::new("file_read",        0x0F, 4),
	Opcode::new("file_wait",        0x10, 2),
	Opcode::new("msg_wind",         0x11, 2),
	Opcode::new("msg_view",         0x12, 2),
	Opcode::new("msg_mode",         0x13, 2),
	Opcode::new("msg_pos",          0x14, 6),
	Opcode::new("msg_size",         0x15, 6),
	Opcode::new("msg_type",         0x16, 2),
	Opcode::new("msg_coursor",      0x17, 6),
	Opcode::new("msg_set",          0x18, 4),
	Opcode::new("msg_wait",         0x19, 2),
	Opcode::new("msg_clear",        0x1A, 2),
	Opcode::new("msg_line",         0x1B, 2),
	Opcode::new("msg_speed",        0x1C, 2),
	Opcode::new("msg_color",        0x1D, 2),
	Opcode::new("msg_anim",         0x1E, 2),
	Opcode::new("msg_disp",         0x1F, 10),
	Opcode::new("sel_set",          0x20, 4),
	Opcode::new("sel_entry",        0x21, 6),
	Opcode::new("sel_view",         0x22, 2),
	Opcode::new("sel_wait",         0x23, VARIABLE),
	Opcode::new("sel_style",        0x24, 2),
	Opcode::new("sek_disp",         0x25, 4),
	Opcode::new("fade_start",       0x26, 4),
	Opcode::new("fade_wait",        0x27, 2),
	Opcode::new("graph_set",        0x28, 4),
	Opcode::new("graph_del",        0x29, 2),
	Opcode::new("graph_cpy",        0x2A, 4),
	Opcode::new("grsaph_view",      0x2B, 6),
	Opcode::new("graph_pos",        0x2C, 6),
	Opcode::new("graph_move",       0x2D, VARIABLE),
	Opcode::new("graph_prio",       0x2E, 4),
	Opcode::new("graph_anim",       0x2F, 4),
	Opcode::new("graph_pal",        0x30, 4),
	Opcode::new("graph_lay",        0x31, 4),
	Opcode::new("graph_wait",       0x32, 4),
	Opcode::new("graph_disp",       0x33, 4).per_count(16),
	Opcode::new("effect_start",     0x34, 4),
	Opcode::new("effect_end",       0x35, 2),
	Opcode::new("effect_wait",      0x36, 2),
	Opcode::new("bgm_set",          0x37, 2),
	Opcode::new("bgm_del",          0x38, 2),
	Opcode::new("bgm_req",          0x39, 2),
	Opcode::new("bgm_wait",         0x3A, 2),
	Opcode::new("bgm_speed",        0x3B, 4),
	Opcode::new("bgm_vol",          0x3C, 2),
	Opcode::new("se_set",           0x3D, 2),
	Opcode::new("se_del",           0x3E, 2),
	Opcode::new("se_req",           0x3F, 4),
	Opcode::new("se_wait",          0x40, 4),
	Opcode::new("se_speed",         0x41, 4),
	Opcode::new("se_vol",           0x42, 4),
	Opcode::new("voice_set",        0x43, 2),
	Opcode::new("voice_del",        0x44, 2),
	Opcode::new("voice_req",        0x45, 2),
	Opcode::new("voice_wait",       0x46, 2),
	Opcode::new("voice_speed",      0x47, 4),
	Opcode::new("voice_vol",        0x48, 2),
	Opcode::new("menu_lock",        0x49, 2),
	Opcode::new("save_lock",        0x4A, 2),
	Opcode::new("save_check",       0x4B, 4),
	Opcode::new("save_disp",        0x4C, 4),
	Opcode::new("disk_change",      0x4D, 4),
	Opcode::new("jamp_start",       0x4E, 4),
	Opcode::new("jamp_end",         0x4F, 2),
	Opcode::new("task_entry",       0x50, 4),
	Opcode::new("task_del",         0x51, 2),
	Opcode::new("cal_disp",         0x52, 4),
	Opcode::new("title_disp",       0x53, 2),
	Opcode::new("vib_start",        0x54, 4),
	Opcode::new("vib_end",          0x55, 2),
	Opcode::new("vib_wait",         0x56, 2),
	Opcode::new("map_view",         0x57, 4),
	Opcode::new("map_entry",        0x58, 4),
	Opcode::new("map_disp",         0x59, 4),
	Opcode::new("edit_view",        0x5A, 4),
	Opcode::new("chat_send",        0x5B, 4),
	Opcode::new("chat_msg",         0x5C, 4),
	Opcode::new("chat_entry",       0x5D, 4),
	Opcode::new("chat_exit",        0x5E, 4),
	Opcode::new("null",             0x5F, 1),
	Opcode::new("movie_play",       0x60, 4),
	Opcode::new("graph_pos_auto",   0x61, 12),
	Opcode::new("graph_pos_save",   0x62, 2),
	Opcode::new("graph_uv_auto",    0x63, 16),
	Opcode::new("graph_uv_save",    0x64, 2),
	Opcode::new("effect_ex",        0x65, 38),
	Opcode::new("fade_ex",          0x66, VARIABLE),
	Opcode::new("vib_ex",           0x67, 6),
	Opcode::new("clock_disp",       0x68, 6),
	Opcode::new("graph_disp_ex",    0x69, 24),
	Opcode::new("map_init_ex",      0x6A, 4),
	Opcode::new("map_point_ex",     0x6B, 4),
	Opcode::new("map_route_ex",     0x6C, 4),
	Opcode::new("quick_save",       0x6D, 2),
	Opcode::new("trace_pc",         0x6E, 2),
	Opcode::new("sys_msg",          0x6F, 4),
	Opcode::new("skip_lock",        0x70, 2),
	Opcode::new("key_lock",         0x71, 2),
	Opcode::new("graph_disp2",      0x72, VARIABLE),
	Opcode::new("msg_disp2",        0x73, 12).strings(Strings::At(&[4])),
	Opcode::new("sel_disp2",        0x74, 6).per_count(8).strings(Strings::Choices { first: 6, stride: 8 }),
	Opcode::new("date_disp",        0x75, 8),
	Opcode::new("vr_disp",          0x76, 4),
	Opcode::new("vr_select",        0x77, 4),
	Opcode::new("vr_reg_calc",      0x78, 4),
	Opcode::new("vr_msg_disp",      0x79, 4),
	Opcode::new("map_select",       0x7A, 4),
	Opcode::new("ecg_set",          0x7B, 4),
	Opcode::new("ev_init",          0x7C, 4),
	Opcode::new("ev_disp",          0x7D, 4),
	Opcode::new("ev_anim",          0x7E, 4),
	Opcode::new("eye_lock",         0x7F, 2),
	Opcode::new("msg_log",          0x80, 4),
	Opcode::new("graph_scale_auto", 0x81, 16),
	Opcode::new("movie_start",      0x82, 2),
	Opcode::new("move_end",         0x83, 2),
	Opcode::new("fade_ex_strt",     0x84, 6),
	Opcode::new("fade_ex_wait",     0x85, 2),
	Opcode::new("breath_lock",      0x86, 2),
	Opcode::new("g3d_disp",         0x87, 2),
	Opcode::new("staff_start",      0x88, 6),
	Opcode::new("staff_end",        0x89, 2),
	Opcode::new("staff_wait",       0x8A, 2),
	Opcode::new("scroll_lock",      0x8B, 2),
	Opcode::new(TRAILER,            0xFF, 0),
];

#[test]
fn lookups_agree() {
	for op in PSP.iter() {
		assert_eq!(PSP.by_id(op.id), Some(op));
		assert_eq!(PSP.by_name(op.name), Some(op));
	}
	assert_eq!(PSP.by_name("end").map(|a| a.id), Some(0x01));
	assert_eq!(PSP.by_id(0x8C), None);
	assert_eq!(PSP.by_id(0xFE), None);
	assert_eq!(PSP.by_name("msg_pos,"), None);
}

#[test]
fn trailer_is_terminal() {
	let op = PSP.by_id(0xFF).unwrap();
	assert_eq!(op.name, TRAILER);
	assert!(op.is_trailer());
	assert!(!PSP.iter().filter(|a| a.id != 0xFF).any(Opcode::is_trailer));
}

#[test]
fn dynamic_lengths() {
	let sel = PSP.by_name("sel_disp2").unwrap();
	assert_eq!(sel.len(&[0x74, 3]), 6 + 3 * 8);
	assert_eq!(sel.string_slots(&[0x74, 3]), [6, 14, 22]);
	assert_eq!(sel.string_slots(&[0x74, 0]), Vec::<usize>::new());

	let graph = PSP.by_name("graph_disp").unwrap();
	assert_eq!(graph.len(&[0x33, 2]), 4 + 2 * 16);
	assert!(graph.string_slots(&[0x33, 2]).is_empty());

	let msg = PSP.by_name("msg_disp2").unwrap();
	assert_eq!(msg.len(&[0x73, 9]), 12);
	assert_eq!(msg.string_slots(&[0x73]), [4]);

	assert_eq!(PSP.by_name("int_return").unwrap().len(&[0x05]), 255);
	assert!(PSP.by_name("fade_ex").unwrap().is_variable());
}
