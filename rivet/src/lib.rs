pub mod catalog;
pub mod text;
pub mod span;
mod writer;

pub mod disasm;
pub mod asm;

pub mod container;
pub mod scripts;
pub mod archive;

pub use catalog::{Catalog, Opcode, PSP};
pub use text::TextCodec;
pub use writer::Context;
pub use disasm::disassemble;
pub use asm::{assemble, AssembleError, Diag};
pub use scripts::Scripts;
