//! Small helpers for reading and writing little-endian binary data.

pub mod read;
pub mod write;
