//! Versioned buffer protocol for the container codec.
//!
//! This module implements the byte-exact, big-endian buffer protocol that every object and
//! row codec in this crate is built on: primitive encode/decode, version-tag framing,
//! byte-count framing for self-describing blocks, and the object back-reference table that
//! resolves shared/aliased objects inside one serialized graph.
//!
//! # Architecture
//!
//! Reading and writing are symmetric but not unified. [`crate::buffer::reader::ReadBuffer`]
//! and [`crate::buffer::writer::WriteBuffer`] are separate cursor types, each exclusively
//! owned by the call graph performing one (de)serialization. Both carry the same sticky
//! error policy: the first failure poisons the buffer, every later operation becomes a
//! no-op returning the zero value, and the stored error is retrievable through a single
//! accessor. This avoids redundant error checks at every primitive call site while
//! guaranteeing that no partial, silently-wrong result survives a fault.
//!
//! # Key Components
//!
//! - [`crate::buffer::io`] - Bounds-checked big-endian primitive conversion
//! - [`crate::buffer::reader::ReadBuffer`] - Decode cursor with framing validation and the
//!   back-reference arena
//! - [`crate::buffer::writer::WriteBuffer`] - Encode cursor with frame reservation and
//!   back-patching
//!
//! # Framing
//!
//! Every versioned block is wrapped symmetrically:
//!
//! - [`crate::buffer::writer::WriteBuffer::write_version`] reserves the byte-count field and
//!   returns its position; [`crate::buffer::writer::WriteBuffer::set_byte_count`]
//!   back-patches it once the payload is written.
//! - [`crate::buffer::reader::ReadBuffer::read_version`] yields `(version, position,
//!   byte count)`; [`crate::buffer::reader::ReadBuffer::check_byte_count`] validates the
//!   frame against the bytes actually consumed and fails decoding on any mismatch.

pub mod io;
pub mod reader;
pub mod writer;

pub use io::{RangeSpec, RootIO, DEFAULT_FLOAT16_BITS};
pub use reader::ReadBuffer;
pub use writer::WriteBuffer;

/// Bit set in a 32-bit frame word to mark it as a byte count rather than a tag.
pub(crate) const K_BYTE_COUNT_MASK: u32 = 0x4000_0000;

/// Type tag announcing a class name seen for the first time in this buffer.
pub(crate) const K_NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;

/// Bit set in a type tag to mark it as a back-reference to an earlier class tag.
pub(crate) const K_CLASS_MASK: u32 = 0x8000_0000;

/// Displacement added to buffer positions when they are recorded as reference tags,
/// keeping real tags clear of the reserved null tag.
pub(crate) const K_MAP_OFFSET: u32 = 2;

/// Maximum value a byte-count frame can carry (30 usable bits).
pub(crate) const K_MAX_BYTE_COUNT: u32 = K_BYTE_COUNT_MASK - 1;

/// String length marker announcing the 32-bit large-string encoding.
pub(crate) const K_LARGE_STRING: u8 = 255;
