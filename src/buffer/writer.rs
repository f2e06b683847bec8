//! Encode cursor for the versioned buffer protocol.
//!
//! This module provides the [`crate::buffer::writer::WriteBuffer`] type, the write-side
//! counterpart of [`crate::buffer::reader::ReadBuffer`]. It grows an owned byte vector,
//! reserves byte-count frames that are back-patched once a block's payload is complete,
//! and writes polymorphic objects with class tags and back-references so that shared
//! objects are serialized exactly once.
//!
//! # Usage Examples
//!
//! ```rust
//! use rootscope::WriteBuffer;
//!
//! let mut w = WriteBuffer::new();
//! let pos = w.write_version(2);
//! w.write_i32(42);
//! w.write_string("hit");
//! let bytes_written = w.set_byte_count(pos, "TExample")?;
//! assert!(bytes_written > 0);
//!
//! let encoded = w.into_bytes()?;
//! assert_eq!(encoded.len() as u32, bytes_written + 4);
//! # Ok::<(), rootscope::Error>(())
//! ```
//!
//! The sticky error policy matches the read side: the first failure poisons the buffer,
//! later writes are no-ops and [`crate::buffer::writer::WriteBuffer::into_bytes`] refuses
//! to hand out a partially-encoded region.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    buffer::{
        io::{pack_f16, write_be_at, RangeSpec, RootIO, DEFAULT_FLOAT16_BITS},
        K_BYTE_COUNT_MASK, K_CLASS_MASK, K_LARGE_STRING, K_MAP_OFFSET, K_MAX_BYTE_COUNT,
        K_NEW_CLASS_TAG,
    },
    objects::RootObject,
    Error, Result,
};

/// A growable encode cursor producing one contiguous serialized byte region.
///
/// `WriteBuffer` owns the bytes it produces, the sticky error state, and the identity
/// table that detects objects already written into this buffer so they can be emitted as
/// back-references. It is exclusively owned by one serialization call graph.
///
/// # Examples
///
/// ```rust
/// use rootscope::WriteBuffer;
///
/// let mut w = WriteBuffer::new();
/// w.write_u16(42);
/// w.write_f64(2.5);
/// assert_eq!(w.pos(), 10);
/// ```
pub struct WriteBuffer {
    /// Encoded bytes produced so far
    buf: Vec<u8>,
    /// First error encountered; poisons all subsequent operations
    err: Option<Error>,
    /// Objects already written in this buffer: identity to reference tag
    refs: HashMap<usize, u32>,
    /// Class names already written in this buffer: name to class tag reference
    class_refs: HashMap<&'static str, u32>,
}

impl WriteBuffer {
    /// Create an empty `WriteBuffer`.
    #[must_use]
    pub fn new() -> Self {
        WriteBuffer {
            buf: Vec::new(),
            err: None,
            refs: HashMap::new(),
            class_refs: HashMap::new(),
        }
    }

    /// Create a `WriteBuffer` with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        WriteBuffer {
            buf: Vec::with_capacity(capacity),
            err: None,
            refs: HashMap::new(),
            class_refs: HashMap::new(),
        }
    }

    /// Get the current write position (the number of bytes encoded so far).
    #[must_use]
    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    /// Returns the first error encountered, if any.
    #[must_use]
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// View the bytes encoded so far.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the buffer and return the encoded region.
    ///
    /// # Errors
    /// Returns the stored first error if the buffer was poisoned; a partially-encoded
    /// region is never handed out as valid.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.buf),
        }
    }

    fn poison(&mut self, err: Error) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    /// Record the first error and return it for propagation.
    fn fail(&mut self, err: Error) -> Error {
        self.poison(err.clone());
        err
    }

    /// Sticky primitive write: no-op once poisoned.
    fn write_prim<T: RootIO>(&mut self, value: T) {
        if self.err.is_some() {
            return;
        }
        self.buf.extend_from_slice(value.to_be_bytes().as_ref());
    }

    /// Write an unsigned 8-bit integer.
    pub fn write_u8(&mut self, value: u8) {
        self.write_prim(value);
    }

    /// Write a signed 8-bit integer.
    pub fn write_i8(&mut self, value: i8) {
        self.write_prim(value);
    }

    /// Write an unsigned 16-bit integer.
    pub fn write_u16(&mut self, value: u16) {
        self.write_prim(value);
    }

    /// Write a signed 16-bit integer.
    pub fn write_i16(&mut self, value: i16) {
        self.write_prim(value);
    }

    /// Write an unsigned 32-bit integer.
    pub fn write_u32(&mut self, value: u32) {
        self.write_prim(value);
    }

    /// Write a signed 32-bit integer.
    pub fn write_i32(&mut self, value: i32) {
        self.write_prim(value);
    }

    /// Write an unsigned 64-bit integer.
    pub fn write_u64(&mut self, value: u64) {
        self.write_prim(value);
    }

    /// Write a signed 64-bit integer.
    pub fn write_i64(&mut self, value: i64) {
        self.write_prim(value);
    }

    /// Write a 32-bit float.
    pub fn write_f32(&mut self, value: f32) {
        self.write_prim(value);
    }

    /// Write a 64-bit float.
    pub fn write_f64(&mut self, value: f64) {
        self.write_prim(value);
    }

    /// Write a boolean as one byte.
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Write every value of a slice consecutively.
    pub fn write_array<T: RootIO>(&mut self, values: &[T]) {
        for &value in values {
            self.write_prim(value);
        }
    }

    /// Write a reduced-precision float.
    ///
    /// With a range-compressed [`RangeSpec`] the value is mapped onto the declared
    /// interval and stored rounded in a `u32`; otherwise the exponent is kept whole and
    /// the mantissa truncated to the spec's width (or [`DEFAULT_FLOAT16_BITS`]).
    pub fn write_f16(&mut self, value: f32, rng: Option<&RangeSpec>) {
        match rng {
            Some(spec) if spec.has_factor() => {
                let raw = (0.5 + spec.factor * (f64::from(value) - spec.xmin)) as u32;
                self.write_u32(raw);
            }
            _ => {
                let nbits = rng.map_or(DEFAULT_FLOAT16_BITS, |spec| spec.nbits);
                let (exp, man) = pack_f16(value, nbits);
                self.write_u8(exp);
                self.write_u16(man);
            }
        }
    }

    /// Write a reduced-precision double.
    ///
    /// With a range-compressed [`RangeSpec`] the value is mapped onto the declared
    /// interval and stored rounded in a `u32`; otherwise it is truncated to a plain
    /// 32-bit float.
    pub fn write_d32(&mut self, value: f64, rng: Option<&RangeSpec>) {
        match rng {
            Some(spec) if spec.has_factor() => {
                let raw = (0.5 + spec.factor * (value - spec.xmin)) as u32;
                self.write_u32(raw);
            }
            _ => self.write_f32(value as f32),
        }
    }

    /// Write a length-prefixed string.
    ///
    /// Strings shorter than 255 bytes use a one-byte length; longer ones write the
    /// sentinel byte followed by a 32-bit length.
    pub fn write_string(&mut self, value: &str) {
        let raw = value.as_bytes();
        if raw.len() < usize::from(K_LARGE_STRING) {
            self.write_u8(raw.len() as u8);
        } else {
            self.write_u8(K_LARGE_STRING);
            self.write_u32(raw.len() as u32);
        }
        if self.err.is_none() {
            self.buf.extend_from_slice(raw);
        }
    }

    /// Write a NUL-terminated string, used for class name tags.
    pub fn write_cstring(&mut self, value: &str) {
        if self.err.is_some() {
            return;
        }
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
    }

    /// Open a versioned block: write the version tag and reserve its byte-count frame.
    ///
    /// Returns the reservation position that must be handed to
    /// [`WriteBuffer::set_byte_count`] exactly once, after the block's payload has been
    /// written.
    pub fn write_version(&mut self, vers: i16) -> usize {
        let pos = self.pos();
        self.write_u32(0);
        self.write_u16(vers as u16);
        pos
    }

    /// Close a versioned block: back-patch the byte-count frame reserved at `pos`.
    ///
    /// Returns the number of payload bytes the frame now declares.
    ///
    /// # Errors
    /// Returns a malformed error if the payload exceeds the 30 usable bits of the frame,
    /// and poisons the buffer; `class` labels the diagnostic.
    pub fn set_byte_count(&mut self, pos: usize, class: &str) -> Result<u32> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if pos + 4 > self.pos() {
            return Err(self.fail(malformed_error!(
                "byte-count reservation for {class} at {pos} lies beyond the buffer"
            )));
        }

        let count = (self.pos() - pos - 4) as u64;
        if count > u64::from(K_MAX_BYTE_COUNT) {
            return Err(self.fail(malformed_error!(
                "byte count {count} for {class} exceeds the frame limit"
            )));
        }

        let mut offset = pos;
        let frame = count as u32 | K_BYTE_COUNT_MASK;
        if let Err(err) = write_be_at(&mut self.buf, &mut offset, frame) {
            return Err(self.fail(err));
        }
        Ok(count as u32)
    }

    /// Encode one polymorphic object, or the null tag for `None`.
    ///
    /// An object already written into this buffer is emitted as a back-reference to its
    /// first occurrence, so shared objects serialize exactly once. A new object opens a
    /// byte-count frame, writes its class tag (the class name itself on first use, a
    /// class back-reference afterwards), delegates to the object's own encode routine
    /// and patches the frame.
    ///
    /// # Errors
    /// Returns any error raised by the object's encode routine or by frame patching.
    pub fn write_object_any(&mut self, obj: Option<&Arc<dyn RootObject>>) -> Result<()> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        let Some(obj) = obj else {
            self.write_u32(0);
            return Ok(());
        };

        let key = Arc::as_ptr(obj) as *const () as usize;
        if let Some(&tag) = self.refs.get(&key) {
            self.write_u32(tag);
            return Ok(());
        }

        let beg = self.pos();
        self.write_u32(0);

        let class = obj.class();
        match self.class_refs.get(class) {
            Some(&class_ref) => self.write_u32(class_ref | K_CLASS_MASK),
            None => {
                let tag_pos = self.pos() as u32;
                self.write_u32(K_NEW_CLASS_TAG);
                self.write_cstring(class);
                self.class_refs.insert(class, tag_pos + K_MAP_OFFSET);
            }
        }

        self.refs.insert(key, beg as u32 + K_MAP_OFFSET);
        obj.marshal(self)?;
        self.set_byte_count(beg, class)?;
        Ok(())
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
