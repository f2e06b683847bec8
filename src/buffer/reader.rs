//! Decode cursor for the versioned buffer protocol.
//!
//! This module provides the [`crate::buffer::reader::ReadBuffer`] type, a cursor-based
//! decoder over a contiguous byte region holding one serialized object graph or one data
//! row. It offers bounds-checked primitive reads, version and byte-count framing,
//! polymorphic object decoding through the class factory, and the back-reference arena
//! that resolves shared objects within a single traversal.
//!
//! # Sticky Error Policy
//!
//! The first failed operation poisons the buffer. Every later primitive read becomes a
//! no-op returning the zero value, and the stored error stays retrievable through
//! [`crate::buffer::reader::ReadBuffer::err`]. Fallible operations that return a
//! [`crate::Result`] surface (and store) the same first error. This mirrors the format's
//! original reader contract: no partial, silently-wrong reads after a fault, and no
//! per-call error plumbing at primitive granularity.
//!
//! # Usage Examples
//!
//! ```rust
//! use rootscope::ReadBuffer;
//!
//! let data = [0x00, 0x2A, 0x40, 0x49, 0x0F, 0xDB];
//! let mut r = ReadBuffer::new(&data);
//!
//! let tag = r.read_u16();
//! let pi = r.read_f32();
//! assert_eq!(tag, 42);
//! assert!(r.err().is_none());
//! assert!((pi - 3.14159274).abs() < 1e-6);
//! ```
//!
//! # Integration
//!
//! [`crate::buffer::reader::ReadBuffer::read_object_any`] resolves concrete types through
//! [`crate::registry::Factory`]; container and leaf codecs consume the cursor to
//! materialize values. Byte acquisition (file mapping, decompression, seek resolution) is
//! an external collaborator's responsibility; the buffer only ever sees resident memory.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    buffer::{
        io::{read_be_at, unpack_f16, RangeSpec, RootIO, DEFAULT_FLOAT16_BITS},
        K_BYTE_COUNT_MASK, K_CLASS_MASK, K_LARGE_STRING, K_MAP_OFFSET, K_NEW_CLASS_TAG,
    },
    objects::RootObject,
    registry,
    Error, Result,
};

/// One entry of the back-reference arena: either a class name seen earlier in this
/// buffer, or an object decoded earlier in this traversal.
enum RefEntry {
    Class(String),
    Object(Arc<dyn RootObject>),
}

/// A cursor-based decoder over one contiguous serialized byte region.
///
/// `ReadBuffer` owns the current offset, the sticky error state and the object identity
/// table used to resolve back-references. It is exclusively owned by one deserialization
/// call graph; nested object decode recurses synchronously within the same buffer.
///
/// Primitive reads return the decoded value directly and report failure through the
/// sticky error; framing and polymorphic operations return [`crate::Result`].
///
/// # Examples
///
/// ```rust
/// use rootscope::ReadBuffer;
///
/// let data = [0x00, 0x00, 0x00, 0x07];
/// let mut r = ReadBuffer::new(&data);
/// assert_eq!(r.read_i32(), 7);
/// assert_eq!(r.pos(), 4);
/// assert!(r.err().is_none());
/// ```
pub struct ReadBuffer<'a> {
    /// The serialized byte region being decoded
    data: &'a [u8],
    /// Current position within the region
    position: usize,
    /// First error encountered; poisons all subsequent operations
    err: Option<Error>,
    /// Back-reference arena, populated incrementally during this traversal only
    refs: HashMap<u32, RefEntry>,
}

impl<'a> ReadBuffer<'a> {
    /// Create a new `ReadBuffer` over a byte region.
    ///
    /// The region must hold exactly one serialized object graph or row payload; the
    /// back-reference arena never survives into another buffer.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        ReadBuffer {
            data,
            position: 0,
            err: None,
            refs: HashMap::new(),
        }
    }

    /// Returns the length of the underlying byte region.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the region is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the current position of the cursor.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the first error encountered, if any.
    ///
    /// Once set, the buffer is poisoned: every primitive read returns the zero value and
    /// this accessor keeps returning the same error.
    #[must_use]
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Move the cursor to an absolute position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the position lies beyond the region.
    pub fn set_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(self.fail(out_of_bounds_error!()));
        }
        self.position = pos;
        Ok(())
    }

    /// Advance the cursor by `n` bytes without decoding them.
    ///
    /// Used to step over padding and over blocks a caller chooses not to interpret.
    pub fn skip(&mut self, n: usize) {
        if self.err.is_some() {
            return;
        }
        if self.position + n > self.data.len() {
            self.poison(out_of_bounds_error!());
            return;
        }
        self.position += n;
    }

    /// Record the first error and return it for propagation.
    fn fail(&mut self, err: Error) -> Error {
        self.poison(err.clone());
        err
    }

    fn poison(&mut self, err: Error) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    /// Sticky primitive read: zero value once poisoned, poison on bounds failure.
    fn read_prim<T: RootIO>(&mut self) -> T {
        if self.err.is_some() {
            return T::default();
        }
        match read_be_at::<T>(self.data, &mut self.position) {
            Ok(value) => value,
            Err(err) => {
                self.poison(err);
                T::default()
            }
        }
    }

    /// Read an unsigned 8-bit integer.
    pub fn read_u8(&mut self) -> u8 {
        self.read_prim()
    }

    /// Read a signed 8-bit integer.
    pub fn read_i8(&mut self) -> i8 {
        self.read_prim()
    }

    /// Read an unsigned 16-bit integer.
    pub fn read_u16(&mut self) -> u16 {
        self.read_prim()
    }

    /// Read a signed 16-bit integer.
    pub fn read_i16(&mut self) -> i16 {
        self.read_prim()
    }

    /// Read an unsigned 32-bit integer.
    pub fn read_u32(&mut self) -> u32 {
        self.read_prim()
    }

    /// Read a signed 32-bit integer.
    pub fn read_i32(&mut self) -> i32 {
        self.read_prim()
    }

    /// Read an unsigned 64-bit integer.
    pub fn read_u64(&mut self) -> u64 {
        self.read_prim()
    }

    /// Read a signed 64-bit integer.
    pub fn read_i64(&mut self) -> i64 {
        self.read_prim()
    }

    /// Read a 32-bit float.
    pub fn read_f32(&mut self) -> f32 {
        self.read_prim()
    }

    /// Read a 64-bit float.
    pub fn read_f64(&mut self) -> f64 {
        self.read_prim()
    }

    /// Read a boolean, stored on disk as one byte.
    pub fn read_bool(&mut self) -> bool {
        self.read_u8() != 0
    }

    /// Fill `dest` with consecutively decoded values, without allocating.
    pub fn read_array<T: RootIO>(&mut self, dest: &mut [T]) {
        for slot in dest {
            *slot = self.read_prim();
        }
    }

    /// Read a reduced-precision float.
    ///
    /// With a range-compressed [`RangeSpec`] the payload is a `u32` mapped back onto the
    /// declared interval; otherwise the truncated exponent+mantissa form is decoded with
    /// the spec's mantissa width (or [`DEFAULT_FLOAT16_BITS`] when absent).
    pub fn read_f16(&mut self, rng: Option<&RangeSpec>) -> f32 {
        match rng {
            Some(spec) if spec.has_factor() => {
                let raw = self.read_u32();
                (spec.xmin + f64::from(raw) / spec.factor) as f32
            }
            _ => {
                let nbits = rng.map_or(DEFAULT_FLOAT16_BITS, |spec| spec.nbits);
                let exp = self.read_u8();
                let man = self.read_u16();
                unpack_f16(exp, man, nbits)
            }
        }
    }

    /// Read a reduced-precision double.
    ///
    /// With a range-compressed [`RangeSpec`] the payload is a `u32` mapped back onto the
    /// declared interval; otherwise the value was truncated to a plain 32-bit float.
    pub fn read_d32(&mut self, rng: Option<&RangeSpec>) -> f64 {
        match rng {
            Some(spec) if spec.has_factor() => {
                let raw = self.read_u32();
                spec.xmin + f64::from(raw) / spec.factor
            }
            _ => f64::from(self.read_f32()),
        }
    }

    /// Read a length-prefixed string.
    ///
    /// The prefix is a single byte; the sentinel value 255 announces the large encoding
    /// with a 32-bit length. The payload is raw bytes, interpreted as UTF-8 with lossy
    /// conversion, since legacy writers predate any encoding guarantee.
    pub fn read_string(&mut self) -> String {
        let mut n = usize::from(self.read_u8());
        if n == usize::from(K_LARGE_STRING) {
            n = self.read_u32() as usize;
        }
        self.read_str_bytes(n)
    }

    /// Read a NUL-terminated string, used for class name tags.
    pub fn read_cstring(&mut self) -> String {
        if self.err.is_some() {
            return String::new();
        }
        let start = self.position;
        loop {
            let byte = self.read_u8();
            if self.err.is_some() {
                return String::new();
            }
            if byte == 0 {
                break;
            }
        }
        String::from_utf8_lossy(&self.data[start..self.position - 1]).into_owned()
    }

    fn read_str_bytes(&mut self, n: usize) -> String {
        if self.err.is_some() {
            return String::new();
        }
        if self.position + n > self.data.len() {
            self.poison(out_of_bounds_error!());
            return String::new();
        }
        let raw = &self.data[self.position..self.position + n];
        self.position += n;
        String::from_utf8_lossy(raw).into_owned()
    }

    /// Read the version tag of a versioned block.
    ///
    /// Returns `(version, position, byte count)`. A first 16-bit word with the
    /// byte-count bit set is the high half of the large 32-bit frame: the low half and
    /// the real version tag follow it. Blocks written without a byte count report zero.
    ///
    /// The returned position and byte count feed
    /// [`ReadBuffer::check_byte_count`] after the payload has been decoded.
    pub fn read_version(&mut self) -> (i16, usize, u32) {
        let pos = self.position;
        let first = self.read_u16();
        if first & (K_BYTE_COUNT_MASK >> 16) as u16 != 0 {
            let low = self.read_u16();
            let bcnt = (u32::from(first) << 16 | u32::from(low)) & !K_BYTE_COUNT_MASK;
            let vers = self.read_u16() as i16;
            (vers, pos, bcnt)
        } else {
            (first as i16, pos, 0)
        }
    }

    /// Validate a versioned block's byte-count frame.
    ///
    /// `pos` is the frame position returned by [`ReadBuffer::read_version`], `start` the
    /// cursor position before it was called, and `class` the on-disk type label used for
    /// diagnostics. Blocks without a byte count (`bcnt == 0`) validate trivially.
    ///
    /// # Errors
    /// Returns [`crate::Error::ByteCount`] (and poisons the buffer) if the bytes
    /// consumed since `start` disagree with the declared count. A mismatch indicates
    /// corruption or a version-handling bug and is fatal to the current decode.
    pub fn check_byte_count(
        &mut self,
        pos: usize,
        bcnt: u32,
        start: usize,
        class: &str,
    ) -> Result<()> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if bcnt == 0 {
            return Ok(());
        }

        let want = pos + bcnt as usize + 4;
        if self.position == want {
            return Ok(());
        }

        let actual = (self.position - start) as u32;
        log::error!(
            "byte-count frame mismatch for {class}: declared {bcnt}, consumed {actual}",
        );
        Err(self.fail(Error::ByteCount {
            class: class.to_string(),
            expected: bcnt,
            actual,
        }))
    }

    /// Decode one polymorphic object, resolving its concrete type through the factory.
    ///
    /// The wire form is either the null tag (absent object, decoded as `None`), a
    /// back-reference to an object decoded earlier in this buffer, or a byte-count-framed
    /// payload introduced by a class tag, the class name itself written once and
    /// back-referenced afterwards. Decoded objects enter the arena incrementally, so a
    /// later back-reference always resolves to an object from this same traversal.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnknownClass`] if the type tag names a class with no
    /// registered constructor, [`crate::Error::ByteCount`] on a corrupt frame, or any
    /// error raised by the concrete type's own decode routine.
    pub fn read_object_any(&mut self) -> Result<Option<Arc<dyn RootObject>>> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        let beg = self.position;
        let first = self.read_u32();
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if first == 0 {
            return Ok(None);
        }

        let (bcnt, tag, tag_pos) = if first != K_NEW_CLASS_TAG && first & K_BYTE_COUNT_MASK != 0
        {
            let tag_pos = self.position;
            let tag = self.read_u32();
            (first & !K_BYTE_COUNT_MASK, tag, tag_pos)
        } else {
            (0, first, beg)
        };
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        match tag {
            K_NEW_CLASS_TAG => {
                let class = self.read_cstring();
                let Some(ctor) = registry::global().get(&class) else {
                    log::warn!("no constructor registered for on-disk class {class:?}");
                    return Err(self.fail(Error::UnknownClass(class)));
                };
                self.refs.insert(
                    tag_pos as u32 + K_MAP_OFFSET,
                    RefEntry::Class(class.clone()),
                );

                let mut obj = ctor();
                obj.unmarshal(self)?;
                let obj: Arc<dyn RootObject> = Arc::from(obj);
                self.refs
                    .insert(beg as u32 + K_MAP_OFFSET, RefEntry::Object(obj.clone()));

                self.check_byte_count(beg, bcnt, beg, &class)?;
                Ok(Some(obj))
            }
            tag if tag & K_CLASS_MASK != 0 => {
                let class_ref = tag & !K_CLASS_MASK;
                let class = match self.refs.get(&class_ref) {
                    Some(RefEntry::Class(name)) => name.clone(),
                    _ => {
                        return Err(self.fail(malformed_error!(
                            "type tag references unknown class record {class_ref}"
                        )))
                    }
                };
                let Some(ctor) = registry::global().get(&class) else {
                    return Err(self.fail(Error::UnknownClass(class)));
                };

                let mut obj = ctor();
                obj.unmarshal(self)?;
                let obj: Arc<dyn RootObject> = Arc::from(obj);
                self.refs
                    .insert(beg as u32 + K_MAP_OFFSET, RefEntry::Object(obj.clone()));

                self.check_byte_count(beg, bcnt, beg, &class)?;
                Ok(Some(obj))
            }
            tag => match self.refs.get(&tag) {
                Some(RefEntry::Object(obj)) => Ok(Some(obj.clone())),
                _ => Err(self.fail(malformed_error!(
                    "back-reference {tag} does not resolve to a decoded object"
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_big_endian() {
        let data = [
            0x01, // u8
            0xFF, // i8 = -1
            0x12, 0x34, // u16
            0x80, 0x00, // i16 = -32768
            0x00, 0x00, 0x00, 0x2A, // i32 = 42
            0x3F, 0x80, 0x00, 0x00, // f32 = 1.0
        ];
        let mut r = ReadBuffer::new(&data);
        assert_eq!(r.read_u8(), 1);
        assert_eq!(r.read_i8(), -1);
        assert_eq!(r.read_u16(), 0x1234);
        assert_eq!(r.read_i16(), i16::MIN);
        assert_eq!(r.read_i32(), 42);
        assert_eq!(r.read_f32(), 1.0);
        assert!(r.err().is_none());
        assert_eq!(r.pos(), data.len());
    }

    #[test]
    fn sticky_error_zeroes_everything_after() {
        let data = [0x00, 0x01];
        let mut r = ReadBuffer::new(&data);

        // u32 over a 2-byte region poisons the buffer
        assert_eq!(r.read_u32(), 0);
        assert!(matches!(r.err(), Some(Error::OutOfBounds)));

        // position frozen, all further reads are zero no-ops
        let pos = r.pos();
        assert_eq!(r.read_u16(), 0);
        assert_eq!(r.read_f64(), 0.0);
        assert_eq!(r.read_string(), "");
        assert_eq!(r.pos(), pos);
        assert!(matches!(r.err(), Some(Error::OutOfBounds)));
    }

    #[test]
    fn version_without_byte_count() {
        // bare u16 version tag, no frame
        let data = [0x00, 0x03];
        let mut r = ReadBuffer::new(&data);
        let (vers, pos, bcnt) = r.read_version();
        assert_eq!((vers, pos, bcnt), (3, 0, 0));
        assert!(r.check_byte_count(pos, bcnt, 0, "TTest").is_ok());
    }

    #[test]
    fn version_with_byte_count() {
        // frame: bcnt = 6 | mask, version 2, then 4 payload bytes
        let data = [0x40, 0x00, 0x00, 0x06, 0x00, 0x02, 0xAA, 0xBB, 0xCC, 0xDD];
        let mut r = ReadBuffer::new(&data);
        let start = r.pos();
        let (vers, pos, bcnt) = r.read_version();
        assert_eq!((vers, bcnt), (2, 6));

        let _ = r.read_u32();
        assert!(r.check_byte_count(pos, bcnt, start, "TTest").is_ok());
    }

    #[test]
    fn byte_count_mismatch_is_fatal() {
        let data = [0x40, 0x00, 0x00, 0x06, 0x00, 0x02, 0xAA, 0xBB, 0xCC, 0xDD];
        let mut r = ReadBuffer::new(&data);
        let start = r.pos();
        let (_, pos, bcnt) = r.read_version();

        // consume two bytes fewer than declared
        let _ = r.read_u16();
        let err = r.check_byte_count(pos, bcnt, start, "TTest").unwrap_err();
        assert!(matches!(err, Error::ByteCount { .. }));
        assert!(r.err().is_some());
    }

    #[test]
    fn strings_small_and_empty() {
        let data = [0x03, b'a', b'b', b'c', 0x00];
        let mut r = ReadBuffer::new(&data);
        assert_eq!(r.read_string(), "abc");
        assert_eq!(r.read_string(), "");
        assert!(r.err().is_none());
    }

    #[test]
    fn cstring_stops_at_nul() {
        let data = [b'T', b'M', b'a', b'p', 0x00, 0x07];
        let mut r = ReadBuffer::new(&data);
        assert_eq!(r.read_cstring(), "TMap");
        assert_eq!(r.read_u8(), 7);
    }

    #[test]
    fn null_tag_decodes_to_none() {
        let data = [0x00, 0x00, 0x00, 0x00];
        let mut r = ReadBuffer::new(&data);
        assert!(r.read_object_any().unwrap().is_none());
    }

    #[test]
    fn unknown_class_is_fatal() {
        let mut data = vec![
            0x40, 0x00, 0x00, 0x20, // framed
            0xFF, 0xFF, 0xFF, 0xFF, // new-class tag
        ];
        data.extend_from_slice(b"TDoesNotExist\0");
        let mut r = ReadBuffer::new(&data);
        let err = r.read_object_any().unwrap_err();
        match err {
            Error::UnknownClass(name) => assert_eq!(name, "TDoesNotExist"),
            other => panic!("expected UnknownClass, got {other}"),
        }
        assert!(r.err().is_some());
    }
}
