use bitflags::bitflags;

use crate::{objects::RootObject, ReadBuffer, Result, WriteBuffer};

bitflags! {
    /// Status bits carried by every object header.
    ///
    /// The lower 24 bits are persistent and round-trip through the buffer; the upper
    /// byte holds process-local state that legacy writers stored anyway, so the exact
    /// word is preserved rather than masked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ObjectBits: u32 {
        /// Object owner may delete the object
        const CAN_DELETE = 1 << 0;
        /// Object must be cleaned up from all referencing collections on delete
        const MUST_CLEANUP = 1 << 3;
        /// Object is referenced by a process id, adding a pid short to the header
        const IS_REFERENCED = 1 << 4;
        /// Object cannot be picked in interactive displays
        const CANNOT_PICK = 1 << 5;
        /// Object failed its own validity checks when it was constructed
        const INVALID_OBJECT = 1 << 13;
        /// Object was allocated on the heap
        const IS_ON_HEAP = 0x0100_0000;
        /// Object has not been deleted
        const NOT_DELETED = 0x0200_0000;
        /// Object constructor failed; the instance must not be used
        const ZOMBIE = 0x0400_0000;

        const _ = !0;
    }
}

/// Streamer version of the base object header.
const HEADER_VERSION: i16 = 1;

/// The universal base header every storable object starts with.
///
/// Carries a unique id and the status bit word. Unlike composite objects the header is
/// written without a byte-count frame (only its bare version tag precedes the fields),
/// which is exactly what makes the "short" variant of
/// [`crate::buffer::reader::ReadBuffer::read_version`] reachable on real streams.
///
/// When [`ObjectBits::IS_REFERENCED`] is set, a 16-bit process id follows the bit word
/// on disk; the header preserves it for round-tripping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Unique object identifier assigned by the original writer
    pub id: u32,
    /// Status bit word
    pub bits: ObjectBits,
    /// Process id, present on disk only when [`ObjectBits::IS_REFERENCED`] is set
    pub pid: u16,
}

impl ObjectHeader {
    /// Create a header with no id and the default heap bits.
    #[must_use]
    pub fn new() -> Self {
        ObjectHeader {
            id: 0,
            bits: ObjectBits::IS_ON_HEAP | ObjectBits::NOT_DELETED,
            pid: 0,
        }
    }
}

impl Default for ObjectHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl RootObject for ObjectHeader {
    fn class(&self) -> &'static str {
        "TObject"
    }

    fn rversion(&self) -> i16 {
        HEADER_VERSION
    }

    fn marshal(&self, w: &mut WriteBuffer) -> Result<u32> {
        if let Some(err) = w.err() {
            return Err(err.clone());
        }

        let beg = w.pos();
        w.write_u16(self.rversion() as u16);
        w.write_u32(self.id);
        w.write_u32(self.bits.bits());
        if self.bits.contains(ObjectBits::IS_REFERENCED) {
            w.write_u16(self.pid);
        }

        match w.err() {
            Some(err) => Err(err.clone()),
            None => Ok((w.pos() - beg) as u32),
        }
    }

    fn unmarshal(&mut self, r: &mut ReadBuffer) -> Result<()> {
        let (_vers, _, _) = r.read_version();
        self.id = r.read_u32();
        self.bits = ObjectBits::from_bits_retain(r.read_u32());
        self.pid = if self.bits.contains(ObjectBits::IS_REFERENCED) {
            r.read_u16()
        } else {
            0
        };

        match r.err() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
