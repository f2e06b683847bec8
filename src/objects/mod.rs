//! Storable object capability and the base object types of the container format.
//!
//! Every value that can live inside a serialized object graph (map entries, column
//! descriptors, user types) satisfies one capability: it can identify its own on-disk
//! class, report its streamer version, and (de)serialize itself against a buffer. That
//! capability is the [`crate::objects::RootObject`] trait; the polymorphic buffer
//! operations ([`crate::buffer::reader::ReadBuffer::read_object_any`] /
//! [`crate::buffer::writer::WriteBuffer::write_object_any`]) are written entirely against
//! it.
//!
//! # Key Components
//!
//! - [`crate::objects::RootObject`] - The storable object trait
//! - [`crate::objects::ObjectHeader`] - The universal base header (unique id + status bits)
//! - [`crate::objects::Named`] - Base header plus name/title strings
//! - [`crate::objects::ObjString`] - A plain string payload object
//! - [`crate::objects::write_framed`] / [`crate::objects::read_framed`] - The shared
//!   version-frame recipe every composite codec follows
//!
//! # The frame recipe
//!
//! Every composite "named object" on disk follows the same shape: write the version tag,
//! conditionally (by version) the base-object and name/title headers, then the payload,
//! then back-patch the byte count; the read side mirrors it and validates the frame.
//! [`crate::objects::write_framed`] and [`crate::objects::read_framed`] factor that
//! recipe so concrete codecs only supply their payload logic.

mod base;
mod named;
mod objstring;

pub use base::{ObjectBits, ObjectHeader};
pub use named::Named;
pub use objstring::ObjString;

use std::any::Any;

use crate::{ReadBuffer, Result, WriteBuffer};

/// Capability trait for every value that can be stored in a serialized object graph.
///
/// Implementations identify their on-disk class name and streamer version, and
/// (de)serialize themselves against the buffer protocol. Concrete types additionally
/// register a zero-argument constructor with [`crate::registry::Factory`] at startup so
/// that [`crate::buffer::reader::ReadBuffer::read_object_any`] can materialize them from
/// a type tag.
///
/// The `as_any` accessor supports downcasting decoded graphs back to concrete types.
pub trait RootObject: Any {
    /// On-disk class name of this type (e.g. `"TNamed"`).
    fn class(&self) -> &'static str;

    /// Streamer version written by [`RootObject::marshal`].
    fn rversion(&self) -> i16;

    /// Serialize this object into the buffer; returns the number of bytes written.
    ///
    /// # Errors
    /// Any framing or buffer error, including a previously-poisoned buffer.
    fn marshal(&self, w: &mut WriteBuffer) -> Result<u32>;

    /// Deserialize this object from the buffer, replacing the current contents.
    ///
    /// Which nested headers are present is conditioned on the decoded version number;
    /// older on-disk versions omit fields added later, and implementations must thread
    /// the decoded version through every conditional field read.
    ///
    /// # Errors
    /// Any framing, dispatch or buffer error raised while decoding.
    fn unmarshal(&mut self, r: &mut ReadBuffer) -> Result<()>;

    /// Upcast to [`Any`] for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl std::fmt::Debug for dyn RootObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootObject")
            .field("class", &self.class())
            .field("rversion", &self.rversion())
            .finish_non_exhaustive()
    }
}

/// Write one versioned block: version tag, payload, back-patched byte count.
///
/// Returns the number of payload bytes the frame declares. `class` labels frame
/// diagnostics.
///
/// # Errors
/// Propagates any error raised by the payload closure or by frame patching.
pub fn write_framed(
    w: &mut WriteBuffer,
    class: &str,
    vers: i16,
    payload: impl FnOnce(&mut WriteBuffer) -> Result<()>,
) -> Result<u32> {
    if let Some(err) = w.err() {
        return Err(err.clone());
    }
    let pos = w.write_version(vers);
    payload(w)?;
    w.set_byte_count(pos, class)
}

/// Read one versioned block: version tag, payload, byte-count validation.
///
/// The payload closure receives the decoded version so it can gate the presence of
/// nested headers and fields on it.
///
/// # Errors
/// Propagates any error raised by the payload closure, and raises
/// [`crate::Error::ByteCount`] if the frame does not match the bytes consumed.
pub fn read_framed<T>(
    r: &mut ReadBuffer,
    class: &str,
    payload: impl FnOnce(&mut ReadBuffer, i16) -> Result<T>,
) -> Result<T> {
    if let Some(err) = r.err() {
        return Err(err.clone());
    }
    let start = r.pos();
    let (vers, pos, bcnt) = r.read_version();
    let out = payload(r, vers)?;
    r.check_byte_count(pos, bcnt, start, class)?;
    Ok(out)
}
