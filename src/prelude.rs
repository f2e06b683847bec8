//! # rootscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the rootscope library. Import this module to get quick access to the essential
//! types for reading and writing ROOT-style binary containers.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all rootscope operations
pub use crate::Error;

/// The result type used throughout rootscope
pub use crate::Result;

// ================================================================================================
// Buffer Protocol
// ================================================================================================

/// Decode and encode cursors over serialized byte regions
pub use crate::buffer::{ReadBuffer, WriteBuffer};

/// Declared range of a reduced-precision float column
pub use crate::buffer::RangeSpec;

// ================================================================================================
// Object Model
// ================================================================================================

/// The storable object capability and the base object types
pub use crate::objects::{Named, ObjString, ObjectBits, ObjectHeader, RootObject};

/// The shared version-frame recipe used by composite codecs
pub use crate::objects::{read_framed, write_framed};

// ================================================================================================
// Registry and Containers
// ================================================================================================

/// The class factory resolving polymorphic type tags
pub use crate::registry::{Factory, ObjectCtor};

/// The associative object container
pub use crate::containers::Map;

// ================================================================================================
// Leaf Binding and Row Streaming
// ================================================================================================

/// On-disk column descriptors
pub use crate::tree::{Leaf, LeafKind, StreamerElement};

/// Typed column bindings and their destination slots
pub use crate::tree::{
    CountFn, CountResolver, LeafBinding, LeafTarget, RowBindings, SliceSlot, Slot, StringSlot,
};

// ================================================================================================
// Byte Acquisition
// ================================================================================================

/// Memory-mapped file region for file-backed hosts
pub use crate::source::MappedFile;
