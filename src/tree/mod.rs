//! Columnar leaf binding and row streaming.
//!
//! Row-oriented datasets describe their columns with *leaf* descriptors: name, primitive
//! or struct kind, fixed length or a reference to a sibling *count leaf* whose decoded
//! value governs the run length of the current row. This module loads those descriptors
//! ([`crate::tree::leaf::Leaf`]), describes struct-valued columns field by field
//! ([`crate::tree::streamer::StreamerElement`]), and binds each column once to a typed
//! in-memory destination ([`crate::tree::binding::LeafBinding`]) so that bulk row
//! iteration runs without per-row dispatch or allocation.
//!
//! # Architecture
//!
//! Binding is a closed polymorphism over a fixed set of on-disk kinds crossed with a
//! fixed set of destination shapes. Callers declare their destination explicitly through
//! [`crate::tree::binding::LeafTarget`]; selection is purely structural and happens once
//! at bind time. An incompatible pairing fails fast with a descriptive error instead of
//! coercing or truncating at read time.
//!
//! # Key Components
//!
//! - [`crate::tree::leaf::Leaf`] / [`crate::tree::leaf::LeafKind`] - On-disk column
//!   descriptors, themselves decodable objects
//! - [`crate::tree::streamer::StreamerElement`] - Ordered per-field description of
//!   struct-valued columns
//! - [`crate::tree::binding::LeafBinding`] - One bound column, reused across all rows
//! - [`crate::tree::binding::CountResolver`] - Host-supplied context resolving count-leaf
//!   dependencies
//! - [`crate::tree::binding::RowBindings`] - Ordered row reader validating the
//!   counts-before-dependents invariant

pub mod binding;
pub mod leaf;
pub mod streamer;

pub use binding::{
    CountFn, CountResolver, LeafBinding, LeafTarget, RowBindings, SliceSlot, Slot, StringSlot,
};
pub use leaf::{Leaf, LeafKind};
pub use streamer::StreamerElement;
