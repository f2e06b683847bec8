//! Codecs for the standard container classes of the format.
//!
//! Containers are ordinary storable objects: they follow the shared frame recipe
//! (version tag, version-gated base/name headers, payload, byte-count patch) and store
//! their elements through the polymorphic object operations, so any registered class can
//! be an element. The associative [`crate::containers::Map`] demonstrates the pattern
//! every composite follows.

mod map;

pub use map::Map;
