//! Class factory: maps on-disk class names to constructors for polymorphic decode.
//!
//! When [`crate::buffer::reader::ReadBuffer::read_object_any`] meets a type tag, it must
//! allocate the correct concrete instance before delegating to that instance's own decode
//! routine. The mapping from class name to zero-argument constructor lives in a
//! [`crate::registry::Factory`].
//!
//! # Bootstrap and the single-writer invariant
//!
//! The process-wide factory returned by [`crate::registry::global`] is populated once,
//! inside its lazy initializer, with every concrete type this crate ships. Hosts register
//! their own types through [`crate::registry::Factory::add`] during startup, before any
//! decode begins; registration during active decoding is unsupported. Re-registration of
//! a name is allowed and the last writer wins, which keeps startup ordering flexible and
//! registration idempotent.
//!
//! # Usage Examples
//!
//! ```rust
//! use rootscope::registry;
//! use rootscope::objects::RootObject;
//!
//! let factory = registry::global();
//! let ctor = factory.get("TNamed").expect("builtin class");
//! let obj = ctor();
//! assert_eq!(obj.class(), "TNamed");
//! ```

use dashmap::DashMap;
use std::sync::OnceLock;

use crate::{
    containers::Map,
    objects::{Named, ObjString, ObjectHeader, RootObject},
    tree::{Leaf, LeafKind},
};

/// Zero-argument constructor producing a default instance of a concrete class.
pub type ObjectCtor = fn() -> Box<dyn RootObject>;

/// Registry of on-disk class names to constructors.
///
/// Lookups happen once per new-class tag during decode; registration happens at
/// initialization time. See the module documentation for the single-writer-at-init
/// invariant on the process-wide instance.
pub struct Factory {
    ctors: DashMap<String, ObjectCtor>,
}

impl Factory {
    /// Create an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Factory {
            ctors: DashMap::new(),
        }
    }

    /// Register a constructor under a class name.
    ///
    /// Registration is idempotent: registering the same name again replaces the previous
    /// constructor (last writer wins).
    pub fn add(&self, class: impl Into<String>, ctor: ObjectCtor) {
        self.ctors.insert(class.into(), ctor);
    }

    /// Look up the constructor registered for a class name.
    #[must_use]
    pub fn get(&self, class: &str) -> Option<ObjectCtor> {
        self.ctors.get(class).map(|entry| *entry.value())
    }

    /// Returns `true` if a constructor is registered for the class name.
    #[must_use]
    pub fn contains(&self, class: &str) -> bool {
        self.ctors.contains_key(class)
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ctors.len()
    }

    /// Returns `true` if no class is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ctors.is_empty()
    }
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide factory, populated with the builtin classes on first use.
///
/// Host types must be added before any decode begins; the registry is read-only during
/// decoding by construction.
pub fn global() -> &'static Factory {
    static FACTORY: OnceLock<Factory> = OnceLock::new();
    FACTORY.get_or_init(|| {
        let factory = Factory::new();
        register_builtins(&factory);
        factory
    })
}

/// Register every concrete class this crate ships.
fn register_builtins(factory: &Factory) {
    factory.add("TObject", || Box::new(ObjectHeader::new()));
    factory.add("TNamed", || Box::new(Named::default()));
    factory.add("TObjString", || Box::new(ObjString::default()));
    factory.add("TMap", || Box::new(Map::new()));

    factory.add("TLeafO", || Box::new(Leaf::new(LeafKind::Bool)));
    factory.add("TLeafB", || Box::new(Leaf::new(LeafKind::Int8)));
    factory.add("TLeafS", || Box::new(Leaf::new(LeafKind::Int16)));
    factory.add("TLeafI", || Box::new(Leaf::new(LeafKind::Int32)));
    factory.add("TLeafL", || Box::new(Leaf::new(LeafKind::Int64)));
    factory.add("TLeafF", || Box::new(Leaf::new(LeafKind::Float32)));
    factory.add("TLeafD", || Box::new(Leaf::new(LeafKind::Float64)));
    factory.add("TLeafF16", || Box::new(Leaf::new(LeafKind::Float16)));
    factory.add("TLeafD32", || Box::new(Leaf::new(LeafKind::Double32)));
    factory.add("TLeafC", || Box::new(Leaf::new(LeafKind::CString)));
    factory.add("TLeafElement", || Box::new(Leaf::new(LeafKind::Element)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let factory = global();
        for class in [
            "TObject",
            "TNamed",
            "TObjString",
            "TMap",
            "TLeafI",
            "TLeafF16",
            "TLeafElement",
        ] {
            assert!(factory.contains(class), "missing builtin {class}");
        }
    }

    #[test]
    fn lookup_miss_returns_none() {
        assert!(global().get("TNoSuchClass").is_none());
    }

    #[test]
    fn last_registration_wins() {
        let factory = Factory::new();
        factory.add("TThing", || Box::new(ObjString::default()));
        factory.add("TThing", || Box::new(Named::default()));

        let obj = factory.get("TThing").unwrap()();
        assert_eq!(obj.class(), "TNamed");
    }
}
