use std::sync::Arc;

use crate::{
    objects::{read_framed, write_framed, Named, ObjectHeader, RootObject},
    ReadBuffer, Result, WriteBuffer,
};

const MAP_VERSION: i16 = 3;

/// An associative sequence of `(key, value)` object pairs.
///
/// Keys and values are polymorphic storable objects; values may be absent. The map
/// exclusively owns its table: decoding replaces the entries wholesale, it never merges
/// into an existing table.
///
/// On-disk iteration order of the pairs is not guaranteed to be stable across writers;
/// this implementation preserves insertion order, which keeps the byte-count frame
/// internally consistent.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use rootscope::containers::Map;
/// use rootscope::objects::{ObjString, RootObject};
/// use rootscope::{ReadBuffer, WriteBuffer};
///
/// let mut map = Map::new();
/// let key: Arc<dyn RootObject> = Arc::new(ObjString::new("run"));
/// let value: Arc<dyn RootObject> = Arc::new(ObjString::new("2024A"));
/// map.insert(key, Some(value));
///
/// let mut w = WriteBuffer::new();
/// map.marshal(&mut w)?;
/// let bytes = w.into_bytes()?;
///
/// let mut out = Map::new();
/// out.unmarshal(&mut ReadBuffer::new(&bytes))?;
/// assert_eq!(out.len(), 1);
/// # Ok::<(), rootscope::Error>(())
/// ```
pub struct Map {
    obj: ObjectHeader,
    named: Named,
    entries: Vec<(Arc<dyn RootObject>, Option<Arc<dyn RootObject>>)>,
}

impl Map {
    /// Create an empty map with the class default name and title.
    #[must_use]
    pub fn new() -> Self {
        Map {
            obj: ObjectHeader::new(),
            named: Named::new("TMap", "A (key,value) map"),
            entries: Vec::new(),
        }
    }

    /// Object name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.named.name
    }

    /// Object title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.named.title
    }

    /// Rename the map.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.named.name = name.into();
    }

    /// Number of `(key, value)` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a `(key, value)` pair to the table.
    pub fn insert(&mut self, key: Arc<dyn RootObject>, value: Option<Arc<dyn RootObject>>) {
        self.entries.push((key, value));
    }

    /// The underlying table.
    #[must_use]
    pub fn entries(&self) -> &[(Arc<dyn RootObject>, Option<Arc<dyn RootObject>>)] {
        &self.entries
    }

    /// Iterate over the `(key, value)` pairs in table order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = &(Arc<dyn RootObject>, Option<Arc<dyn RootObject>>)> {
        self.entries.iter()
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl RootObject for Map {
    fn class(&self) -> &'static str {
        "TMap"
    }

    fn rversion(&self) -> i16 {
        MAP_VERSION
    }

    fn marshal(&self, w: &mut WriteBuffer) -> Result<u32> {
        write_framed(w, self.class(), self.rversion(), |w| {
            self.obj.marshal(w)?;
            self.named.marshal(w)?;

            w.write_i32(self.entries.len() as i32);
            for (key, value) in &self.entries {
                w.write_object_any(Some(key))?;
                w.write_object_any(value.as_ref())?;
            }
            Ok(())
        })
    }

    /// Decode the map, replacing the current table with a freshly-allocated one.
    ///
    /// A pair whose key decodes as absent is dropped; a pair with a present key and an
    /// absent value is kept with the value absent. Legacy files rely on this exact
    /// asymmetry, so it is preserved rather than normalized.
    fn unmarshal(&mut self, r: &mut ReadBuffer) -> Result<()> {
        read_framed(r, "TMap", |r, vers| {
            if vers > 2 {
                self.obj.unmarshal(r)?;
            }
            if vers > 1 {
                self.named.unmarshal(r)?;
            }

            let count = r.read_i32();
            // capacity hint only; the count is validated pair by pair
            self.entries = Vec::with_capacity(count.max(0) as usize);
            for _ in 0..count {
                let key = r.read_object_any()?;
                let value = r.read_object_any()?;
                if let Some(key) = key {
                    self.entries.push((key, value));
                }
            }
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
