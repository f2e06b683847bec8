//! Per-field descriptions of struct-valued columns.
//!
//! A struct-valued leaf does not carry one primitive payload; its row bytes are the
//! concatenation of its fields, in the order the original writer declared them. Each
//! field is described by a [`StreamerElement`]: name, primitive kind (or a nested
//! composite), and either a fixed array length or a reference to the count leaf whose
//! current row value governs the field's run length. The element order reflects on-disk
//! field order; it is authoritative and must never be reordered.

use crate::{buffer::RangeSpec, tree::leaf::LeafKind};

/// Description of one field of a struct-valued column.
///
/// Elements form an ordered sequence per composite type; bindings are built against
/// this sequence at dataset-open and then reused for every row.
///
/// # Examples
///
/// ```rust
/// use rootscope::tree::{LeafKind, StreamerElement};
///
/// let fields = vec![
///     StreamerElement::scalar("charge", LeafKind::Int32),
///     StreamerElement::array("position", LeafKind::Float64, 3),
///     StreamerElement::var_array("adc", LeafKind::Int16, "nsamples"),
/// ];
/// assert_eq!(fields[1].arr_len, 3);
/// assert_eq!(fields[2].count.as_deref(), Some("nsamples"));
/// ```
#[derive(Debug, Clone)]
pub struct StreamerElement {
    /// Field name, matched against destination fields and dotted leaf names
    pub name: String,
    /// On-disk kind of the field payload
    pub kind: LeafKind,
    /// Fixed array length; 0 for scalar fields
    pub arr_len: u32,
    /// Name of the count leaf governing a variable-length field
    pub count: Option<String>,
    /// Declared range of a reduced-precision field
    pub range: Option<RangeSpec>,
    /// Field descriptions of a nested composite field
    pub children: Vec<StreamerElement>,
}

impl StreamerElement {
    /// Describe a scalar field.
    #[must_use]
    pub fn scalar(name: impl Into<String>, kind: LeafKind) -> Self {
        StreamerElement {
            name: name.into(),
            kind,
            arr_len: 0,
            count: None,
            range: None,
            children: Vec::new(),
        }
    }

    /// Describe a fixed-length array field.
    #[must_use]
    pub fn array(name: impl Into<String>, kind: LeafKind, len: u32) -> Self {
        StreamerElement {
            name: name.into(),
            kind,
            arr_len: len,
            count: None,
            range: None,
            children: Vec::new(),
        }
    }

    /// Describe a variable-length array field governed by a count leaf.
    #[must_use]
    pub fn var_array(
        name: impl Into<String>,
        kind: LeafKind,
        count: impl Into<String>,
    ) -> Self {
        StreamerElement {
            name: name.into(),
            kind,
            arr_len: 0,
            count: Some(count.into()),
            range: None,
            children: Vec::new(),
        }
    }

    /// Describe a nested composite field with its own ordered element sequence.
    #[must_use]
    pub fn composite(name: impl Into<String>, children: Vec<StreamerElement>) -> Self {
        StreamerElement {
            name: name.into(),
            kind: LeafKind::Element,
            arr_len: 0,
            count: None,
            range: None,
            children,
        }
    }

    /// Attach a reduced-precision range declaration to the field.
    #[must_use]
    pub fn with_range(mut self, range: RangeSpec) -> Self {
        self.range = Some(range);
        self
    }
}
