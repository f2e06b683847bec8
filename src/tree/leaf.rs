//! On-disk column descriptors.
//!
//! A leaf describes one column of a row-oriented dataset: its name, its primitive or
//! struct kind, a fixed element count, and, for count-governed columns, a reference to
//! the sibling count leaf. Leaves are read-only descriptors loaded once when a dataset is
//! opened; they are themselves versioned objects inside the container, so each concrete
//! kind registers with the class factory and decodes through the ordinary polymorphic
//! path.

use std::sync::Arc;

use strum::{Display, EnumIter};

use crate::{
    buffer::RangeSpec,
    objects::{read_framed, write_framed, Named, RootObject},
    tree::streamer::StreamerElement,
    ReadBuffer, Result, WriteBuffer,
};

/// Streamer version of the shared leaf base block.
const LEAF_BASE_VERSION: i16 = 2;

/// Streamer version of every concrete leaf class.
const LEAF_VERSION: i16 = 1;

/// The closed set of on-disk column kinds.
///
/// Integer kinds describe the stored width only; whether the destination interprets the
/// bytes signed or unsigned is declared at bind time (the byte representation is
/// identical). [`LeafKind::Float16`] and [`LeafKind::Double32`] are the
/// reduced-precision encodings; [`LeafKind::Element`] is a struct-valued column decoded
/// through its streamer elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum LeafKind {
    /// One-byte boolean
    Bool,
    /// 8-bit integer
    Int8,
    /// 16-bit integer
    Int16,
    /// 32-bit integer
    Int32,
    /// 64-bit integer
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Reduced-precision float stored compressed
    Float16,
    /// Reduced-precision double stored compressed
    Double32,
    /// Length-prefixed string
    CString,
    /// Struct-valued column described by streamer elements
    Element,
}

impl LeafKind {
    /// On-disk class name of the concrete leaf type for this kind.
    #[must_use]
    pub fn class(self) -> &'static str {
        match self {
            LeafKind::Bool => "TLeafO",
            LeafKind::Int8 => "TLeafB",
            LeafKind::Int16 => "TLeafS",
            LeafKind::Int32 => "TLeafI",
            LeafKind::Int64 => "TLeafL",
            LeafKind::Float32 => "TLeafF",
            LeafKind::Float64 => "TLeafD",
            LeafKind::Float16 => "TLeafF16",
            LeafKind::Double32 => "TLeafD32",
            LeafKind::CString => "TLeafC",
            LeafKind::Element => "TLeafElement",
        }
    }

    /// Nominal in-memory size of one element in bytes.
    #[must_use]
    pub fn size(self) -> u32 {
        match self {
            LeafKind::Bool | LeafKind::Int8 | LeafKind::CString => 1,
            LeafKind::Int16 => 2,
            LeafKind::Int32 | LeafKind::Float32 | LeafKind::Float16 => 4,
            LeafKind::Int64 | LeafKind::Float64 | LeafKind::Double32 => 8,
            LeafKind::Element => 0,
        }
    }

    /// Default mantissa width of the reduced-precision encodings.
    fn default_nbits(self) -> u32 {
        match self {
            LeafKind::Double32 => 32,
            _ => crate::buffer::DEFAULT_FLOAT16_BITS,
        }
    }
}

/// One on-disk column descriptor.
///
/// Loaded once at dataset-open and treated read-only afterwards. Hosts may also build
/// leaves programmatically when writing datasets; the setters cover everything the
/// decode path fills in.
///
/// # Examples
///
/// ```rust
/// use rootscope::tree::{Leaf, LeafKind};
///
/// let mut nhits = Leaf::new(LeafKind::Int32);
/// nhits.set_name("nhits");
///
/// let mut energy = Leaf::new(LeafKind::Float32);
/// energy.set_name("energy");
/// energy.set_count_name("nhits");
/// assert_eq!(energy.count_name(), Some("nhits"));
/// ```
#[derive(Clone)]
pub struct Leaf {
    named: Named,
    kind: LeafKind,
    /// Fixed element count; 1 for scalars
    len: u32,
    /// Size in bytes of one stored element
    etype: u32,
    /// Offset of this column within a struct-valued row
    offset: i32,
    /// True if the column declares a `[min,max]` range in its title
    is_range: bool,
    /// True if integer columns should default to unsigned interpretation
    is_unsigned: bool,
    /// Decoded reference to the count leaf, if any
    count: Option<Arc<dyn RootObject>>,
    /// Count leaf name set programmatically when no decoded reference exists
    count_name: Option<String>,
    /// Minimum declared by the writer
    fmin: f64,
    /// Maximum declared by the writer
    fmax: f64,
    /// Parsed range of a reduced-precision column
    range: Option<RangeSpec>,
    /// Ordered field descriptions of a struct-valued column
    elements: Vec<StreamerElement>,
}

impl Leaf {
    /// Create a descriptor of the given kind with default fields.
    #[must_use]
    pub fn new(kind: LeafKind) -> Self {
        Leaf {
            named: Named::default(),
            kind,
            len: 1,
            etype: kind.size(),
            offset: 0,
            is_range: false,
            is_unsigned: false,
            count: None,
            count_name: None,
            fmin: 0.0,
            fmax: 0.0,
            range: None,
            elements: Vec::new(),
        }
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.named.name
    }

    /// Column title, which may carry the range declaration.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.named.title
    }

    /// Column kind.
    #[must_use]
    pub fn kind(&self) -> LeafKind {
        self.kind
    }

    /// Fixed element count; 1 for scalars.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Returns `true` if the descriptor has a zero element count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of this column within a struct-valued row.
    #[must_use]
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// True if integer columns default to unsigned interpretation.
    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        self.is_unsigned
    }

    /// Name of the count leaf governing this column's run length, if any.
    #[must_use]
    pub fn count_name(&self) -> Option<&str> {
        if let Some(name) = &self.count_name {
            return Some(name);
        }
        self.count
            .as_ref()
            .and_then(|obj| obj.as_any().downcast_ref::<Leaf>())
            .map(Leaf::name)
    }

    /// Parsed range of a reduced-precision column, if one was declared.
    #[must_use]
    pub fn range_spec(&self) -> Option<&RangeSpec> {
        self.range.as_ref()
    }

    /// Ordered field descriptions of a struct-valued column.
    #[must_use]
    pub fn elements(&self) -> &[StreamerElement] {
        &self.elements
    }

    /// Set the column name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.named.name = name.into();
    }

    /// Set the column title. A `[min,max]` or `[min,max,nbits]` suffix declares the
    /// range of a reduced-precision column and is parsed eagerly.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.named.title = title.into();
        if let Some(range) = parse_range(&self.named.title, self.kind.default_nbits()) {
            self.is_range = true;
            self.fmin = range.xmin;
            self.range = Some(range);
        }
    }

    /// Set the fixed element count.
    pub fn set_len(&mut self, len: u32) {
        self.len = len;
    }

    /// Set the struct-row offset.
    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    /// Reference the governing count leaf by name.
    pub fn set_count_name(&mut self, name: impl Into<String>) {
        self.count_name = Some(name.into());
    }

    /// Reference the governing count leaf by decoded object.
    pub fn set_count(&mut self, count: Arc<dyn RootObject>) {
        self.count = Some(count);
    }

    /// Declare the field layout of a struct-valued column.
    pub fn set_elements(&mut self, elements: Vec<StreamerElement>) {
        self.elements = elements;
    }

    /// Shared base block carried by every concrete leaf class.
    fn marshal_base(&self, w: &mut WriteBuffer) -> Result<u32> {
        write_framed(w, "TLeaf", LEAF_BASE_VERSION, |w| {
            self.named.marshal(w)?;
            w.write_i32(self.len as i32);
            w.write_i32(self.etype as i32);
            w.write_i32(self.offset);
            w.write_bool(self.is_range);
            w.write_bool(self.is_unsigned);
            w.write_object_any(self.count.as_ref())?;
            Ok(())
        })
    }

    fn unmarshal_base(&mut self, r: &mut ReadBuffer) -> Result<()> {
        read_framed(r, "TLeaf", |r, _vers| {
            self.named.unmarshal(r)?;
            self.len = r.read_i32().max(0) as u32;
            self.etype = r.read_i32().max(0) as u32;
            self.offset = r.read_i32();
            self.is_range = r.read_bool();
            self.is_unsigned = r.read_bool();
            self.count = r.read_object_any()?;
            Ok(())
        })?;

        if self.is_range {
            self.range = parse_range(&self.named.title, self.kind.default_nbits());
        }
        Ok(())
    }
}

impl RootObject for Leaf {
    fn class(&self) -> &'static str {
        self.kind.class()
    }

    fn rversion(&self) -> i16 {
        LEAF_VERSION
    }

    fn marshal(&self, w: &mut WriteBuffer) -> Result<u32> {
        write_framed(w, self.class(), self.rversion(), |w| {
            self.marshal_base(w)?;
            match self.kind {
                LeafKind::Bool => {
                    w.write_bool(self.fmin != 0.0);
                    w.write_bool(self.fmax != 0.0);
                }
                LeafKind::Int8 => {
                    w.write_i8(self.fmin as i8);
                    w.write_i8(self.fmax as i8);
                }
                LeafKind::Int16 => {
                    w.write_i16(self.fmin as i16);
                    w.write_i16(self.fmax as i16);
                }
                LeafKind::Int32 | LeafKind::CString => {
                    w.write_i32(self.fmin as i32);
                    w.write_i32(self.fmax as i32);
                }
                LeafKind::Int64 => {
                    w.write_i64(self.fmin as i64);
                    w.write_i64(self.fmax as i64);
                }
                LeafKind::Float32 | LeafKind::Float16 => {
                    w.write_f32(self.fmin as f32);
                    w.write_f32(self.fmax as f32);
                }
                LeafKind::Float64 | LeafKind::Double32 => {
                    w.write_f64(self.fmin);
                    w.write_f64(self.fmax);
                }
                LeafKind::Element => {
                    // struct leaves carry no range; their payload layout lives in the
                    // streamer elements resolved by the host
                    w.write_i32(self.fmin as i32);
                    w.write_i32(self.fmax as i32);
                }
            }
            Ok(())
        })
    }

    fn unmarshal(&mut self, r: &mut ReadBuffer) -> Result<()> {
        let class = self.kind.class();
        read_framed(r, class, |r, _vers| {
            self.unmarshal_base(r)?;
            match self.kind {
                LeafKind::Bool => {
                    self.fmin = f64::from(u8::from(r.read_bool()));
                    self.fmax = f64::from(u8::from(r.read_bool()));
                }
                LeafKind::Int8 => {
                    self.fmin = f64::from(r.read_i8());
                    self.fmax = f64::from(r.read_i8());
                }
                LeafKind::Int16 => {
                    self.fmin = f64::from(r.read_i16());
                    self.fmax = f64::from(r.read_i16());
                }
                LeafKind::Int32 | LeafKind::CString | LeafKind::Element => {
                    self.fmin = f64::from(r.read_i32());
                    self.fmax = f64::from(r.read_i32());
                }
                LeafKind::Int64 => {
                    self.fmin = r.read_i64() as f64;
                    self.fmax = r.read_i64() as f64;
                }
                LeafKind::Float32 | LeafKind::Float16 => {
                    self.fmin = f64::from(r.read_f32());
                    self.fmax = f64::from(r.read_f32());
                }
                LeafKind::Float64 | LeafKind::Double32 => {
                    self.fmin = r.read_f64();
                    self.fmax = r.read_f64();
                }
            }
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Parse a `[min,max]` or `[min,max,nbits]` range declaration from a column title.
///
/// Anything before the bracket is the column name part and ignored here. Returns `None`
/// when the title carries no well-formed declaration.
fn parse_range(title: &str, default_nbits: u32) -> Option<RangeSpec> {
    let open = title.find('[')?;
    let close = title[open..].find(']')? + open;
    let body = &title[open + 1..close];

    let mut parts = body.split(',').map(str::trim);
    let xmin: f64 = parts.next()?.parse().ok()?;
    let xmax: f64 = parts.next()?.parse().ok()?;
    let nbits = match parts.next() {
        Some(raw) => raw.parse().ok()?,
        None => default_nbits,
    };
    if parts.next().is_some() || xmax < xmin {
        return None;
    }

    Some(RangeSpec::from_range(xmin, xmax, nbits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_leaf_round_trip() {
        let mut leaf = Leaf::new(LeafKind::Int32);
        leaf.set_name("nhits");
        leaf.set_len(1);

        let mut w = WriteBuffer::new();
        leaf.marshal(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();

        let mut out = Leaf::new(LeafKind::Int32);
        out.unmarshal(&mut ReadBuffer::new(&bytes)).unwrap();
        assert_eq!(out.name(), "nhits");
        assert_eq!(out.kind(), LeafKind::Int32);
        assert_eq!(out.len(), 1);
        assert!(out.count_name().is_none());
    }

    #[test]
    fn leaf_with_count_reference_round_trip() {
        let mut counter = Leaf::new(LeafKind::Int32);
        counter.set_name("nhits");
        let counter: Arc<dyn RootObject> = Arc::new(counter);

        let mut leaf = Leaf::new(LeafKind::Float32);
        leaf.set_name("energy");
        leaf.set_count(counter);

        let mut w = WriteBuffer::new();
        leaf.marshal(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();

        let mut out = Leaf::new(LeafKind::Float32);
        out.unmarshal(&mut ReadBuffer::new(&bytes)).unwrap();
        assert_eq!(out.name(), "energy");
        assert_eq!(out.count_name(), Some("nhits"));
    }

    #[test]
    fn decode_through_factory() {
        let mut leaf = Leaf::new(LeafKind::Float64);
        leaf.set_name("weight");
        let leaf: Arc<dyn RootObject> = Arc::new(leaf);

        let mut w = WriteBuffer::new();
        w.write_object_any(Some(&leaf)).unwrap();
        let bytes = w.into_bytes().unwrap();

        let mut r = ReadBuffer::new(&bytes);
        let obj = r.read_object_any().unwrap().unwrap();
        let out = obj.as_any().downcast_ref::<Leaf>().unwrap();
        assert_eq!(out.kind(), LeafKind::Float64);
        assert_eq!(out.name(), "weight");
    }

    #[test]
    fn range_title_parsing() {
        let spec = parse_range("pt[0,100,16]", 12).unwrap();
        assert_eq!(spec.xmin, 0.0);
        assert!(spec.has_factor());

        let spec = parse_range("[0.5,2.5]", 12).unwrap();
        assert_eq!(spec.nbits, 12);

        assert!(parse_range("no declaration here", 12).is_none());
        assert!(parse_range("bad[5,1]", 12).is_none());
    }

    #[test]
    fn range_declaration_via_title() {
        let mut leaf = Leaf::new(LeafKind::Float16);
        leaf.set_name("frac");
        leaf.set_title("frac[0,1,14]");
        assert!(leaf.range_spec().is_some());

        let mut w = WriteBuffer::new();
        leaf.marshal(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();

        let mut out = Leaf::new(LeafKind::Float16);
        out.unmarshal(&mut ReadBuffer::new(&bytes)).unwrap();
        let spec = out.range_spec().unwrap();
        assert_eq!(spec.nbits, 14);
        assert_eq!(spec.xmin, 0.0);
    }
}
