//! Typed column bindings and per-row streaming.
//!
//! A binding pairs one leaf descriptor with a caller-supplied typed destination and a
//! context able to resolve count-leaf dependencies. Bindings are created once per column
//! at dataset-open, selecting the one valid pairing out of the closed (kind x
//! destination-shape) set, and then reused across all rows, which amortizes type
//! dispatch to once instead of once-per-row.
//!
//! # Destinations
//!
//! Destinations are shared slots: the caller keeps one handle, the binding keeps the
//! other, and every [`crate::tree::binding::LeafBinding::read_row`] call refreshes the
//! slot in place. Scalar slots ([`crate::tree::binding::Slot`]) are plain cells; slice
//! slots ([`crate::tree::binding::SliceSlot`]) hold a reusable vector that starts at the
//! default capacity of 8 elements and grows only when a row demands it; fixed and
//! scalar columns never allocate per row.
//!
//! # Count leaves
//!
//! A column governed by a count leaf resolves, at bind time, a closure returning that
//! leaf's *already-decoded current value*. This implies strict intra-row ordering: all
//! count leaves of a row must be read before any column depending on them.
//! [`crate::tree::binding::RowBindings`] validates that ordering for single-buffer row
//! layouts; callers driving several buffers keep the pull model and order the calls
//! themselves.
//!
//! # Failure modes
//!
//! A destination incompatible with the column kind, an unresolvable count leaf, or a
//! missing destination field all fail at bind time with a descriptive error. A negative
//! run length fails the row read; nothing is ever silently truncated.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashSet;
use std::rc::Rc;

use crate::{
    buffer::RangeSpec,
    tree::{
        leaf::{Leaf, LeafKind},
        streamer::StreamerElement,
    },
    Error, ReadBuffer, Result,
};

/// Default initial capacity of slice destinations.
const DEFAULT_SLICE_CAP: usize = 8;

/// Closure returning a count leaf's current decoded row value.
pub type CountFn = Rc<dyn Fn() -> i64>;

/// Host-supplied context resolving count-leaf dependencies during binding.
///
/// The host (the tree/branch manager) knows which leaves exist and holds their current
/// decoded values; the codec only consumes that capability. `count_fn` returns the
/// accessor for a count leaf's current value, `count_leaf` the descriptor itself for
/// structural validation.
pub trait CountResolver {
    /// Accessor for the named count leaf's current decoded value.
    fn count_fn(&self, leaf: &str) -> Option<CountFn>;

    /// Descriptor of the named count leaf.
    fn count_leaf(&self, leaf: &str) -> Option<&Leaf>;
}

/// A shared scalar destination slot.
///
/// Cloning shares the underlying cell: the caller reads through one handle while the
/// binding writes through the other.
#[derive(Clone)]
pub struct Slot<T: Copy + Default>(Rc<Cell<T>>);

impl<T: Copy + Default> Slot<T> {
    /// Create a slot holding the zero value.
    #[must_use]
    pub fn new() -> Self {
        Slot(Rc::new(Cell::new(T::default())))
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.0.get()
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        self.0.set(value);
    }
}

impl<T: Copy + Default> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A shared growable destination for array columns.
///
/// The vector is reused across rows: reads clear and refill it, growing capacity only
/// when a row is longer than anything seen before.
#[derive(Clone)]
pub struct SliceSlot<T>(Rc<RefCell<Vec<T>>>);

impl<T> SliceSlot<T> {
    /// Create an empty slot with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        SliceSlot(Rc::new(RefCell::new(Vec::with_capacity(DEFAULT_SLICE_CAP))))
    }

    /// Borrow the current row's values.
    ///
    /// # Panics
    /// Panics if called while a row read is in progress on the same slot.
    #[must_use]
    pub fn values(&self) -> Ref<'_, Vec<T>> {
        self.0.borrow()
    }

    /// Number of values in the current row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns `true` if the current row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Copy the current row's values out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }

    fn inner_mut(&self) -> RefMut<'_, Vec<T>> {
        self.0.borrow_mut()
    }

    fn reserve(&self, n: usize) {
        let mut inner = self.0.borrow_mut();
        let len = inner.len();
        if n > len {
            inner.reserve(n - len);
        }
    }
}

impl<T> Default for SliceSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A shared destination for string columns.
#[derive(Clone, Default)]
pub struct StringSlot(Rc<RefCell<String>>);

impl StringSlot {
    /// Create a slot holding the empty string.
    #[must_use]
    pub fn new() -> Self {
        StringSlot(Rc::new(RefCell::new(String::new())))
    }

    /// Copy the current value out.
    #[must_use]
    pub fn get(&self) -> String {
        self.0.borrow().clone()
    }
}

/// The closed enumeration of destination shapes a caller can declare.
///
/// Scalar variants bind scalar columns; the plural variants bind fixed-length and
/// count-governed array columns. Integer columns accept the signed or the unsigned
/// destination of their width. Reduced-precision columns decode into `f32`/`f64`
/// destinations. `Struct` lists one destination per field of a struct-valued column.
#[derive(Clone)]
pub enum LeafTarget {
    /// Scalar boolean destination
    Bool(Slot<bool>),
    /// Boolean array destination
    Bools(SliceSlot<bool>),
    /// Scalar signed 8-bit destination
    I8(Slot<i8>),
    /// Signed 8-bit array destination
    I8s(SliceSlot<i8>),
    /// Scalar unsigned 8-bit destination
    U8(Slot<u8>),
    /// Unsigned 8-bit array destination
    U8s(SliceSlot<u8>),
    /// Scalar signed 16-bit destination
    I16(Slot<i16>),
    /// Signed 16-bit array destination
    I16s(SliceSlot<i16>),
    /// Scalar unsigned 16-bit destination
    U16(Slot<u16>),
    /// Unsigned 16-bit array destination
    U16s(SliceSlot<u16>),
    /// Scalar signed 32-bit destination
    I32(Slot<i32>),
    /// Signed 32-bit array destination
    I32s(SliceSlot<i32>),
    /// Scalar unsigned 32-bit destination
    U32(Slot<u32>),
    /// Unsigned 32-bit array destination
    U32s(SliceSlot<u32>),
    /// Scalar signed 64-bit destination
    I64(Slot<i64>),
    /// Signed 64-bit array destination
    I64s(SliceSlot<i64>),
    /// Scalar unsigned 64-bit destination
    U64(Slot<u64>),
    /// Unsigned 64-bit array destination
    U64s(SliceSlot<u64>),
    /// Scalar 32-bit float destination, also used by reduced-precision floats
    F32(Slot<f32>),
    /// 32-bit float array destination
    F32s(SliceSlot<f32>),
    /// Scalar 64-bit float destination, also used by reduced-precision doubles
    F64(Slot<f64>),
    /// 64-bit float array destination
    F64s(SliceSlot<f64>),
    /// String destination
    Str(StringSlot),
    /// One destination per field of a struct-valued column, matched by field name
    Struct(Vec<(String, LeafTarget)>),
}

impl LeafTarget {
    /// Human-readable shape description used in binding-mismatch diagnostics.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            LeafTarget::Bool(_) => "bool scalar",
            LeafTarget::Bools(_) => "bool slice",
            LeafTarget::I8(_) => "i8 scalar",
            LeafTarget::I8s(_) => "i8 slice",
            LeafTarget::U8(_) => "u8 scalar",
            LeafTarget::U8s(_) => "u8 slice",
            LeafTarget::I16(_) => "i16 scalar",
            LeafTarget::I16s(_) => "i16 slice",
            LeafTarget::U16(_) => "u16 scalar",
            LeafTarget::U16s(_) => "u16 slice",
            LeafTarget::I32(_) => "i32 scalar",
            LeafTarget::I32s(_) => "i32 slice",
            LeafTarget::U32(_) => "u32 scalar",
            LeafTarget::U32s(_) => "u32 slice",
            LeafTarget::I64(_) => "i64 scalar",
            LeafTarget::I64s(_) => "i64 slice",
            LeafTarget::U64(_) => "u64 scalar",
            LeafTarget::U64s(_) => "u64 slice",
            LeafTarget::F32(_) => "f32 scalar",
            LeafTarget::F32s(_) => "f32 slice",
            LeafTarget::F64(_) => "f64 scalar",
            LeafTarget::F64s(_) => "f64 slice",
            LeafTarget::Str(_) => "string",
            LeafTarget::Struct(_) => "struct",
        }
    }
}

/// Run-length shape of one column, resolved once at bind time.
#[derive(Clone)]
enum Shape {
    Scalar,
    Fixed(usize),
    Var(CountFn),
}

/// Destination of one primitive binding.
enum PrimDest<T: Copy + Default> {
    Scalar(Slot<T>),
    Fixed(SliceSlot<T>, usize),
    Var(SliceSlot<T>, CountFn),
}

/// One bound primitive column: destination plus the element decode routine.
struct PrimBinding<T: Copy + Default> {
    leaf: String,
    dest: PrimDest<T>,
    read_one: fn(&mut ReadBuffer, Option<&RangeSpec>) -> T,
    range: Option<RangeSpec>,
}

impl<T: Copy + Default> PrimBinding<T> {
    fn read_row(&self, r: &mut ReadBuffer) -> Result<()> {
        let range = self.range.as_ref();
        match &self.dest {
            PrimDest::Scalar(slot) => slot.set((self.read_one)(r, range)),
            PrimDest::Fixed(slot, n) => {
                let mut dest = slot.inner_mut();
                dest.clear();
                for _ in 0..*n {
                    dest.push((self.read_one)(r, range));
                }
            }
            PrimDest::Var(slot, count) => {
                let n = count();
                if n < 0 {
                    return Err(Error::MalformedCount {
                        leaf: self.leaf.clone(),
                        value: n,
                    });
                }
                let mut dest = slot.inner_mut();
                dest.clear();
                dest.reserve(n as usize);
                for _ in 0..n {
                    dest.push((self.read_one)(r, range));
                }
            }
        }
        match r.err() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// One bound string column.
struct StrBinding {
    dest: StringSlot,
}

impl StrBinding {
    fn read_row(&self, r: &mut ReadBuffer) -> Result<()> {
        *self.dest.0.borrow_mut() = r.read_string();
        match r.err() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// One bound struct-valued column: its field streamers in element order.
struct ElemBinding {
    fields: Vec<LeafBinding>,
}

impl ElemBinding {
    fn read_row(&self, r: &mut ReadBuffer) -> Result<()> {
        for field in &self.fields {
            field.read_row(r)?;
        }
        Ok(())
    }
}

/// The closed union of bound column implementations.
enum Imp {
    Bool(PrimBinding<bool>),
    I8(PrimBinding<i8>),
    U8(PrimBinding<u8>),
    I16(PrimBinding<i16>),
    U16(PrimBinding<u16>),
    I32(PrimBinding<i32>),
    U32(PrimBinding<u32>),
    I64(PrimBinding<i64>),
    U64(PrimBinding<u64>),
    F32(PrimBinding<f32>),
    F64(PrimBinding<f64>),
    Str(StrBinding),
    Elem(ElemBinding),
}

/// One column bound to a typed destination, reused across all rows.
///
/// # Examples
///
/// ```rust
/// use rootscope::tree::{CountResolver, CountFn, Leaf, LeafBinding, LeafKind, LeafTarget, Slot};
/// use rootscope::{ReadBuffer, WriteBuffer};
///
/// struct NoCounts;
/// impl CountResolver for NoCounts {
///     fn count_fn(&self, _leaf: &str) -> Option<CountFn> { None }
///     fn count_leaf(&self, _leaf: &str) -> Option<&Leaf> { None }
/// }
///
/// let mut leaf = Leaf::new(LeafKind::Int32);
/// leaf.set_name("nhits");
///
/// let nhits = Slot::<i32>::new();
/// let binding = LeafBinding::bind(&leaf, LeafTarget::I32(nhits.clone()), &NoCounts)?;
///
/// let mut w = WriteBuffer::new();
/// w.write_i32(17);
/// let bytes = w.into_bytes()?;
///
/// binding.read_row(&mut ReadBuffer::new(&bytes))?;
/// assert_eq!(nhits.get(), 17);
/// # Ok::<(), rootscope::Error>(())
/// ```
pub struct LeafBinding {
    name: String,
    offset: i32,
    deps: Vec<String>,
    imp: Imp,
}

impl std::fmt::Debug for LeafBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeafBinding")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

impl LeafBinding {
    /// Bind a leaf descriptor to a declared destination.
    ///
    /// Selects the single valid pairing out of the closed (kind x destination-shape)
    /// set. Count-leaf references are resolved against `ctx` now, never at read time.
    ///
    /// # Errors
    /// Returns [`crate::Error::BindingMismatch`] if the destination shape is
    /// incompatible with the column kind, or a malformed error if a referenced count
    /// leaf cannot be resolved.
    pub fn bind(leaf: &Leaf, target: LeafTarget, ctx: &dyn CountResolver) -> Result<Self> {
        let mut deps = Vec::new();
        let shape = resolve_shape(
            leaf.name(),
            leaf.count_name(),
            leaf.len() as usize,
            ctx,
            &mut deps,
        )?;
        let imp = dispatch(
            leaf.name(),
            leaf.kind(),
            target,
            shape,
            leaf.range_spec().copied(),
            leaf.elements(),
            ctx,
            &mut deps,
        )?;
        Ok(LeafBinding {
            name: leaf.name().to_string(),
            offset: leaf.offset(),
            deps,
            imp,
        })
    }

    /// Name of the bound column.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset of the bound column within a struct-valued row.
    #[must_use]
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Names of the count leaves this binding depends on.
    #[must_use]
    pub fn count_deps(&self) -> &[String] {
        &self.deps
    }

    /// Consume exactly one row of this column from the buffer into the destination.
    ///
    /// Fixed columns consume a constant byte span; count-governed columns first resolve
    /// the current run length through the accessor captured at bind time.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedCount`] on a negative run length and propagates
    /// any buffer error; a failed row read never leaves the destination marked valid.
    pub fn read_row(&self, r: &mut ReadBuffer) -> Result<()> {
        match &self.imp {
            Imp::Bool(b) => b.read_row(r),
            Imp::I8(b) => b.read_row(r),
            Imp::U8(b) => b.read_row(r),
            Imp::I16(b) => b.read_row(r),
            Imp::U16(b) => b.read_row(r),
            Imp::I32(b) => b.read_row(r),
            Imp::U32(b) => b.read_row(r),
            Imp::I64(b) => b.read_row(r),
            Imp::U64(b) => b.read_row(r),
            Imp::F32(b) => b.read_row(r),
            Imp::F64(b) => b.read_row(r),
            Imp::Str(b) => b.read_row(r),
            Imp::Elem(b) => b.read_row(r),
        }
    }
}

fn mismatch(leaf: &str, kind: LeafKind, target: &str) -> Error {
    Error::BindingMismatch {
        leaf: leaf.to_string(),
        kind: kind.to_string(),
        target: target.to_string(),
    }
}

/// Resolve the run-length shape of a column, validating count references at bind time.
fn resolve_shape(
    name: &str,
    count_name: Option<&str>,
    fixed_len: usize,
    ctx: &dyn CountResolver,
    deps: &mut Vec<String>,
) -> Result<Shape> {
    if let Some(count_name) = count_name {
        if let Some(count_leaf) = ctx.count_leaf(count_name) {
            if !matches!(
                count_leaf.kind(),
                LeafKind::Int8 | LeafKind::Int16 | LeafKind::Int32 | LeafKind::Int64
            ) {
                return Err(malformed_error!(
                    "leaf {name:?}: count leaf {count_name:?} has non-integer kind {}",
                    count_leaf.kind()
                ));
            }
        }
        let Some(count) = ctx.count_fn(count_name) else {
            return Err(malformed_error!(
                "leaf {name:?}: count leaf {count_name:?} is not resolvable in this context"
            ));
        };
        deps.push(count_name.to_string());
        return Ok(Shape::Var(count));
    }
    if fixed_len > 1 {
        return Ok(Shape::Fixed(fixed_len));
    }
    Ok(Shape::Scalar)
}

fn scalar_dest<T: Copy + Default>(
    leaf: &str,
    kind: LeafKind,
    shape: &Shape,
    slot: Slot<T>,
    desc: &str,
) -> Result<PrimDest<T>> {
    match shape {
        Shape::Scalar => Ok(PrimDest::Scalar(slot)),
        _ => Err(mismatch(leaf, kind, desc)),
    }
}

fn slice_dest<T: Copy + Default>(
    leaf: &str,
    kind: LeafKind,
    shape: &Shape,
    slot: SliceSlot<T>,
    desc: &str,
) -> Result<PrimDest<T>> {
    match shape {
        Shape::Fixed(n) => {
            slot.reserve(*n);
            Ok(PrimDest::Fixed(slot, *n))
        }
        Shape::Var(count) => Ok(PrimDest::Var(slot, count.clone())),
        Shape::Scalar => Err(mismatch(leaf, kind, desc)),
    }
}

/// The closed (kind x destination-shape) dispatch: exactly one pairing is valid.
#[allow(clippy::too_many_lines)]
fn dispatch(
    name: &str,
    kind: LeafKind,
    target: LeafTarget,
    shape: Shape,
    range: Option<RangeSpec>,
    elements: &[StreamerElement],
    ctx: &dyn CountResolver,
    deps: &mut Vec<String>,
) -> Result<Imp> {
    let imp = match (kind, target) {
        (LeafKind::Bool, LeafTarget::Bool(slot)) => Imp::Bool(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "bool scalar")?,
            read_one: |r, _| r.read_bool(),
            range,
        }),
        (LeafKind::Bool, LeafTarget::Bools(slot)) => Imp::Bool(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "bool slice")?,
            read_one: |r, _| r.read_bool(),
            range,
        }),

        (LeafKind::Int8, LeafTarget::I8(slot)) => Imp::I8(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "i8 scalar")?,
            read_one: |r, _| r.read_i8(),
            range,
        }),
        (LeafKind::Int8, LeafTarget::I8s(slot)) => Imp::I8(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "i8 slice")?,
            read_one: |r, _| r.read_i8(),
            range,
        }),
        (LeafKind::Int8, LeafTarget::U8(slot)) => Imp::U8(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "u8 scalar")?,
            read_one: |r, _| r.read_u8(),
            range,
        }),
        (LeafKind::Int8, LeafTarget::U8s(slot)) => Imp::U8(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "u8 slice")?,
            read_one: |r, _| r.read_u8(),
            range,
        }),

        (LeafKind::Int16, LeafTarget::I16(slot)) => Imp::I16(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "i16 scalar")?,
            read_one: |r, _| r.read_i16(),
            range,
        }),
        (LeafKind::Int16, LeafTarget::I16s(slot)) => Imp::I16(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "i16 slice")?,
            read_one: |r, _| r.read_i16(),
            range,
        }),
        (LeafKind::Int16, LeafTarget::U16(slot)) => Imp::U16(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "u16 scalar")?,
            read_one: |r, _| r.read_u16(),
            range,
        }),
        (LeafKind::Int16, LeafTarget::U16s(slot)) => Imp::U16(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "u16 slice")?,
            read_one: |r, _| r.read_u16(),
            range,
        }),

        (LeafKind::Int32, LeafTarget::I32(slot)) => Imp::I32(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "i32 scalar")?,
            read_one: |r, _| r.read_i32(),
            range,
        }),
        (LeafKind::Int32, LeafTarget::I32s(slot)) => Imp::I32(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "i32 slice")?,
            read_one: |r, _| r.read_i32(),
            range,
        }),
        (LeafKind::Int32, LeafTarget::U32(slot)) => Imp::U32(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "u32 scalar")?,
            read_one: |r, _| r.read_u32(),
            range,
        }),
        (LeafKind::Int32, LeafTarget::U32s(slot)) => Imp::U32(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "u32 slice")?,
            read_one: |r, _| r.read_u32(),
            range,
        }),

        (LeafKind::Int64, LeafTarget::I64(slot)) => Imp::I64(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "i64 scalar")?,
            read_one: |r, _| r.read_i64(),
            range,
        }),
        (LeafKind::Int64, LeafTarget::I64s(slot)) => Imp::I64(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "i64 slice")?,
            read_one: |r, _| r.read_i64(),
            range,
        }),
        (LeafKind::Int64, LeafTarget::U64(slot)) => Imp::U64(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "u64 scalar")?,
            read_one: |r, _| r.read_u64(),
            range,
        }),
        (LeafKind::Int64, LeafTarget::U64s(slot)) => Imp::U64(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "u64 slice")?,
            read_one: |r, _| r.read_u64(),
            range,
        }),

        (LeafKind::Float32, LeafTarget::F32(slot)) => Imp::F32(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "f32 scalar")?,
            read_one: |r, _| r.read_f32(),
            range,
        }),
        (LeafKind::Float32, LeafTarget::F32s(slot)) => Imp::F32(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "f32 slice")?,
            read_one: |r, _| r.read_f32(),
            range,
        }),

        (LeafKind::Float64, LeafTarget::F64(slot)) => Imp::F64(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "f64 scalar")?,
            read_one: |r, _| r.read_f64(),
            range,
        }),
        (LeafKind::Float64, LeafTarget::F64s(slot)) => Imp::F64(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "f64 slice")?,
            read_one: |r, _| r.read_f64(),
            range,
        }),

        (LeafKind::Float16, LeafTarget::F32(slot)) => Imp::F32(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "f32 scalar")?,
            read_one: |r, rng| r.read_f16(rng),
            range,
        }),
        (LeafKind::Float16, LeafTarget::F32s(slot)) => Imp::F32(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "f32 slice")?,
            read_one: |r, rng| r.read_f16(rng),
            range,
        }),

        (LeafKind::Double32, LeafTarget::F64(slot)) => Imp::F64(PrimBinding {
            leaf: name.to_string(),
            dest: scalar_dest(name, kind, &shape, slot, "f64 scalar")?,
            read_one: |r, rng| r.read_d32(rng),
            range,
        }),
        (LeafKind::Double32, LeafTarget::F64s(slot)) => Imp::F64(PrimBinding {
            leaf: name.to_string(),
            dest: slice_dest(name, kind, &shape, slot, "f64 slice")?,
            read_one: |r, rng| r.read_d32(rng),
            range,
        }),

        (LeafKind::CString, LeafTarget::Str(slot)) => match shape {
            Shape::Scalar => Imp::Str(StrBinding { dest: slot }),
            _ => return Err(mismatch(name, kind, "string")),
        },

        (LeafKind::Element, target) => {
            let leaf_count = match &shape {
                Shape::Var(count) => Some(count.clone()),
                _ => None,
            };
            Imp::Elem(bind_composite(name, elements, target, leaf_count, ctx, deps)?)
        }

        (kind, target) => return Err(mismatch(name, kind, target.describe())),
    };
    Ok(imp)
}

/// Build the field streamers of a struct-valued column.
///
/// With a struct destination, every element must find its destination field by name.
/// With a primitive destination, only elements whose name matches the trailing dotted
/// component of the leaf name are bound; array fields belonging to sibling structs
/// sharing the branch are skipped.
fn bind_composite(
    leaf_name: &str,
    elements: &[StreamerElement],
    target: LeafTarget,
    leaf_count: Option<CountFn>,
    ctx: &dyn CountResolver,
    deps: &mut Vec<String>,
) -> Result<ElemBinding> {
    let mut fields = Vec::new();
    match target {
        LeafTarget::Struct(field_targets) => {
            for elem in elements {
                let Some((_, field_target)) =
                    field_targets.iter().find(|(n, _)| n == &elem.name)
                else {
                    return Err(mismatch(
                        leaf_name,
                        LeafKind::Element,
                        &format!("struct without field {:?}", elem.name),
                    ));
                };
                fields.push(bind_element(
                    leaf_name,
                    elem,
                    field_target.clone(),
                    leaf_count.clone(),
                    ctx,
                    deps,
                )?);
            }
        }
        target => {
            let field = leaf_name.rsplit('.').next().unwrap_or(leaf_name);
            for elem in elements.iter().filter(|e| e.name == field) {
                fields.push(bind_element(
                    leaf_name,
                    elem,
                    target.clone(),
                    leaf_count.clone(),
                    ctx,
                    deps,
                )?);
            }
            if fields.is_empty() {
                return Err(mismatch(
                    leaf_name,
                    LeafKind::Element,
                    &format!("{} (no element named {field:?})", target.describe()),
                ));
            }
        }
    }
    Ok(ElemBinding { fields })
}

/// Bind one streamer element to its destination field.
fn bind_element(
    leaf_name: &str,
    elem: &StreamerElement,
    target: LeafTarget,
    leaf_count: Option<CountFn>,
    ctx: &dyn CountResolver,
    deps: &mut Vec<String>,
) -> Result<LeafBinding> {
    let name = format!("{leaf_name}.{}", elem.name);

    let shape = if let Some(count_name) = &elem.count {
        resolve_shape(&name, Some(count_name.as_str()), 1, ctx, deps)?
    } else if elem.arr_len > 0 {
        Shape::Fixed(elem.arr_len as usize)
    } else if let (Some(count), true) = (&leaf_count, target_is_slice(&target)) {
        // the enclosing leaf's count governs slice-shaped fields without their own
        Shape::Var(count.clone())
    } else {
        Shape::Scalar
    };

    let imp = dispatch(
        &name,
        elem.kind,
        target,
        shape,
        elem.range,
        &elem.children,
        ctx,
        deps,
    )?;
    Ok(LeafBinding {
        name,
        offset: 0,
        deps: Vec::new(),
        imp,
    })
}

fn target_is_slice(target: &LeafTarget) -> bool {
    matches!(
        target,
        LeafTarget::Bools(_)
            | LeafTarget::I8s(_)
            | LeafTarget::U8s(_)
            | LeafTarget::I16s(_)
            | LeafTarget::U16s(_)
            | LeafTarget::I32s(_)
            | LeafTarget::U32s(_)
            | LeafTarget::I64s(_)
            | LeafTarget::U64s(_)
            | LeafTarget::F32s(_)
            | LeafTarget::F64s(_)
    )
}

/// An ordered set of bindings reading one interleaved row layout.
///
/// For datasets whose columns share one buffer per row, the wire order is the binding
/// order. Construction validates the intra-row invariant: a count leaf bound in this
/// set must appear before every column depending on it. Dependencies resolved outside
/// the set (by the host against other buffers) are not constrained.
pub struct RowBindings {
    bindings: Vec<LeafBinding>,
}

impl RowBindings {
    /// Validate and wrap an ordered binding list.
    ///
    /// # Errors
    /// Returns a malformed error if a column depends on a count leaf bound *after* it
    /// in the list.
    pub fn new(bindings: Vec<LeafBinding>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        for binding in &bindings {
            for dep in binding.count_deps() {
                let later = bindings.iter().any(|b| b.name() == dep.as_str());
                if later && !seen.contains(dep.as_str()) {
                    return Err(malformed_error!(
                        "leaf {:?} depends on count leaf {dep:?} bound after it",
                        binding.name()
                    ));
                }
            }
            seen.insert(binding.name());
        }
        Ok(RowBindings { bindings })
    }

    /// The bindings in row order.
    #[must_use]
    pub fn bindings(&self) -> &[LeafBinding] {
        &self.bindings
    }

    /// Read one full row, column by column, in order.
    ///
    /// # Errors
    /// Propagates the first column error; the row must be considered invalid.
    pub fn read_row(&self, r: &mut ReadBuffer) -> Result<()> {
        for binding in &self.bindings {
            binding.read_row(r)?;
        }
        Ok(())
    }
}
