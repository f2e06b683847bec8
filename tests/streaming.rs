//! Integration tests for leaf binding and row streaming: count-governed columns,
//! struct-valued columns, reduced-precision columns and bind-time rejection.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use rootscope::prelude::*;
use strum::IntoEnumIterator;

/// Minimal host context: a set of leaves with their current-value accessors.
struct Branch {
    leaves: HashMap<String, (Leaf, CountFn)>,
}

impl Branch {
    fn new() -> Self {
        Branch {
            leaves: HashMap::new(),
        }
    }

    fn add_count(&mut self, leaf: Leaf, count: CountFn) {
        self.leaves.insert(leaf.name().to_string(), (leaf, count));
    }
}

impl CountResolver for Branch {
    fn count_fn(&self, leaf: &str) -> Option<CountFn> {
        self.leaves.get(leaf).map(|(_, f)| f.clone())
    }

    fn count_leaf(&self, leaf: &str) -> Option<&Leaf> {
        self.leaves.get(leaf).map(|(l, _)| l)
    }
}

struct NoCounts;

impl CountResolver for NoCounts {
    fn count_fn(&self, _leaf: &str) -> Option<CountFn> {
        None
    }
    fn count_leaf(&self, _leaf: &str) -> Option<&Leaf> {
        None
    }
}

fn named_leaf(kind: LeafKind, name: &str) -> Leaf {
    let mut leaf = Leaf::new(kind);
    leaf.set_name(name);
    leaf
}

#[test]
fn every_primitive_kind_binds_to_its_natural_destination() {
    for kind in LeafKind::iter() {
        let leaf = named_leaf(kind, "col");
        let result = match kind {
            LeafKind::Bool => LeafBinding::bind(&leaf, LeafTarget::Bool(Slot::new()), &NoCounts),
            LeafKind::Int8 => LeafBinding::bind(&leaf, LeafTarget::I8(Slot::new()), &NoCounts),
            LeafKind::Int16 => LeafBinding::bind(&leaf, LeafTarget::I16(Slot::new()), &NoCounts),
            LeafKind::Int32 => LeafBinding::bind(&leaf, LeafTarget::I32(Slot::new()), &NoCounts),
            LeafKind::Int64 => LeafBinding::bind(&leaf, LeafTarget::I64(Slot::new()), &NoCounts),
            LeafKind::Float32 | LeafKind::Float16 => {
                LeafBinding::bind(&leaf, LeafTarget::F32(Slot::new()), &NoCounts)
            }
            LeafKind::Float64 | LeafKind::Double32 => {
                LeafBinding::bind(&leaf, LeafTarget::F64(Slot::new()), &NoCounts)
            }
            LeafKind::CString => {
                LeafBinding::bind(&leaf, LeafTarget::Str(StringSlot::new()), &NoCounts)
            }
            LeafKind::Element => continue,
        };
        assert!(result.is_ok(), "kind {kind} failed to bind");
    }
}

#[test]
fn count_leaf_rows_stream_without_bleed() {
    // count leaf emits [0, 3, 1]; payload rows are [], [7, 8, 9], [5]
    let nhits = Slot::<i32>::new();
    let mut branch = Branch::new();
    {
        let nhits = nhits.clone();
        branch.add_count(
            named_leaf(LeafKind::Int32, "nhits"),
            Rc::new(move || i64::from(nhits.get())),
        );
    }

    let count_binding = LeafBinding::bind(
        &named_leaf(LeafKind::Int32, "nhits"),
        LeafTarget::I32(nhits.clone()),
        &branch,
    )
    .unwrap();

    let mut hits_leaf = named_leaf(LeafKind::Int32, "hits");
    hits_leaf.set_count_name("nhits");
    let hits = SliceSlot::<i32>::new();
    let hits_binding =
        LeafBinding::bind(&hits_leaf, LeafTarget::I32s(hits.clone()), &branch).unwrap();

    let rows = RowBindings::new(vec![count_binding, hits_binding]).unwrap();

    let mut w = WriteBuffer::new();
    for (count, payload) in [(0i32, vec![]), (3, vec![7i32, 8, 9]), (1, vec![5])] {
        w.write_i32(count);
        w.write_array(&payload);
    }
    let bytes = w.into_bytes().unwrap();
    let mut r = ReadBuffer::new(&bytes);

    let mut seen = Vec::new();
    for _ in 0..3 {
        rows.read_row(&mut r).unwrap();
        seen.push(hits.to_vec());
    }
    assert_eq!(seen, vec![vec![], vec![7, 8, 9], vec![5]]);
    assert_eq!(r.pos(), bytes.len());
    assert!(r.err().is_none());
}

#[test]
fn string_column_streams_row_values() {
    let tag = StringSlot::new();
    let binding = LeafBinding::bind(
        &named_leaf(LeafKind::CString, "tag"),
        LeafTarget::Str(tag.clone()),
        &NoCounts,
    )
    .unwrap();

    let mut w = WriteBuffer::new();
    w.write_string("signal");
    w.write_string("");
    w.write_string("background");
    let bytes = w.into_bytes().unwrap();
    let mut r = ReadBuffer::new(&bytes);

    binding.read_row(&mut r).unwrap();
    assert_eq!(tag.get(), "signal");
    binding.read_row(&mut r).unwrap();
    assert_eq!(tag.get(), "");
    binding.read_row(&mut r).unwrap();
    assert_eq!(tag.get(), "background");
}

#[test]
fn struct_column_with_variable_field_streams() {
    // a struct column whose "adc" field length is governed by a sibling count leaf
    let nsamples = Slot::<i32>::new();
    let mut branch = Branch::new();
    {
        let nsamples = nsamples.clone();
        branch.add_count(
            named_leaf(LeafKind::Int32, "nsamples"),
            Rc::new(move || i64::from(nsamples.get())),
        );
    }

    let count_binding = LeafBinding::bind(
        &named_leaf(LeafKind::Int32, "nsamples"),
        LeafTarget::I32(nsamples.clone()),
        &branch,
    )
    .unwrap();

    let mut pulse = named_leaf(LeafKind::Element, "pulse");
    pulse.set_elements(vec![
        StreamerElement::scalar("baseline", LeafKind::Float32),
        StreamerElement::var_array("adc", LeafKind::Int16, "nsamples"),
    ]);

    let baseline = Slot::<f32>::new();
    let adc = SliceSlot::<i16>::new();
    let pulse_binding = LeafBinding::bind(
        &pulse,
        LeafTarget::Struct(vec![
            ("baseline".into(), LeafTarget::F32(baseline.clone())),
            ("adc".into(), LeafTarget::I16s(adc.clone())),
        ]),
        &branch,
    )
    .unwrap();

    let rows = RowBindings::new(vec![count_binding, pulse_binding]).unwrap();

    let mut w = WriteBuffer::new();
    w.write_i32(2);
    w.write_f32(0.5);
    w.write_array(&[100i16, 101]);
    w.write_i32(0);
    w.write_f32(1.5);
    let bytes = w.into_bytes().unwrap();
    let mut r = ReadBuffer::new(&bytes);

    rows.read_row(&mut r).unwrap();
    assert_eq!(baseline.get(), 0.5);
    assert_eq!(*adc.values(), vec![100, 101]);

    rows.read_row(&mut r).unwrap();
    assert_eq!(baseline.get(), 1.5);
    assert!(adc.is_empty());
    assert_eq!(r.pos(), bytes.len());
}

#[test]
fn decoded_leaf_descriptor_binds_directly() {
    // the leaf travels through the container as a polymorphic object, then binds
    let mut original = named_leaf(LeafKind::Float32, "energy");
    original.set_title("energy in GeV");
    let original: Arc<dyn RootObject> = Arc::new(original);

    let mut w = WriteBuffer::new();
    w.write_object_any(Some(&original)).unwrap();
    let bytes = w.into_bytes().unwrap();

    let mut r = ReadBuffer::new(&bytes);
    let decoded = r.read_object_any().unwrap().unwrap();
    let decoded = decoded.as_any().downcast_ref::<Leaf>().unwrap();
    assert_eq!(decoded.name(), "energy");

    let energy = Slot::<f32>::new();
    let binding =
        LeafBinding::bind(decoded, LeafTarget::F32(energy.clone()), &NoCounts).unwrap();

    let mut w = WriteBuffer::new();
    w.write_f32(91.2);
    let row = w.into_bytes().unwrap();
    binding.read_row(&mut ReadBuffer::new(&row)).unwrap();
    assert_eq!(energy.get(), 91.2);
}

#[test]
fn reduced_precision_columns_stream_within_tolerance() {
    let mut frac = named_leaf(LeafKind::Float16, "frac");
    frac.set_title("frac[0,1,14]");
    let spec = *frac.range_spec().unwrap();

    let dest = Slot::<f32>::new();
    let binding = LeafBinding::bind(&frac, LeafTarget::F32(dest.clone()), &NoCounts).unwrap();

    let mut w = WriteBuffer::new();
    for value in [0.0f32, 0.25, 0.875, 1.0] {
        w.write_f16(value, Some(&spec));
    }
    let bytes = w.into_bytes().unwrap();
    let mut r = ReadBuffer::new(&bytes);

    for value in [0.0f32, 0.25, 0.875, 1.0] {
        binding.read_row(&mut r).unwrap();
        assert!((dest.get() - value).abs() < 1e-3, "{value} -> {}", dest.get());
    }
}

#[test]
fn mismatched_destination_is_rejected_before_any_row() {
    let mut wave = named_leaf(LeafKind::Float32, "wave");
    wave.set_len(8);

    let err =
        LeafBinding::bind(&wave, LeafTarget::I64s(SliceSlot::new()), &NoCounts).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("wave"), "diagnostic names the leaf: {rendered}");
    assert!(rendered.contains("Float32"), "diagnostic names the kind: {rendered}");
}

#[test]
fn row_read_failure_does_not_mask_the_error() {
    let energy = Slot::<f64>::new();
    let binding = LeafBinding::bind(
        &named_leaf(LeafKind::Float64, "energy"),
        LeafTarget::F64(energy.clone()),
        &NoCounts,
    )
    .unwrap();

    // four bytes cannot hold an f64 row
    let bytes = [0u8; 4];
    let mut r = ReadBuffer::new(&bytes);
    assert!(binding.read_row(&mut r).is_err());
    assert!(r.err().is_some());
}
