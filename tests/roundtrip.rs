//! Integration tests for the object codec: primitive and composite round-trips,
//! byte-count frame integrity, version gating and back-reference resolution.

use std::sync::Arc;

use rootscope::prelude::*;

fn encode(obj: &dyn RootObject) -> Vec<u8> {
    let mut w = WriteBuffer::new();
    obj.marshal(&mut w).unwrap();
    w.into_bytes().unwrap()
}

#[test]
fn primitive_extremes_round_trip() {
    let mut w = WriteBuffer::new();
    w.write_u8(u8::MAX);
    w.write_i8(i8::MIN);
    w.write_u16(u16::MAX);
    w.write_i16(i16::MIN);
    w.write_u32(u32::MAX);
    w.write_i32(i32::MIN);
    w.write_u64(u64::MAX);
    w.write_i64(i64::MIN);
    w.write_f32(f32::MIN_POSITIVE);
    w.write_f64(f64::MAX);
    w.write_f32(0.0);
    w.write_f64(-0.0);
    w.write_bool(false);
    let bytes = w.into_bytes().unwrap();

    let mut r = ReadBuffer::new(&bytes);
    assert_eq!(r.read_u8(), u8::MAX);
    assert_eq!(r.read_i8(), i8::MIN);
    assert_eq!(r.read_u16(), u16::MAX);
    assert_eq!(r.read_i16(), i16::MIN);
    assert_eq!(r.read_u32(), u32::MAX);
    assert_eq!(r.read_i32(), i32::MIN);
    assert_eq!(r.read_u64(), u64::MAX);
    assert_eq!(r.read_i64(), i64::MIN);
    assert_eq!(r.read_f32(), f32::MIN_POSITIVE);
    assert_eq!(r.read_f64(), f64::MAX);
    assert_eq!(r.read_f32(), 0.0);
    assert_eq!(r.read_f64(), -0.0);
    assert!(!r.read_bool());
    assert!(r.err().is_none());
    assert_eq!(r.pos(), bytes.len());
}

#[test]
fn string_edge_cases_round_trip() {
    let cases = [
        String::new(),
        "a".to_string(),
        "x".repeat(254),
        "y".repeat(255),
        "z".repeat(70_000),
    ];

    let mut w = WriteBuffer::new();
    for case in &cases {
        w.write_string(case);
    }
    let bytes = w.into_bytes().unwrap();

    let mut r = ReadBuffer::new(&bytes);
    for case in &cases {
        assert_eq!(&r.read_string(), case);
    }
    assert!(r.err().is_none());
}

#[test]
fn named_and_objstring_round_trip() {
    let named = Named::new("calo", "calorimeter block");
    let mut out = Named::default();
    out.unmarshal(&mut ReadBuffer::new(&encode(&named))).unwrap();
    assert_eq!(out, named);

    let s = ObjString::new("payload");
    let mut out = ObjString::default();
    out.unmarshal(&mut ReadBuffer::new(&encode(&s))).unwrap();
    assert_eq!(out, s);
}

#[test]
fn map_round_trip_preserves_pairs_and_null_values() {
    let mut map = Map::new();
    map.insert(Arc::new(ObjString::new("alpha")), Some(Arc::new(ObjString::new("1"))));
    map.insert(Arc::new(ObjString::new("beta")), None);
    map.insert(
        Arc::new(Named::new("gamma", "third key")),
        Some(Arc::new(ObjString::new("3"))),
    );

    let mut out = Map::new();
    out.unmarshal(&mut ReadBuffer::new(&encode(&map))).unwrap();
    assert_eq!(out.len(), 3);

    let entries = out.entries();
    let key0 = entries[0].0.as_any().downcast_ref::<ObjString>().unwrap();
    assert_eq!(key0.value, "alpha");
    assert!(entries[1].1.is_none());
    let key2 = entries[2].0.as_any().downcast_ref::<Named>().unwrap();
    assert_eq!(key2.name, "gamma");
}

#[test]
fn empty_map_round_trip() {
    let map = Map::new();
    let mut out = Map::new();
    out.unmarshal(&mut ReadBuffer::new(&encode(&map))).unwrap();
    assert!(out.is_empty());
}

#[test]
fn truncated_payload_raises_framing_error() {
    let named = Named::new("victim", "truncation test");
    let bytes = encode(&named);

    // dropping the last byte must never decode successfully
    let mut out = Named::default();
    let result = out.unmarshal(&mut ReadBuffer::new(&bytes[..bytes.len() - 1]));
    assert!(result.is_err());
}

#[test]
fn extended_payload_raises_framing_error() {
    let named = Named::new("victim", "extension test");
    let mut bytes = encode(&named);

    // grow the declared byte count by one without growing the payload
    bytes[3] += 1;
    bytes.push(0xAA);

    let mut out = Named::default();
    let err = out.unmarshal(&mut ReadBuffer::new(&bytes)).unwrap_err();
    assert!(matches!(err, Error::ByteCount { .. }));
}

#[test]
fn legacy_map_version_decodes_without_new_headers() {
    // a hand-built version-2 fixture: named header present, base header absent
    let mut w = WriteBuffer::new();
    let pos = w.write_version(2);
    Named::new("legacy", "old writer").marshal(&mut w).unwrap();
    w.write_i32(1);
    let key: Arc<dyn RootObject> = Arc::new(ObjString::new("k"));
    let val: Arc<dyn RootObject> = Arc::new(ObjString::new("v"));
    w.write_object_any(Some(&key)).unwrap();
    w.write_object_any(Some(&val)).unwrap();
    w.set_byte_count(pos, "TMap").unwrap();
    let bytes = w.into_bytes().unwrap();

    let mut out = Map::new();
    out.unmarshal(&mut ReadBuffer::new(&bytes)).unwrap();
    assert_eq!(out.name(), "legacy");
    assert_eq!(out.len(), 1);
}

#[test]
fn polymorphic_decode_resolves_concrete_types() {
    let mut w = WriteBuffer::new();
    let named: Arc<dyn RootObject> = Arc::new(Named::new("poly", "dispatch"));
    let string: Arc<dyn RootObject> = Arc::new(ObjString::new("tagged"));
    w.write_object_any(Some(&named)).unwrap();
    w.write_object_any(Some(&string)).unwrap();
    w.write_object_any(None).unwrap();
    let bytes = w.into_bytes().unwrap();

    let mut r = ReadBuffer::new(&bytes);
    let a = r.read_object_any().unwrap().unwrap();
    assert_eq!(a.class(), "TNamed");
    assert_eq!(a.as_any().downcast_ref::<Named>().unwrap().name, "poly");

    let b = r.read_object_any().unwrap().unwrap();
    assert_eq!(b.as_any().downcast_ref::<ObjString>().unwrap().value, "tagged");

    assert!(r.read_object_any().unwrap().is_none());
}

#[test]
fn shared_object_round_trips_as_field_equal_entries() {
    // the same value instance is referenced by two different map entries
    let shared: Arc<dyn RootObject> = Arc::new(ObjString::new("shared payload"));
    let mut map = Map::new();
    map.insert(Arc::new(ObjString::new("first")), Some(shared.clone()));
    map.insert(Arc::new(ObjString::new("second")), Some(shared));

    let mut out = Map::new();
    out.unmarshal(&mut ReadBuffer::new(&encode(&map))).unwrap();

    let entries = out.entries();
    let v0 = entries[0].1.as_ref().unwrap();
    let v1 = entries[1].1.as_ref().unwrap();

    // field-for-field equality across both decoded entries
    assert_eq!(
        v0.as_any().downcast_ref::<ObjString>().unwrap(),
        v1.as_any().downcast_ref::<ObjString>().unwrap(),
    );
}

#[test]
fn class_name_written_once_for_repeated_classes() {
    let mut map = Map::new();
    for i in 0..8 {
        map.insert(Arc::new(ObjString::new(format!("key{i}"))), None);
    }
    let bytes = encode(&map);

    let needle = b"TObjString".as_slice();
    let occurrences = bytes.windows(needle.len()).filter(|w| *w == needle).count();
    assert_eq!(occurrences, 1, "class tag must be back-referenced after first use");
}

#[test]
fn sticky_write_error_blocks_the_output() {
    let mut w = WriteBuffer::new();
    w.write_u32(1);
    let pos = w.write_version(1);
    // mismatched reservation poisons the buffer
    assert!(w.set_byte_count(pos + 64, "TBroken").is_err());
    w.write_u32(2);
    assert!(w.err().is_some());
    assert!(w.into_bytes().is_err());
}
