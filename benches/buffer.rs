//! Benchmarks for the buffer protocol.
//!
//! Tests encode/decode throughput for the operations that dominate real workloads:
//! - Primitive reads and writes
//! - Version + byte-count framing
//! - Length-prefixed strings
//! - Polymorphic object graphs with back-references

extern crate rootscope;

use criterion::{criterion_group, criterion_main, Criterion};
use rootscope::prelude::*;
use std::hint::black_box;
use std::sync::Arc;

/// Benchmark sequential primitive decoding over a pre-encoded region.
fn bench_primitive_reads(c: &mut Criterion) {
    let mut w = WriteBuffer::new();
    for i in 0..1024i32 {
        w.write_i32(i);
        w.write_f64(f64::from(i) * 0.5);
    }
    let bytes = w.into_bytes().unwrap();

    c.bench_function("buffer_primitive_reads", |b| {
        b.iter(|| {
            let mut r = ReadBuffer::new(black_box(&bytes));
            let mut acc = 0.0f64;
            for _ in 0..1024 {
                acc += f64::from(r.read_i32()) + r.read_f64();
            }
            black_box(acc)
        });
    });
}

/// Benchmark writing versioned blocks with byte-count patching.
fn bench_version_framing(c: &mut Criterion) {
    c.bench_function("buffer_version_framing", |b| {
        b.iter(|| {
            let mut w = WriteBuffer::with_capacity(64 * 1024);
            for i in 0..512i32 {
                let pos = w.write_version(3);
                w.write_i32(i);
                w.write_f32(1.5);
                w.set_byte_count(pos, "TBlock").unwrap();
            }
            black_box(w.into_bytes().unwrap())
        });
    });
}

/// Benchmark string round-trips at the small-string encoding.
fn bench_strings(c: &mut Criterion) {
    let mut w = WriteBuffer::new();
    for _ in 0..256 {
        w.write_string("branch.energy.raw");
    }
    let bytes = w.into_bytes().unwrap();

    c.bench_function("buffer_string_reads", |b| {
        b.iter(|| {
            let mut r = ReadBuffer::new(black_box(&bytes));
            let mut total = 0;
            for _ in 0..256 {
                total += r.read_string().len();
            }
            black_box(total)
        });
    });
}

/// Benchmark polymorphic decode of a map whose values share one object.
fn bench_object_graph_decode(c: &mut Criterion) {
    let shared: Arc<dyn RootObject> = Arc::new(ObjString::new("shared"));
    let mut map = Map::new();
    for i in 0..64 {
        map.insert(
            Arc::new(ObjString::new(format!("key{i}"))),
            Some(shared.clone()),
        );
    }
    let mut w = WriteBuffer::new();
    map.marshal(&mut w).unwrap();
    let bytes = w.into_bytes().unwrap();

    c.bench_function("buffer_object_graph_decode", |b| {
        b.iter(|| {
            let mut out = Map::new();
            out.unmarshal(&mut ReadBuffer::new(black_box(&bytes))).unwrap();
            black_box(out.len())
        });
    });
}

criterion_group!(
    benches,
    bench_primitive_reads,
    bench_version_framing,
    bench_strings,
    bench_object_graph_decode
);
criterion_main!(benches);
