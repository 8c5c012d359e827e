use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mqlite_core::{decode_value, encode_value, Handle, HandleId, Request, TypeRegistry, Value};
use std::hint::black_box;

fn sample_call(args: usize) -> Request {
    Request::Call {
        target: Handle::new(HandleId::new(7), "demo.Greeter", "memory://localhost", "server-request"),
        method: "methodWithOneParams".to_string(),
        args: (0..args).map(|i| Value::from(format!("arg-{}", i))).collect(),
    }
}

fn bench_value_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_codec");
    let types = TypeRegistry::new();

    for size in [1usize, 16, 256, 4096] {
        let array = Value::Array((0..size as i32).map(Value::Int).collect());
        let encoded = encode_value(&array).unwrap();

        group.bench_with_input(BenchmarkId::new("encode_int_array", size), &array, |b, array| {
            b.iter(|| black_box(encode_value(array).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("decode_int_array", size), &encoded, |b, bytes| {
            b.iter(|| black_box(decode_value(bytes, &types).unwrap()))
        });
    }

    group.finish();
}

fn bench_request_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_codec");
    let types = TypeRegistry::new();

    for args in [0usize, 3, 32] {
        let request = sample_call(args);
        let encoded = request.encode().unwrap();

        group.bench_with_input(BenchmarkId::new("encode_call", args), &request, |b, request| {
            b.iter(|| black_box(request.encode().unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("decode_call", args), &encoded, |b, bytes| {
            b.iter(|| black_box(Request::decode(bytes.clone(), &types).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_value_codec, bench_request_codec);
criterion_main!(benches);
