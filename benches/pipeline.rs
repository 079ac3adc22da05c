use std::fs;
use std::hint::black_box as bb;
use std::path::Path;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use goparser::parse_file;
use toe::{generate, GenerateRequest};

// =============================================================================
// Inputs: one interface with a growing number of methods
// =============================================================================

fn interface_source(methods: usize) -> String {
    let mut src = String::from(
        "package svc\n\nimport \"context\"\n\n\
         type Service[K comparable, V any] interface {\n",
    );
    for i in 0..methods {
        let method = match i % 4 {
            0 => format!("\tGet{i}(ctx context.Context, key K) (V, error)\n"),
            1 => format!("\tPut{i}(ctx context.Context, key K, value V) error\n"),
            2 => format!("\tScan{i}(prefix string, limit int, opts ...string) (<-chan V, func())\n"),
            _ => format!("\tIndex{i}(m map[K][]V, n [16]byte)\n"),
        };
        src.push_str(&method);
    }
    src.push_str("}\n");
    src
}

fn write_package(dir: &Path, methods: usize) {
    fs::write(dir.join("go.mod"), "module example.com/svc\n").expect("go.mod");
    fs::write(dir.join("svc.go"), interface_source(methods)).expect("svc.go");
}

// =============================================================================
// Benchmark 1: declaration parsing of the input file
// =============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for methods in [4, 32, 256] {
        let src = interface_source(methods);
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(methods), &src, |b, src| {
            b.iter(|| bb(parse_file(bb(src)).expect("parses")));
        });
    }
    group.finish();
}

// =============================================================================
// Benchmark 2: load, resolve, synthesize and print, without writing
// =============================================================================

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for methods in [4, 32, 256] {
        let dir = tempfile::tempdir().expect("tempdir");
        write_package(dir.path(), methods);
        let mut req = GenerateRequest::new(dir.path(), "Service");
        req.settings.stub_dir = dir.path().join("stubs");

        group.throughput(Throughput::Elements(methods as u64));
        group.bench_with_input(BenchmarkId::from_parameter(methods), &req, |b, req| {
            b.iter(|| bb(generate(bb(req)).expect("generates")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_generate);
criterion_main!(benches);
