//! Benchmarks for rigfile core operations.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rigfile::core::context::ExecutionContext;
use rigfile::core::parser::parse_recipe;
use rigfile::core::resolver::expand;

fn recipe(steps: usize) -> String {
    let mut out = String::from("ARG TOOLCHAIN=stable\nSET DEBIAN_FRONTEND=noninteractive\n");
    for i in 0..steps {
        match i % 4 {
            0 => out.push_str(&format!("RUN echo step {i} && make -j4 target-{i}\n")),
            1 => out.push_str(&format!("SET STEP_{i}=${{TOOLCHAIN}}-{i}\n")),
            2 => out.push_str(&format!(
                "CLONE --depth 1 --branch v{i} https://example.com/org/repo-{i}.git\n"
            )),
            _ => out.push_str("INSTALL --provider apt curl git \\\n    build-essential\n"),
        }
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_recipe");
    for steps in [10, 100, 1000] {
        let text = recipe(steps);
        group.bench_with_input(BenchmarkId::from_parameter(steps), &text, |b, text| {
            b.iter(|| black_box(parse_recipe(black_box(text)).unwrap()));
        });
    }
    group.finish();
}

fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_digest");
    for steps in [10, 100, 1000] {
        let plan = parse_recipe(&recipe(steps)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(steps), &plan, |b, plan| {
            b.iter(|| black_box(plan.digest()));
        });
    }
    group.finish();
}

fn bench_expand(c: &mut Criterion) {
    let ctx = ExecutionContext::new("/")
        .with_env("HOME_DIR", "/home/builder")
        .with_env("REPO", "widget")
        .with_env("VERSION", "1.2.3");
    let input = "${HOME_DIR}/src/$REPO-v${VERSION}/build/$REPO.tar.gz";

    c.bench_function("expand_variables", |b| {
        b.iter(|| black_box(expand(black_box(input), &ctx).unwrap()));
    });
}

criterion_group!(benches, bench_parse, bench_digest, bench_expand);
criterion_main!(benches);
