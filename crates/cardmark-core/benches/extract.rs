#![allow(missing_docs)]

use cardmark_core::config::Config;
use cardmark_core::reader::extract_tasks;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::fmt::Write as _;
use std::path::Path;

fn build_markdown(task_count: usize) -> String {
    let mut text = String::from("# Board\n\n");
    for idx in 0..task_count {
        let _ = writeln!(text, "#TODO:{} task number {idx} +bench @desk", idx * 10);
        let _ = writeln!(text, "- detail line\n<!-- owner:bench -->\n\n");
    }
    text
}

fn build_source(task_count: usize) -> String {
    let mut text = String::new();
    for idx in 0..task_count {
        let _ = writeln!(text, "fn f{idx}() {{\n    let s = \"// not a comment\";\n}}");
        let _ = writeln!(text, "// #DOING:{idx} comment task {idx}\n//   more detail");
        let _ = writeln!(text, "/*\n * TODO: block task {idx}\n */");
    }
    text
}

fn extract_benchmark(c: &mut Criterion) {
    let config = Config::default();
    let mut group = c.benchmark_group("extract_tasks");
    for &count in &[10usize, 100, 1000] {
        let markdown = build_markdown(count);
        group.bench_with_input(BenchmarkId::new("markdown", count), &markdown, |b, text| {
            b.iter(|| black_box(extract_tasks(Path::new("board.md"), text, &config)));
        });
        let source = build_source(count);
        group.bench_with_input(BenchmarkId::new("rust", count), &source, |b, text| {
            b.iter(|| black_box(extract_tasks(Path::new("lib.rs"), text, &config)));
        });
    }
    group.finish();
}

criterion_group!(benches, extract_benchmark);
criterion_main!(benches);
