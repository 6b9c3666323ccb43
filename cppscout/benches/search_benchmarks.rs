use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cppscout::search::prefilter;
use cppscout::{search, Category, SearchConfig};
use std::{fs, num::NonZeroUsize, path::Path};
use tempfile::tempdir;

fn create_test_files(root: &Path, file_count: usize, structs_per_file: usize) -> std::io::Result<()> {
    fs::create_dir_all(root)?;
    for i in 0..file_count {
        let mut source = String::new();
        for j in 0..structs_per_file {
            source.push_str(&format!(
                "struct Widget{i}_{j} {{\n  int width;\n  int height;\n}};\n\
                 int area{i}_{j}(const Widget{i}_{j}& w) {{\n  return w.width * w.height;\n}}\n"
            ));
        }
        fs::write(root.join(format!("widget_{}.cpp", i)), source)?;
    }
    Ok(())
}

fn naive_find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn bench_prefilter(c: &mut Criterion) {
    let mut haystack = b"int value = compute(other, 42); // nothing here\n".repeat(4096);
    haystack.extend_from_slice(b"class NeedleInTheHaystack {};\n");

    let mut group = c.benchmark_group("prefilter");
    for needle in ["N", "Needle", "NeedleInTheHaystack"] {
        group.bench_with_input(BenchmarkId::new("simd", needle), needle, |b, needle| {
            b.iter(|| prefilter::find(black_box(&haystack), black_box(needle.as_bytes())))
        });
        group.bench_with_input(BenchmarkId::new("naive", needle), needle, |b, needle| {
            b.iter(|| naive_find(black_box(&haystack), black_box(needle.as_bytes())))
        });
    }
    group.finish();
}

fn bench_directory_scan(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let root = dir.path().join("project");
    create_test_files(&root, 20, 25).unwrap();

    let mut group = c.benchmark_group("directory_scan");
    group.sample_size(10);
    for threads in [1, 5] {
        let config = SearchConfig {
            query: "Widget1".to_string(),
            paths: vec![root.clone()],
            categories: vec![Category::Struct, Category::Function],
            thread_count: NonZeroUsize::new(threads).unwrap(),
            ..SearchConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("threads", threads), &config, |b, config| {
            b.iter(|| search(black_box(config)).unwrap())
        });
    }

    let miss = SearchConfig {
        query: "NotPresentAnywhere".to_string(),
        paths: vec![root.clone()],
        ..SearchConfig::default()
    };
    group.bench_function("prefilter_miss", |b| b.iter(|| search(black_box(&miss)).unwrap()));
    group.finish();
}

criterion_group!(benches, bench_prefilter, bench_directory_scan);
criterion_main!(benches);
