use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use codedupe::detect::{token_hash, DuplicateFinder, FinderConfig, MatchStore, RollingMatcher};
use codedupe::tokens::{FileId, LexerRegistry, TokenCache, TokenSource};
use std::fs;
use tempfile::TempDir;

/// A C-like source of `lines` lines; every `period`-th function repeats.
fn generate_source(seed: usize, lines: usize, period: usize) -> String {
    let mut out = String::new();
    for i in 0..lines {
        let id = if (i / 8) % period == 0 { i % 8 } else { seed * 100_000 + i };
        out.push_str(&format!(
            "    total_{id} = compute(value_{id}, {id}) + offset * {id};\n",
            id = id
        ));
        if i % 8 == 7 {
            out.push_str("}\nint func(void) {\n");
        }
    }
    out
}

fn populated_cache(files: usize, lines: usize) -> (TokenCache, Vec<FileId>) {
    let mut cache = TokenCache::new(LexerRegistry::with_builtin_languages(), false);
    let ids = (0..files)
        .map(|f| {
            cache
                .add_source(format!("file_{}.c", f), &generate_source(f, lines, 4))
                .unwrap()
        })
        .collect();
    (cache, ids)
}

// 1. Token hashing
fn bench_token_hash(c: &mut Criterion) {
    let tokens = ["x", "{", "identifier_name", "\"a string literal\"", "12345"];
    c.bench_function("token_hash", |b| {
        b.iter(|| {
            for t in &tokens {
                black_box(token_hash(black_box(t)));
            }
        })
    });
}

// 2. Matcher pass over pre-tokenized files
fn bench_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher");

    for lines in [200, 2_000] {
        let (mut cache, ids) = populated_cache(8, lines);
        let tokens: usize = ids
            .iter()
            .map(|id| cache.file_tokens(*id).unwrap().len())
            .sum();
        group.throughput(Throughput::Elements(tokens as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, _| {
            b.iter(|| {
                let mut store = MatchStore::new(50, 3).unwrap();
                let mut matcher = RollingMatcher::new(50).unwrap();
                for id in &ids {
                    matcher.scan_file(*id, &mut cache, &mut store).unwrap();
                }
                black_box(store.ranked_matches());
            })
        });
    }
    group.finish();
}

// 3. Full pipeline: walk + tokenize + match
fn bench_pipeline(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    for f in 0..20 {
        fs::write(
            dir.path().join(format!("file_{}.c", f)),
            generate_source(f, 500, 4),
        )
        .unwrap();
    }
    let finder = DuplicateFinder::new(FinderConfig::default().with_min_tokens(50));

    c.bench_function("pipeline_20_files", |b| {
        b.iter(|| {
            let result = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
            black_box(result);
        })
    });
}

criterion_group!(benches, bench_token_hash, bench_matcher, bench_pipeline);
criterion_main!(benches);
