//! Benchmarks for docregion extraction and the extractor cache.
//!
//! Benchmarks:
//! - Directive scan over example files of increasing size
//! - Memoized re-extraction of an already-scanned region
//! - Content hash computation (blake3)
//! - Cache hit vs miss round trips
//! - Snippet tag detection in a guide document
//!
//! Run with: taskset -c 0 cargo bench --bench extraction_performance

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use docsnippet_language_server::docregion::cache::{ContentHash, ExtractorCache};
use docsnippet_language_server::docregion::extractor::DocregionExtractor;
use docsnippet_language_server::snippet::locator::{snippet_at, TextPosition};

// Helper to generate an annotated example file
fn generate_example_file(region_count: usize, lines_per_region: usize) -> String {
    let mut code = String::new();
    for region in 0..region_count {
        code.push_str(&format!("// #docregion region-{region}\n"));
        for line in 0..lines_per_region {
            code.push_str(&format!(
                "export const value_{region}_{line} = compute({region}, {line});\n"
            ));
        }
        code.push_str(&format!("// #enddocregion region-{region}\n"));
    }
    code
}

// Helper to generate a guide document with one snippet tag in the middle
fn generate_guide(line_count: usize) -> Vec<String> {
    (0..line_count)
        .map(|idx| {
            if idx == line_count / 2 {
                r#"<code-example path="app/app.component.ts" region="ctor" header="AppComponent"></code-example>"#
                    .to_string()
            } else {
                format!("Prose line {idx} of the guide, describing the example.")
            }
        })
        .collect()
}

/// Benchmark: Directive scan (line split + region map construction)
fn bench_directive_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction/directive_scan");
    group.sample_size(100);

    for region_count in [10, 50, 100] {
        let code = generate_example_file(region_count, 10);
        group.bench_with_input(
            BenchmarkId::new("regions", region_count),
            &region_count,
            |b, _| {
                b.iter(|| {
                    let extractor = DocregionExtractor::new("ts", &code);
                    black_box(extractor.extract("region-0"))
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: Re-extraction of an already-scanned region (memo lookup)
fn bench_memoized_extraction(c: &mut Criterion) {
    let code = generate_example_file(100, 10);
    let extractor = DocregionExtractor::new("ts", &code);
    // Force the scan up front so iterations measure the memo path only.
    extractor.extract("region-50");

    let mut group = c.benchmark_group("extraction/memoized");
    group.sample_size(1000);

    group.bench_function("reextract_100_regions", |b| {
        b.iter(|| black_box(extractor.extract("region-50")));
    });

    group.finish();
}

/// Benchmark: Content hash computation (blake3)
fn bench_content_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache/content_hash");
    group.sample_size(100);

    for region_count in [10, 50, 100] {
        let code = generate_example_file(region_count, 10);
        group.bench_with_input(
            BenchmarkId::new("blake3", region_count),
            &region_count,
            |b, _| {
                b.iter(|| black_box(ContentHash::of("ts", &code)));
            },
        );
    }

    group.finish();
}

/// Benchmark: Cache hit (hash + lookup + Arc clone) vs miss (hash +
/// build + insert + full scan)
fn bench_cache_round_trips(c: &mut Criterion) {
    let code = generate_example_file(100, 10);

    let mut group = c.benchmark_group("cache/round_trip");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(10));

    let cache = ExtractorCache::new();
    cache.get_or_create("ts", &code).extract("");
    group.bench_function("hit", |b| {
        b.iter(|| black_box(cache.get_or_create("ts", &code)));
    });

    group.bench_function("miss", |b| {
        b.iter(|| {
            let cache = ExtractorCache::new();
            let extractor = cache.get_or_create("ts", &code);
            black_box(extractor.extract(""))
        });
    });

    group.finish();
}

/// Benchmark: Locating the snippet tag under a cursor position
fn bench_tag_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection/snippet_at");
    group.sample_size(500);

    for line_count in [100, 1000] {
        let guide = generate_guide(line_count);
        let position = TextPosition::new(line_count / 2, 20);
        group.bench_with_input(
            BenchmarkId::new("guide_lines", line_count),
            &line_count,
            |b, _| {
                b.iter(|| black_box(snippet_at(guide.as_slice(), position)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_directive_scan,
    bench_memoized_extraction,
    bench_content_hash,
    bench_cache_round_trips,
    bench_tag_detection,
);

criterion_main!(benches);
