use criterion::{black_box, criterion_group, criterion_main, Criterion};
use circuitlens::prelude::*;
use circuitlens::{RawDetection, SourceBatch};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Two sources reporting the same grid of parts with shifted boxes.
fn crowded_batches() -> Vec<SourceBatch> {
    let labels = ["resistor", "capacitor", "diode", "npn", "battery"];
    let mut batches = Vec::new();
    for (priority, (source, shift)) in [("shapes", 0.0), ("yolo", 3.0)].into_iter().enumerate() {
        let detections = (0..40)
            .map(|i| {
                let x = (i % 8) as f64 * 60.0 + shift;
                let y = (i / 8) as f64 * 60.0;
                let label = labels[i % labels.len()];
                let confidence = 0.5 + (i % 5) as f64 * 0.1;
                RawDetection::from_corners(source, label, confidence, [x, y, x + 40.0, y + 20.0])
                    .unwrap()
            })
            .collect();
        batches.push(SourceBatch::new(source, priority as u32, detections));
    }
    batches
}

fn bench_run_pipeline(c: &mut Criterion) {
    let core = CircuitLensCore::default();
    let options = PipelineOptions::default();
    let batches = crowded_batches();

    c.bench_function("run_pipeline", |b| {
        b.iter(|| {
            core.run(
                black_box(PipelineRequest::new(batches.clone(), Vec::new())),
                black_box(&options),
            )
        });
    });
}

fn bench_compile_description(c: &mut Criterion) {
    let options = PipelineOptions::default();
    c.bench_function("compile_description", |b| {
        b.iter(|| {
            circuitlens::compile_description_file(
                black_box(&fixture_path("mixed_description.json")),
                black_box(&options),
            )
        });
    });
}

criterion_group!(benches, bench_run_pipeline, bench_compile_description);
criterion_main!(benches);
