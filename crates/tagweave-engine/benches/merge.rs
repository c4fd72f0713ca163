use criterion::{Criterion, criterion_group, criterion_main};
use tagweave_engine::{BlockKey, DocumentSnapshot, HighlightApplier, Interval, Selection, merge_intervals, tag_set};

fn generate_line(words: usize) -> String {
    (0..words)
        .map(|i| format!("word{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_merge_intervals(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    group.sample_size(10);

    let block_len = 10_000;
    let tags: Vec<_> = (0..8).map(|i| tag_set([format!("tag{i}")])).collect();
    let inputs: Vec<_> = (0..500)
        .map(|i| {
            let start = (i * 37) % (block_len - 100);
            (Interval { start, end: start + 20 + i % 80 }, &tags[i % tags.len()])
        })
        .collect();

    group.bench_function("merge_intervals_500", |b| {
        b.iter(|| {
            let segments = merge_intervals(block_len, &inputs).unwrap();
            std::hint::black_box(segments);
        });
    });

    group.finish();
}

fn bench_apply_highlights(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");
    group.sample_size(10);

    let text = generate_line(2_000);
    let doc = DocumentSnapshot::from_text(&text);
    let len = doc.block(&BlockKey::from("b0")).unwrap().len();

    group.bench_function("apply_50_overlapping", |b| {
        b.iter(|| {
            let mut current = doc.clone();
            let mut applier = HighlightApplier::new();
            for i in 0..50 {
                let start = (i * 211) % (len - 400);
                applier
                    .select(&current, &Selection::within("b0", start, start + 300))
                    .unwrap();
                current = applier.apply(&current, &tag_set([format!("t{}", i % 5)])).unwrap();
            }
            std::hint::black_box(current);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_merge_intervals, bench_apply_highlights);
criterion_main!(benches);
