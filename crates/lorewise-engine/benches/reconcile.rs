use criterion::{Criterion, criterion_group, criterion_main};
use lorewise_engine::editing::{Cmd, Document};
use lorewise_engine::source::RawEdit;
use lorewise_engine::suggest::{
    SessionContext, Suggestion, SuggestionController, SuggestionKind, assign_ranges, project,
    remap_suggestions,
};

const PARAGRAPH: &str = "The old lighthouse keeper climbed the stairs every night. ";

fn manuscript(paragraphs: usize) -> String {
    PARAGRAPH.repeat(paragraphs)
}

/// One replace per paragraph, targeting "keeper"
fn pending_batch(paragraphs: usize) -> Vec<Suggestion> {
    let offset = PARAGRAPH.find("keeper").unwrap_or(0);
    (0..paragraphs)
        .map(|i| {
            let start = i * PARAGRAPH.len() + offset;
            Suggestion::replace(start..start + "keeper".len(), "keeper", "warden")
        })
        .collect()
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    group.sample_size(10);

    let ctx = SessionContext::new();
    let doc = Document::from_text(&manuscript(200));
    let pending = pending_batch(200);

    group.bench_function("remap_200_pending", |b| {
        let mut d = doc.clone();
        b.iter(|| {
            let mut batch = pending.clone();
            let patch = d
                .apply(Cmd::InsertText {
                    at: std::hint::black_box(0),
                    text: "x".to_string(),
                })
                .unwrap();
            std::hint::black_box(remap_suggestions(&ctx, &mut batch, &patch));
        });
    });

    group.bench_function("accept_all_200", |b| {
        b.iter(|| {
            let mut d = doc.clone();
            let mut controller = SuggestionController::new();
            controller.set_suggestions(&ctx, pending.clone());
            std::hint::black_box(controller.accept_all(&ctx, &mut d));
        });
    });

    group.bench_function("project_200", |b| {
        b.iter(|| std::hint::black_box(project(&ctx, &doc, &pending)));
    });

    let raw: Vec<RawEdit> = (0..200)
        .map(|_| RawEdit {
            kind: SuggestionKind::Replace,
            old_text: "stairs".to_string(),
            new_text: "steps".to_string(),
            rationale: None,
            offset: None,
        })
        .collect();
    let reference = manuscript(200);

    group.bench_function("assign_ranges_200", |b| {
        b.iter(|| std::hint::black_box(assign_ranges(&ctx, &reference, 0, &raw)));
    });

    group.finish();
}

criterion_group!(benches, bench_reconcile);
criterion_main!(benches);
