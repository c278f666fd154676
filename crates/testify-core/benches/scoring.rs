use criterion::{black_box, criterion_group, criterion_main, Criterion};

use testify_core::model::{Answers, ExamDocument, Item, Letter, Section};
use testify_core::scoring::score;

fn make_document(sections: usize, items: usize) -> ExamDocument {
    ExamDocument {
        sections: (0..sections)
            .map(|s| Section {
                name: format!("Section {s}"),
                time_minutes: Some(30),
                items: (0..items)
                    .map(|i| Item {
                        q: format!("Question {i}"),
                        passage: String::new(),
                        choices: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                        ans: Letter::ALL[i % 4].to_string(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn make_answers(document: &ExamDocument) -> Answers {
    document
        .sections
        .iter()
        .map(|s| {
            let slots = (0..s.items.len())
                .map(|i| match i % 3 {
                    0 => None,
                    _ => Letter::from_index(i % 4),
                })
                .collect();
            (s.name.clone(), slots)
        })
        .collect()
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    for (sections, items) in [(1, 10), (4, 50), (10, 200)] {
        let document = make_document(sections, items);
        let answers = make_answers(&document);
        group.bench_function(format!("{sections}x{items}"), |b| {
            b.iter(|| score(black_box(&document), black_box(&answers)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
