use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use moca_core::model::{Module, TaskId};
use moca_core::report::{FinalReport, ModuleScore};
use moca_core::response::parse_drawing;
use moca_core::scoring::naming::{self, NamingAnswers};
use moca_core::scoring::orientation::{self, DateAnswer, ExaminerMarked, OrientationSubmission};
use moca_core::scoring::recall::{self, DelayedRecallSubmission};
use moca_core::traits::extract_json_object;

fn bench_deterministic(c: &mut Criterion) {
    let mut group = c.benchmark_group("deterministic");

    let answers = NamingAnswers {
        lion: "  Es un LEÓN ".into(),
        rhino: "rinoceronte".into(),
        camel: "no sé".into(),
    };
    let recall_sub = DelayedRecallSubmission {
        words: vec!["rostro, seda... iglesia".into(), "claven".into()],
        cued: vec!["clavel".into()],
        choice: vec!["rojo".into()],
    };
    let orientation_sub = OrientationSubmission {
        date: DateAnswer {
            day: 15,
            month: 5,
            year: 2024,
            day_of_week: "Miércoles".into(),
        },
        place: ExaminerMarked {
            value: "Hospital".into(),
            is_correct: true,
        },
        city: ExaminerMarked {
            value: "Madrid".into(),
            is_correct: false,
        },
    };
    let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap_or_default();

    group.bench_function("naming", |b| b.iter(|| naming::score(black_box(&answers))));
    group.bench_function("delayed_recall", |b| {
        b.iter(|| recall::score(black_box(&recall_sub)))
    });
    group.bench_function("orientation", |b| {
        b.iter(|| orientation::score(black_box(&orientation_sub), today))
    });

    let scores: Vec<(Module, ModuleScore)> = Module::ALL
        .iter()
        .map(|m| (*m, ModuleScore::Scored(3)))
        .collect();
    group.bench_function("aggregate", |b| {
        b.iter(|| FinalReport::from_module_scores("bench", black_box(&scores), true))
    });

    group.finish();
}

fn bench_model_reply(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_reply");

    let reply = r#"```json
{
  "taskId": "C_CLOCK",
  "unscorable": false,
  "score": 2,
  "maxScore": 3,
  "confidence": 0.82,
  "checks": {
    "contour": { "pass": true, "notes": "closed circle" },
    "numbers": { "pass": true, "notes": "1-12 in order" },
    "hands": { "pass": false, "notes": "shows 3:00" }
  },
  "overallNotes": "hands incorrect"
}
```"#;
    let definition = moca_core::catalog::definition(TaskId::CClock);

    group.bench_function("extract_json", |b| {
        b.iter(|| extract_json_object(black_box(reply)))
    });
    group.bench_function("parse_clock", |b| {
        b.iter(|| parse_drawing(definition, black_box(reply)))
    });

    group.finish();
}

criterion_group!(benches, bench_deterministic, bench_model_reply);
criterion_main!(benches);
