use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use solar_compare::{Observation, Reconciler, Series};

fn synthetic_series(label: &str, start: NaiveDate, days: u64) -> Series {
    let observations = (0..days)
        .filter_map(|i| {
            let date = start.checked_add_days(Days::new(i))?;
            let radiation = 400.0 + (i % 400) as f64;
            let humidity = (i % 7 != 0).then_some(60.0 + (i % 30) as f64);
            Some(Observation::new(date, Some(radiation), humidity))
        })
        .collect();
    Series::new(label, observations).unwrap_or_else(|_| Series::empty(label))
}

fn bench_reconcile(c: &mut Criterion) {
    let historical = synthetic_series("2008", NaiveDate::from_ymd_opt(2008, 1, 1).unwrap(), 366);
    let nasa = synthetic_series("NASA 2024–2025", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 539);
    let inputs = [historical, nasa];
    let reconciler = Reconciler::default();

    c.bench_function("reconcile", |b| {
        b.iter(|| reconciler.reconcile(black_box(&inputs)))
    });

    let dataset = reconciler.reconcile(&inputs).unwrap();
    c.bench_function("summarize", |b| b.iter(|| reconciler.summarize(black_box(&dataset))));
    c.bench_function("to_csv", |b| b.iter(|| black_box(&dataset).to_csv()));
}

criterion_group!(benches, bench_reconcile);
criterion_main!(benches);
