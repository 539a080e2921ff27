use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dms::{DmsConfig, DmsSession, RawFrame};

const DT: f64 = 1.0 / 15.0;

fn frame(i: u64) -> RawFrame {
    let phase = i as f64 * 0.1;
    let eye = if i % 60 < 3 { 0.1 } else { 0.85 };
    RawFrame::new(2.0 * phase.sin(), -3.0 + phase.cos(), 0.5, eye, 0.1)
}

/// Session that has finished warming up, so every tick runs the classifier
fn warm_session(normalization: bool) -> (DmsSession, u64) {
    let mut config = DmsConfig::default();
    config.normalization_enabled = normalization;
    let mut session = DmsSession::from_config(config).unwrap();
    let mut i = 0;
    while i < 200 {
        session.process_tick(&frame(i), i as f64 * DT).unwrap();
        i += 1;
    }
    (session, i)
}

fn bench_process_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_tick");

    for normalization in [false, true] {
        group.bench_with_input(
            BenchmarkId::new("steady_state", normalization),
            &normalization,
            |b, &normalization| {
                let (mut session, mut i) = warm_session(normalization);
                b.iter(|| {
                    let analysis = session.process_tick(&frame(i), i as f64 * DT).unwrap();
                    i += 1;
                    black_box(analysis)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_process_tick);
criterion_main!(benches);
