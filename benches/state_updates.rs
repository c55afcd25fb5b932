// SPDX-License-Identifier: MPL-2.0
use criterion::{criterion_group, criterion_main, Criterion};
use projectionist::application::port::EngineStatus;
use projectionist::domain::Volume;
use projectionist::player::PlaybackStateMachine;
use std::hint::black_box;

fn status(position: f64) -> EngineStatus {
    EngineStatus {
        position: Some(position),
        duration: Some(7200.0),
        volume: Some(80.0),
        path: Some("/media/feature.mkv".to_string()),
        phase: Some("playing".to_string()),
        ..EngineStatus::default()
    }
}

/// The state machine sits on the engine event hot path (tens of reports per
/// second during playback), so both the changed and the unchanged case
/// matter.
fn state_update_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_updates");

    group.bench_function("changed_position_report", |b| {
        let mut machine = PlaybackStateMachine::new(Volume::default());
        let mut position = 0.0;
        b.iter(|| {
            position += 0.25;
            let _ = black_box(machine.update_from_engine_status(&status(position)));
        });
    });

    group.bench_function("unchanged_report", |b| {
        let mut machine = PlaybackStateMachine::new(Volume::default());
        let report = status(42.0);
        machine.update_from_engine_status(&report);
        b.iter(|| {
            let _ = black_box(machine.update_from_engine_status(black_box(&report)));
        });
    });

    group.finish();
}

criterion_group!(benches, state_update_benchmark);
criterion_main!(benches);
