use criterion::{black_box, criterion_group, criterion_main, Criterion};

use loop_engine::pitch::engine::shift_buffer;
use loop_engine::session::coordinator::Session;
use loop_engine::state::config::EngineConfig;

fn bench_pitch_shift(c: &mut Criterion) {
    let config = EngineConfig::default();
    let sample_rate = 44_100u32;
    let data: Vec<f32> = (0..sample_rate as usize * 2)
        .map(|i| (i as f32 * 220.0 * std::f32::consts::TAU / sample_rate as f32).sin())
        .collect();
    let buffer = loop_engine::core::buffer::AudioBuffer::from_data(vec![data.clone(), data], sample_rate).unwrap();

    c.bench_function("pitch_shift_2s_stereo_up_five", |b| {
        b.iter(|| shift_buffer(black_box(&buffer), black_box(5.0), &config).unwrap())
    });
}

fn bench_mix_down(c: &mut Criterion) {
    let mut session = Session::new(44_100, 2, EngineConfig::default());

    c.bench_function("mix_down_512_frames_idle", |b| {
        b.iter(|| session.mix_down(black_box(512)))
    });
}

criterion_group!(benches, bench_pitch_shift, bench_mix_down);
criterion_main!(benches);
