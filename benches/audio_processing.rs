use criterion::{black_box, criterion_group, criterion_main, Criterion};

use loop_engine::audio::effects::{EffectKind, EffectsChain};
use loop_engine::core::buffer::AudioBuffer;
use loop_engine::mixer::overdub::OverdubMixer;

fn bench_effect_chain(c: &mut Criterion) {
    let mut chain = EffectsChain::new(44_100, 2);
    chain.add(EffectKind::LowPass { cutoff_hz: 2_000.0 });
    chain.add(EffectKind::Delay { time_ms: 250.0, feedback: 0.35, mix: 0.3 });
    chain.add(EffectKind::Compressor { threshold_db: -18.0, ratio: 4.0 });

    let mut buffer = AudioBuffer::new(44_100, 2);
    buffer.resize(4096);

    c.bench_function("effect_chain_4096_frames_stereo", |b| {
        b.iter(|| chain.process(black_box(&mut buffer)))
    });
}

fn bench_overdub_mix(c: &mut Criterion) {
    let mixer = OverdubMixer::new();
    let existing = {
        let mut buf = AudioBuffer::new(44_100, 2);
        buf.resize(44_100);
        buf
    };
    let overdub = {
        let mut buf = AudioBuffer::new(44_100, 2);
        buf.resize(44_100);
        buf
    };

    c.bench_function("overdub_mix_1s_stereo", |b| {
        b.iter(|| mixer.mix(black_box(&existing), black_box(&overdub), false).unwrap())
    });
}

criterion_group!(benches, bench_effect_chain, bench_overdub_mix);
criterion_main!(benches);
