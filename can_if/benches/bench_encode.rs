//! # Motor Command Encoding Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use can_if::{encode, MotorCommand, StandardId};

fn encode_benchmark(c: &mut Criterion) {
    let device_id = StandardId::new(0x141).unwrap();

    c.bench_function("encode 90 deg", |b| {
        b.iter(|| encode(black_box(90.0), black_box(500), device_id))
    });

    // A full sweep worth of commands, as produced by the default sweep
    c.bench_function("encode 360 step sweep", |b| {
        b.iter(|| {
            for angle in 0..360 {
                black_box(encode(angle as f64, 500, device_id));
            }
        })
    });

    let frame = encode(123.5, 500, device_id);
    c.bench_function("decode", |b| {
        b.iter(|| MotorCommand::from_frame(black_box(&frame)))
    });
}

criterion_group!(benches, encode_benchmark);
criterion_main!(benches);
