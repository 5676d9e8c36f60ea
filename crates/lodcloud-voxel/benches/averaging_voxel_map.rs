use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lodcloud_core::{ColorRgb, Sample};
use lodcloud_voxel::AveragingVoxelMap;

fn samples(count: usize) -> Vec<Sample> {
    (0..count)
        .map(|i| {
            let i = i as f64;
            Sample::unit(
                glam::DVec3::new(i * 0.37, i * 0.11, i * 0.73),
                ColorRgb::new((i as u8).wrapping_mul(7), 128, 64),
            )
        })
        .collect()
}

fn bench_add_samples(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_samples");
    for &count in &[1_000usize, 10_000, 100_000] {
        let input = samples(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |b, input| {
            b.iter(|| {
                let mut map = AveragingVoxelMap::new(1.0);
                map.add_samples(black_box(input)).unwrap();
                black_box(map.len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add_samples);
criterion_main!(benches);
