//! Benchmark for the correlation kernels across search radii.
//!
//! Usage:
//!   cargo bench --bench corr_volume

use burn::tensor::{Distribution, Tensor};
use corrvol_core::GpuBackend;
use corrvol_kernels::{corr_backward, corr_forward};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

type B = GpuBackend;

fn device() -> <B as burn::prelude::Backend>::Device {
    Default::default()
}

/// Force async operations to complete.
fn sync<const D: usize>(tensor: Tensor<B, D>) {
    let _ = tensor.into_data();
}

fn benches(c: &mut Criterion) {
    let device = device();
    let (batch, height, width, channels) = (1, 64, 96, 128);

    let fmap1 = Tensor::<B, 4>::random(
        [batch, height, width, channels],
        Distribution::Normal(0.0, 1.0),
        &device,
    );
    let fmap2 = Tensor::<B, 4>::random(
        [batch, height, width, channels],
        Distribution::Normal(0.0, 1.0),
        &device,
    );
    let coords = Tensor::<B, 5>::random(
        [batch, 1, height, width, 2],
        Distribution::Uniform(0.0, width as f64),
        &device,
    );

    let mut group = c.benchmark_group("corr_volume");
    group.throughput(Throughput::Elements((batch * height * width * channels) as u64));

    for radius in [1, 3, 4] {
        group.bench_with_input(BenchmarkId::new("forward", radius), &radius, |b, &r| {
            b.iter(|| {
                sync(corr_forward(
                    fmap1.clone(),
                    fmap2.clone(),
                    coords.clone(),
                    r,
                ));
            });
        });

        let volume = corr_forward(fmap1.clone(), fmap2.clone(), coords.clone(), radius);
        group.bench_with_input(BenchmarkId::new("backward", radius), &radius, |b, &r| {
            b.iter(|| {
                let (grad1, _, _) = corr_backward(
                    fmap1.clone(),
                    fmap2.clone(),
                    coords.clone(),
                    volume.clone(),
                    r,
                );
                sync(grad1);
            });
        });
    }

    group.finish();
}

criterion_group!(corr_volume, benches);
criterion_main!(corr_volume);
