use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use boxdetect_image::{Image, ImageSize};
use boxdetect_imgproc::threshold::{adaptive_threshold, otsu_threshold, ThresholdType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn create_test_image(width: usize, height: usize) -> Image<u8, 1> {
    let mut rng = StdRng::seed_from_u64(42);
    let data: Vec<u8> = (0..(width * height)).map(|_| rng.random()).collect();
    let size = ImageSize { width, height };
    Image::new(size, data).unwrap()
}

fn bench_threshold(c: &mut Criterion) {
    let mut group = c.benchmark_group("Threshold");

    let (w, h) = (1920, 1080);
    let src = create_test_image(w, h);

    group.bench_with_input(
        BenchmarkId::new("otsu_inverse", format!("{}x{}", w, h)),
        &src,
        |b, src| {
            let mut dst = Image::from_size_val(src.size(), 0).unwrap();
            b.iter(|| {
                otsu_threshold(src, &mut dst, ThresholdType::BinaryInv, 255).unwrap();
            })
        },
    );

    group.bench_with_input(
        BenchmarkId::new("adaptive", format!("{}x{}", w, h)),
        &src,
        |b, src| {
            let mut dst = Image::from_size_val(src.size(), 0).unwrap();
            b.iter(|| {
                adaptive_threshold(src, &mut dst).unwrap();
            })
        },
    );

    group.finish();
}

criterion_group!(benches, bench_threshold);
criterion_main!(benches);
