use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use fastkmem::memset::{fill, zero};
use fastkmem::reference::{fill_orig, zero_orig};
use std::time::Duration;

#[derive(Clone)]
struct SetCase {
    label: String,
    len: usize,
    dst_off: usize,
}

fn configure_group_for_len(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    len: usize,
) {
    if len >= 1 << 20 {
        group.sample_size(20);
        group.warm_up_time(Duration::from_millis(300));
        group.measurement_time(Duration::from_millis(900));
    } else {
        group.sample_size(40);
        group.warm_up_time(Duration::from_millis(200));
        group.measurement_time(Duration::from_millis(500));
    }
}

fn fill_benches(c: &mut Criterion) {
    let mut cases = Vec::new();

    let sizes = [
        1usize, 4, 7, 8, 16, 32, 64, 127, 128, 129, 256, 512, 1024, 4096, 65536, 1 << 20,
    ];
    for len in sizes {
        cases.push(SetCase {
            label: format!("size_{len}"),
            len,
            dst_off: 0,
        });
    }
    for len in [129usize, 4096] {
        for dst_off in [1usize, 3, 4, 12, 31] {
            cases.push(SetCase {
                label: format!("align_len{len}_d{dst_off}"),
                len,
                dst_off,
            });
        }
    }

    let mut group = c.benchmark_group("fill");

    for case in &cases {
        let len = case.len;
        let mut dst = vec![0u8; len + 64];
        let dst_ptr = unsafe { dst.as_mut_ptr().add(case.dst_off) };

        configure_group_for_len(&mut group, len);
        group.throughput(Throughput::Bytes(len as u64));

        group.bench_with_input(BenchmarkId::new("core", &case.label), &len, |b, &n| {
            b.iter(|| unsafe {
                core::ptr::write_bytes(black_box(dst_ptr), black_box(0xA5), black_box(n));
                black_box(core::ptr::read_volatile(dst_ptr));
            });
        });

        group.bench_with_input(BenchmarkId::new("orig", &case.label), &len, |b, &n| {
            b.iter(|| unsafe {
                fill_orig(black_box(dst_ptr), black_box(0xA5), black_box(n));
                black_box(core::ptr::read_volatile(dst_ptr));
            });
        });

        group.bench_with_input(BenchmarkId::new("fastkmem", &case.label), &len, |b, &n| {
            b.iter(|| unsafe {
                fill(black_box(dst_ptr), black_box(0xA5), black_box(n));
                black_box(core::ptr::read_volatile(dst_ptr));
            });
        });

        group.bench_with_input(BenchmarkId::new("zero_orig", &case.label), &len, |b, &n| {
            b.iter(|| unsafe {
                zero_orig(black_box(dst_ptr), black_box(n));
                black_box(core::ptr::read_volatile(dst_ptr));
            });
        });

        group.bench_with_input(BenchmarkId::new("zero", &case.label), &len, |b, &n| {
            b.iter(|| unsafe {
                zero(black_box(dst_ptr), black_box(n));
                black_box(core::ptr::read_volatile(dst_ptr));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, fill_benches);
criterion_main!(benches);
