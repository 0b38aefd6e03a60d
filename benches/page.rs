use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use fastkmem::page::{PAGE_SIZE, Page, copy_page};
use fastkmem::reference::copy_page_orig;

fn page_benches(c: &mut Criterion) {
    let mut src = Box::new(Page::zeroed());
    for (i, byte) in src.0.iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
    let mut dst = Box::new(Page::zeroed());
    let src_ptr = src.0.as_ptr();
    let dst_ptr = dst.0.as_mut_ptr();

    let mut group = c.benchmark_group("copy_page");
    group.throughput(Throughput::Bytes(PAGE_SIZE as u64));

    group.bench_function("core", |b| {
        b.iter(|| unsafe {
            core::ptr::copy_nonoverlapping(black_box(src_ptr), black_box(dst_ptr), PAGE_SIZE);
            black_box(core::ptr::read_volatile(dst_ptr));
        });
    });

    group.bench_function("orig", |b| {
        b.iter(|| unsafe {
            copy_page_orig(black_box(dst_ptr), black_box(src_ptr));
            black_box(core::ptr::read_volatile(dst_ptr));
        });
    });

    group.bench_function("fastkmem", |b| {
        b.iter(|| unsafe {
            copy_page(black_box(dst_ptr), black_box(src_ptr));
            black_box(core::ptr::read_volatile(dst_ptr));
        });
    });

    group.finish();
}

criterion_group!(benches, page_benches);
criterion_main!(benches);
