use basalt_metrics::MetricsTracker;
use basalt_perf::full_ring;
use basalt_ring::{BoundedQueue, RingBuffer};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;

fn bench_push_overwrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    let mut ring = full_ring(1000);
    let mut next = 0u64;
    group.bench_function("push (overwrite)", |b| {
        b.iter(|| {
            next += 1;
            black_box(ring.push(black_box(next)))
        });
    });

    group.finish();
}

fn bench_push_shift(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    let mut ring = RingBuffer::new(1024).expect("valid bound");
    group.bench_function("push_shift", |b| {
        b.iter(|| {
            ring.push(black_box(7u64));
            black_box(ring.shift())
        });
    });

    group.finish();
}

fn bench_iteration_bounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_iter");

    // Non power-of-two bounds exercise the gap between bound and capacity
    for &bound in &[100usize, 1000, 5000, 16384] {
        let ring = full_ring(bound);
        group.throughput(Throughput::Elements(bound as u64));
        group.bench_function(format!("sum_bound_{bound}"), |b| {
            b.iter(|| black_box(ring.iter().sum::<u64>()));
        });
    }

    group.finish();
}

fn bench_try_enqueue_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounded_queue");
    group.throughput(Throughput::Elements(1));

    let mut queue = BoundedQueue::new(64).expect("valid bound");
    queue.extend(0..64u64);
    group.bench_function("try_enqueue (full)", |b| {
        b.iter(|| black_box(queue.try_enqueue(black_box(1)).is_err()));
    });

    group.finish();
}

fn bench_metrics_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    group.throughput(Throughput::Elements(1));

    let mut tracker = MetricsTracker::new(100).expect("valid history");
    let sample = Duration::from_micros(250);
    group.bench_function("record_and_average", |b| {
        b.iter(|| {
            tracker.record_processing(black_box(sample));
            black_box(tracker.average_processing_time())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_push_overwrite,
    bench_push_shift,
    bench_iteration_bounds,
    bench_try_enqueue_full,
    bench_metrics_window,
);
criterion_main!(benches);
