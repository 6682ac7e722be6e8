use basalt_admission::AdmissionQueue;
use basalt_perf::{bench_limits, bench_runtime};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

/// Submit-to-result for a task that completes on its first poll.
fn bench_execute_round_trip(c: &mut Criterion) {
    let rt = bench_runtime();
    let queue = AdmissionQueue::with_runtime(bench_limits(8, 1024), rt.handle().clone())
        .expect("failed to build queue");

    let mut group = c.benchmark_group("admission");
    group.throughput(Throughput::Elements(1));

    group.bench_function("execute_round_trip", |b| {
        b.iter(|| {
            rt.block_on(async {
                let handle = queue
                    .execute(|| async { Ok::<_, ()>(black_box(1u64)) })
                    .expect("queue should have room");
                black_box(handle.await)
            })
        });
    });

    group.finish();
}

/// A burst larger than the slot count, so most tasks pass through the wait list.
fn bench_burst_drain(c: &mut Criterion) {
    let rt = bench_runtime();
    let queue = AdmissionQueue::with_runtime(bench_limits(4, 1024), rt.handle().clone())
        .expect("failed to build queue");

    let mut group = c.benchmark_group("admission");

    for &burst in &[64usize, 512] {
        group.throughput(Throughput::Elements(burst as u64));
        group.bench_function(format!("burst_{burst}"), |b| {
            b.iter(|| {
                rt.block_on(async {
                    for i in 0..burst {
                        let _detached = queue
                            .execute(move || async move { Ok::<_, ()>(black_box(i)) })
                            .expect("queue should have room");
                    }
                    queue.drain().await;
                })
            });
        });
    }

    group.finish();
}

/// Cost of the synchronous rejection path.
fn bench_reject(c: &mut Criterion) {
    let rt = bench_runtime();
    let queue = AdmissionQueue::with_runtime(bench_limits(1, 1), rt.handle().clone())
        .expect("failed to build queue");

    // Occupy the only slot and the only waiting place with tasks that never finish
    let _running = queue
        .execute(|| std::future::pending::<Result<(), ()>>())
        .expect("slot free");
    let _waiting = queue
        .execute(|| std::future::pending::<Result<(), ()>>())
        .expect("wait list free");

    let mut group = c.benchmark_group("admission");
    group.throughput(Throughput::Elements(1));

    group.bench_function("reject_when_full", |b| {
        b.iter(|| black_box(queue.execute(|| async { Ok::<_, ()>(()) }).is_err()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_execute_round_trip,
    bench_burst_drain,
    bench_reject,
);
criterion_main!(benches);
