use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lockfree_rs::{LockFreeOps, LockFreeQueue, LockFreeRingBuffer, LockFreeStack, PoolConfig};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread;

// Ring buffer capacity for benchmarks
const CAPACITY: usize = 1024;
// Number of operations per benchmark
const OPS_PER_BENCH: usize = 1_000_000;

/// Runs `threads` producers against `threads` consumers; each side moves
/// `OPS_PER_BENCH` values in total.
fn run_pairs<Q>(queue: Q, threads: usize)
where
    Q: LockFreeOps<u32> + Send + Sync + 'static,
{
    let queue = Arc::new(queue);
    let barrier = Arc::new(Barrier::new(threads * 2));
    let per_thread = OPS_PER_BENCH / threads;

    let mut handles = Vec::with_capacity(threads * 2);

    // Producers
    for _ in 0..threads {
        let q = queue.clone();
        let b = barrier.clone();
        handles.push(thread::spawn(move || {
            b.wait();
            for i in 0..per_thread {
                while !q.try_push(black_box(i as u32)) {
                    std::hint::spin_loop();
                }
            }
        }));
    }

    // Consumers
    for _ in 0..threads {
        let q = queue.clone();
        let b = barrier.clone();
        handles.push(thread::spawn(move || {
            b.wait();
            let mut received = 0;
            while received < per_thread {
                if let Some(value) = q.try_pop() {
                    black_box(value);
                    received += 1;
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Same workload over a standard channel, consumers sharing the receiver.
fn run_mpsc_pairs(threads: usize) {
    let (tx, rx) = mpsc::channel::<u32>();
    let rx = Arc::new(Mutex::new(rx));
    let barrier = Arc::new(Barrier::new(threads * 2));
    let per_thread = OPS_PER_BENCH / threads;

    let mut handles = Vec::with_capacity(threads * 2);

    for _ in 0..threads {
        let tx = tx.clone();
        let b = barrier.clone();
        handles.push(thread::spawn(move || {
            b.wait();
            for i in 0..per_thread {
                tx.send(black_box(i as u32)).unwrap();
            }
        }));
    }

    for _ in 0..threads {
        let rx = rx.clone();
        let b = barrier.clone();
        handles.push(thread::spawn(move || {
            b.wait();
            for _ in 0..per_thread {
                let value = rx.lock().unwrap().recv().unwrap();
                black_box(value);
            }
        }));
    }

    drop(tx);
    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    group.throughput(Throughput::Elements(OPS_PER_BENCH as u64));
    group.sample_size(10);

    // Test different thread counts
    for threads in [1, 2, 4].iter() {
        // Skip configurations that would require more than available CPUs
        if *threads * 2 > num_cpus::get() {
            continue;
        }

        group.bench_with_input(
            BenchmarkId::new("LockFreeQueue", threads),
            threads,
            |b, &threads| b.iter(|| run_pairs(LockFreeQueue::<u32>::new(), threads)),
        );

        group.bench_with_input(
            BenchmarkId::new("LockFreeQueue/pooled", threads),
            threads,
            |b, &threads| {
                b.iter(|| {
                    let queue = LockFreeQueue::<u32>::with_pool(PoolConfig::default()).unwrap();
                    run_pairs(queue, threads)
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("LockFreeStack", threads),
            threads,
            |b, &threads| b.iter(|| run_pairs(LockFreeStack::<u32>::new(), threads)),
        );

        group.bench_with_input(
            BenchmarkId::new("LockFreeRingBuffer", threads),
            threads,
            |b, &threads| b.iter(|| run_pairs(LockFreeRingBuffer::<u32>::new(CAPACITY), threads)),
        );

        group.bench_with_input(
            BenchmarkId::new("std::sync::mpsc", threads),
            threads,
            |b, &threads| b.iter(|| run_mpsc_pairs(threads)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_throughput);
criterion_main!(benches);
