// Producer/consumer throughput for the blocking queues. Threads line up on a
// barrier so every producer and consumer starts at the same time.
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use handoff_queue::{BlockingQueue, HandoffQueue};

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const ITEMS_PER_PRODUCER_TARGET: usize = 100_000;
const THREAD_PAIRS_TO_TEST: &[usize] = &[1, 2, 4, 8];

fn run_pairs<Q>(queue: Arc<Q>, pairs: usize, items_per_producer: usize) -> Duration
where
    Q: BlockingQueue<usize>,
    Q::PushError: std::fmt::Debug,
    Q::PopError: std::fmt::Debug,
{
    let barrier = Arc::new(Barrier::new(pairs * 2 + 1));
    let mut handles = Vec::with_capacity(pairs * 2);

    for p in 0..pairs {
        let queue = Arc::clone(&queue);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..items_per_producer {
                queue.push(p * items_per_producer + i).unwrap();
            }
        }));
    }

    for _ in 0..pairs {
        let queue = Arc::clone(&queue);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..items_per_producer {
                std::hint::black_box(queue.pop().unwrap());
            }
        }));
    }

    barrier.wait();
    let start = Instant::now();
    for h in handles {
        h.join().unwrap();
    }
    let elapsed = start.elapsed();
    assert!(queue.is_empty(), "queue not drained after run");
    elapsed
}

fn bench_handoff_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("handoff_queue_mpmc");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    for &pairs in THREAD_PAIRS_TO_TEST {
        let items = ITEMS_PER_PRODUCER_TARGET / pairs;

        group.bench_with_input(BenchmarkId::new("new", pairs), &pairs, |b, &pairs| {
            b.iter_custom(|iters| {
                (0..iters)
                    .map(|_| run_pairs(Arc::new(HandoffQueue::new()), pairs, items))
                    .sum()
            })
        });

        group.bench_with_input(
            BenchmarkId::new("with_capacity", pairs),
            &pairs,
            |b, &pairs| {
                b.iter_custom(|iters| {
                    (0..iters)
                        .map(|_| {
                            let queue = HandoffQueue::with_capacity(pairs * items, pairs);
                            run_pairs(Arc::new(queue), pairs, items)
                        })
                        .sum()
                })
            },
        );
    }
    group.finish();
}

// The producer waits for the consumer to park, so items mostly take the
// direct hand-off path rather than the buffer.
fn bench_parked_hand_off(c: &mut Criterion) {
    c.bench_function("handoff_queue_parked_consumer", |b| {
        b.iter_custom(|iters| {
            let queue = Arc::new(HandoffQueue::<u64>::new());
            let consumer = {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for _ in 0..iters {
                        std::hint::black_box(queue.dequeue().unwrap());
                    }
                })
            };
            let start = Instant::now();
            for i in 0..iters {
                while queue.waiting() == 0 {
                    std::hint::spin_loop();
                }
                queue.enqueue(i).unwrap();
            }
            consumer.join().unwrap();
            start.elapsed()
        })
    });
}

criterion_group!(benches, bench_handoff_queue, bench_parked_hand_off);
criterion_main!(benches);
