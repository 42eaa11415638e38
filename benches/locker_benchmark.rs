/*!
 * Entity Locker Benchmarks
 *
 * Compare map and hashing strategies, eager and lazy holders, and fair
 * and unfair locks
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use entity_locker::{
    EntityLocker, HashingConfig, HashingEntityLocker, HolderPolicy, MapConfig, MapEntityLocker,
    ReentrantLock, StripedLockMap,
};
use std::sync::Arc;
use std::thread;

fn lock_unlock_cycle<L: EntityLocker<u64>>(locker: &L, id: u64) {
    locker.lock(&id).unwrap();
    locker.unlock(&id).unwrap();
}

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_lock_unlock");

    let map = MapEntityLocker::<u64>::new();
    group.bench_function("map", |b| b.iter(|| lock_unlock_cycle(&map, black_box(7))));

    let striped = MapEntityLocker::<u64, _>::with_map(StripedLockMap::<u64>::new(16).unwrap());
    group.bench_function("map_striped", |b| {
        b.iter(|| lock_unlock_cycle(&striped, black_box(7)))
    });

    for holder in [HolderPolicy::Eager, HolderPolicy::Lazy] {
        let hashing = HashingEntityLocker::<u64>::with_config(
            HashingConfig::new(1024, 16).with_holder(holder),
        )
        .unwrap();
        group.bench_with_input(
            BenchmarkId::new("hashing", format!("{:?}", holder)),
            &hashing,
            |b, hashing| b.iter(|| lock_unlock_cycle(hashing, black_box(7))),
        );
    }

    group.finish();
}

fn bench_reentry(c: &mut Criterion) {
    let mut group = c.benchmark_group("reentry");

    for fair in [true, false] {
        let lock = ReentrantLock::new(fair);
        lock.lock_interruptibly().unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(if fair { "fair" } else { "unfair" }),
            &lock,
            |b, lock| {
                b.iter(|| {
                    lock.lock_interruptibly().unwrap();
                    lock.unlock().unwrap();
                });
            },
        );

        lock.unlock().unwrap();
    }

    group.finish();
}

fn run_contended<L: EntityLocker<u64> + 'static>(locker: &Arc<L>, threads: u64, keys: u64) {
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let locker = locker.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    lock_unlock_cycle(&*locker, (t + i) % keys);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_contended_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_keys");

    for keys in [1u64, 16, 256] {
        let map = Arc::new(MapEntityLocker::<u64>::new());
        group.bench_with_input(BenchmarkId::new("map", keys), &keys, |b, &keys| {
            b.iter(|| run_contended(&map, 4, keys))
        });

        let fair_map = Arc::new(MapEntityLocker::<u64>::with_config(MapConfig::fair()));
        group.bench_with_input(BenchmarkId::new("map_fair", keys), &keys, |b, &keys| {
            b.iter(|| run_contended(&fair_map, 4, keys))
        });

        let hashing = Arc::new(HashingEntityLocker::<u64>::new(256, 16).unwrap());
        group.bench_with_input(BenchmarkId::new("hashing", keys), &keys, |b, &keys| {
            b.iter(|| run_contended(&hashing, 4, keys))
        });
    }

    group.finish();
}

fn bench_lazy_first_touch(c: &mut Criterion) {
    c.bench_function("lazy_first_touch", |b| {
        b.iter(|| {
            let locker = HashingEntityLocker::<u64>::with_config(
                HashingConfig::new(4096, 1).with_holder(HolderPolicy::Lazy),
            )
            .unwrap();
            lock_unlock_cycle(&locker, black_box(42));
        });
    });
}

criterion_group!(
    benches,
    bench_uncontended,
    bench_reentry,
    bench_contended_keys,
    bench_lazy_first_touch
);

criterion_main!(benches);
