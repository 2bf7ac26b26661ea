// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Benchmarks for the stock reservation engine.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded reserve / commit / release
//! - Availability reads against growing reservation books
//! - Multi-threaded reservations on one hot product and on many products
//! - Sweeping large numbers of elapsed holds

use chrono::Duration;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use stock_reservation_rs::{
    EngineConfig, LoggingAlertDispatcher, ManualClock, NewStock, OrderId, ProductId, StockEngine,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn engine_with_products(products: u32, quantity: i64) -> StockEngine {
    let engine = StockEngine::new();
    for product in 1..=products {
        engine
            .create(NewStock::new(ProductId(product), quantity, 10, quantity))
            .unwrap();
    }
    engine
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_reserve(c: &mut Criterion) {
    c.bench_function("single_reserve", |b| {
        b.iter(|| {
            let engine = engine_with_products(1, 100);
            engine
                .reserve(ProductId(1), black_box(4), OrderId(1))
                .unwrap();
        })
    });
}

fn bench_reserve_commit(c: &mut Criterion) {
    c.bench_function("reserve_commit", |b| {
        b.iter(|| {
            let engine = engine_with_products(1, 100);
            let hold = engine.reserve(ProductId(1), 4, OrderId(1)).unwrap();
            engine.commit(black_box(hold.id)).unwrap();
        })
    });
}

fn bench_reserve_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("reserve_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = engine_with_products(1, count as i64);
                for order in 0..count {
                    engine.reserve(ProductId(1), 1, OrderId(order)).unwrap();
                }
            })
        });
    }

    group.finish();
}

fn bench_lifecycle_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle_mix");

    for count in [100, 1_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = engine_with_products(1, count as i64 * 2);
                for order in 0..count {
                    let hold = engine.reserve(ProductId(1), 1, OrderId(order)).unwrap();
                    if order % 2 == 0 {
                        engine.commit(hold.id).unwrap();
                    } else {
                        engine.release(hold.id).unwrap();
                    }
                }
            })
        });
    }

    group.finish();
}

// =============================================================================
// Read Benchmarks
// =============================================================================

fn bench_availability_by_book_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("availability_by_book_size");

    // Reads sum every live hold, so cost grows with the book
    for holds in [10, 100, 1_000].iter() {
        let engine = engine_with_products(1, *holds as i64 + 10);
        for order in 0..*holds {
            engine.reserve(ProductId(1), 1, OrderId(order)).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(holds), holds, |b, _| {
            b.iter(|| black_box(engine.check_availability(ProductId(1), 5).unwrap()))
        });
    }

    group.finish();
}

fn bench_summaries(c: &mut Criterion) {
    let engine = engine_with_products(1_000, 100);
    c.bench_function("summaries_1000_products", |b| {
        b.iter(|| black_box(engine.summaries()))
    });
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_reserve_hot_product(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_reserve_hot_product");

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = Arc::new(engine_with_products(1, count as i64));
                (0..count).into_par_iter().for_each(|order| {
                    engine.reserve(ProductId(1), 1, OrderId(order)).unwrap();
                });
            })
        });
    }

    group.finish();
}

fn bench_parallel_reserve_many_products(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_reserve_many_products");
    const PRODUCTS: u32 = 100;

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = Arc::new(engine_with_products(PRODUCTS, count as i64));
                (0..count).into_par_iter().for_each(|order| {
                    let product = ProductId(order % PRODUCTS + 1);
                    engine.reserve(product, 1, OrderId(order)).unwrap();
                });
            })
        });
    }

    group.finish();
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");

    // From every thread on one product to every thread on its own product
    for products in [1u32, 4, 16, 64].iter() {
        group.bench_with_input(
            BenchmarkId::new("products", products),
            products,
            |b, &products| {
                let order_counter = AtomicU32::new(0);
                b.iter(|| {
                    let engine = engine_with_products(products, 1_000_000);
                    (0..1_000u32).into_par_iter().for_each(|_| {
                        let order = order_counter.fetch_add(1, Ordering::Relaxed);
                        let product = ProductId(order % products + 1);
                        let hold = engine.reserve(product, 1, OrderId(order)).unwrap();
                        engine.commit(hold.id).unwrap();
                    });
                })
            },
        );
    }

    group.finish();
}

// =============================================================================
// Sweep Benchmarks
// =============================================================================

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    for holds in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*holds as u64));
        group.bench_with_input(BenchmarkId::from_parameter(holds), holds, |b, &holds| {
            b.iter_with_setup(
                || {
                    let clock = Arc::new(ManualClock::default());
                    let engine = StockEngine::with_parts(
                        EngineConfig::default(),
                        clock.clone(),
                        Arc::new(LoggingAlertDispatcher),
                    )
                    .unwrap();
                    engine
                        .create(NewStock::new(ProductId(1), holds as i64, 10, holds as i64))
                        .unwrap();
                    for order in 0..holds {
                        engine.reserve(ProductId(1), 1, OrderId(order)).unwrap();
                    }
                    clock.advance(Duration::hours(25));
                    engine
                },
                |engine| {
                    assert_eq!(engine.sweep(None).expired, holds as usize);
                },
            )
        });
    }

    group.finish();
}

criterion_group!(
    single_threaded,
    bench_single_reserve,
    bench_reserve_commit,
    bench_reserve_throughput,
    bench_lifecycle_mix,
);

criterion_group!(reads, bench_availability_by_book_size, bench_summaries,);

criterion_group!(
    multi_threaded,
    bench_parallel_reserve_hot_product,
    bench_parallel_reserve_many_products,
    bench_contention,
);

criterion_group!(sweeps, bench_sweep,);

criterion_main!(single_threaded, reads, multi_threaded, sweeps);
