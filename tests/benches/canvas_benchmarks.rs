//! # Pixel Canvas Benchmarks
//!
//! Hot paths of a pixel write: the ledger debit and the canvas commit.
//!
//! ## Usage
//!
//! ```bash
//! cargo bench --package pc-tests --bench canvas_benchmarks
//! cargo bench --package pc-tests --bench canvas_benchmarks -- ledger
//! ```

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pc_01_canvas_store::{CanvasConfig, CanvasStoreApi, CanvasStoreService, CommitRequest};
use pc_02_credit_ledger::{CreditLedgerApi, CreditLedgerService};
use rand::Rng;
use shared_bus::InMemoryEventBus;
use shared_types::{
    Color, Coord, Identity, InMemoryKVStore, SystemTimeSource, TimeSource, TransactionId, WriteId,
};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("tokio runtime")
}

fn clock() -> Arc<dyn TimeSource> {
    Arc::new(SystemTimeSource)
}

fn bench_canvas_commit(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("canvas/commit");
    group.throughput(Throughput::Elements(1));

    for side in [100u32, 1000] {
        let canvas = CanvasStoreService::new(
            &CanvasConfig::for_testing(side, side),
            Arc::new(InMemoryKVStore::new()),
            Arc::new(InMemoryEventBus::new()),
            clock(),
        );
        let owner = Identity::new("kaspa:bench").expect("identity");
        let mut rng = rand::thread_rng();

        group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, &side| {
            b.iter(|| {
                let request = CommitRequest {
                    coord: Coord::new(rng.gen_range(0..side), rng.gen_range(0..side)),
                    color: Color::from_rgb(rng.gen(), rng.gen(), rng.gen()),
                    owner: owner.clone(),
                    write_id: WriteId::generate(),
                };
                black_box(rt.block_on(canvas.commit(request)).expect("commit"))
            });
        });
    }
    group.finish();
}

fn bench_canvas_snapshot(c: &mut Criterion) {
    let rt = runtime();
    let canvas = CanvasStoreService::new(
        &CanvasConfig::for_testing(1000, 1000),
        Arc::new(InMemoryKVStore::new()),
        Arc::new(InMemoryEventBus::new()),
        clock(),
    );
    let owner = Identity::new("kaspa:bench").expect("identity");
    rt.block_on(async {
        for i in 0..10_000u32 {
            canvas
                .commit(CommitRequest {
                    coord: Coord::new(i % 1000, i / 1000),
                    color: Color::WHITE,
                    owner: owner.clone(),
                    write_id: WriteId::generate(),
                })
                .await
                .expect("seed commit");
        }
    });

    c.bench_function("canvas/snapshot/10k_cells", |b| {
        b.iter(|| black_box(canvas.snapshot()))
    });
}

fn bench_ledger_debit(c: &mut Criterion) {
    let rt = runtime();
    let ledger = CreditLedgerService::new(
        Arc::new(InMemoryKVStore::new()),
        Arc::new(InMemoryEventBus::new()),
        clock(),
    );

    let wallets: Vec<Identity> = (0..64)
        .map(|i| Identity::new(format!("kaspa:wallet-{i}")).expect("identity"))
        .collect();
    rt.block_on(async {
        for (i, wallet) in wallets.iter().enumerate() {
            let tx = TransactionId::parse(&format!("fund-{i}")).expect("tx id");
            ledger
                .credit(wallet, &tx, u64::MAX / 2)
                .await
                .expect("funding");
        }
    });

    let mut group = c.benchmark_group("ledger");
    group.throughput(Throughput::Elements(1));
    let mut next = 0usize;
    group.bench_function("try_debit", |b| {
        b.iter(|| {
            next = (next + 1) % wallets.len();
            black_box(ledger.try_debit(&wallets[next], 1).expect("debit"))
        })
    });
    group.bench_function("balance_of", |b| {
        b.iter(|| black_box(ledger.balance_of(&wallets[0])))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_canvas_commit,
    bench_canvas_snapshot,
    bench_ledger_debit
);
criterion_main!(benches);
