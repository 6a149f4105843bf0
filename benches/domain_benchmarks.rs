use criterion::{Criterion, criterion_group, criterion_main};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sweep_service::app::planner::build_sweep_transaction;
use solana_sweep_service::app::wire::encode_transaction;
use solana_sweep_service::domain::{PlanSweepRequest, ReservePolicy};
use std::hint::black_box;
use validator::Validate;

fn bench_validation(c: &mut Criterion) {
    let request = PlanSweepRequest::new("HvwC9QSAzwEXkUkwqNNGhfNHoVqXJYfPvPZfQvJmHWcF");

    c.bench_function("validate_plan_request", |b| {
        b.iter(|| {
            let _ = black_box(&request).validate();
        })
    });
}

fn bench_reserve_math(c: &mut Criterion) {
    let policy = ReservePolicy::default();

    c.bench_function("transfer_amount", |b| {
        b.iter(|| black_box(&policy).transfer_amount(black_box(1_000_000_000)))
    });
}

fn bench_build_transaction(c: &mut Criterion) {
    let source = Pubkey::new_unique();
    let destination = Pubkey::new_unique();

    c.bench_function("build_and_encode_sweep_transaction", |b| {
        b.iter(|| {
            let tx = build_sweep_transaction(
                black_box(&source),
                black_box(&destination),
                969_015_450,
                Hash::new_unique(),
            );
            encode_transaction(&tx)
        })
    });
}

criterion_group!(
    benches,
    bench_validation,
    bench_reserve_math,
    bench_build_transaction
);
criterion_main!(benches);
