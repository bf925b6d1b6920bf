use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tally_nullables::{NullStakingStore, NullValueLedger};
use tally_staking::account::StakerAccount;
use tally_staking::{windowed_average, HistoryAnchor, StakingConfig, StakingEngine};
use tally_types::{AccountId, Timestamp};

const WINDOW: u64 = 86_400;

fn account_with_checkpoints(n: u64) -> StakerAccount {
    let mut account = StakerAccount::open(AccountId::new("bench"), Timestamp::new(0));
    let step = (2 * WINDOW / n.max(1)).max(1);
    for i in 0..n {
        account
            .set_balance(500 + u128::from(i % 7) * 100, Timestamp::new(i * step), 500)
            .unwrap();
    }
    account
}

fn bench_windowed_average(c: &mut Criterion) {
    let mut group = c.benchmark_group("windowed_average");
    let now = Timestamp::new(2 * WINDOW);

    for checkpoints in [1, 10, 100, 1_000, 10_000] {
        let account = account_with_checkpoints(checkpoints);
        group.bench_with_input(
            BenchmarkId::new("first_checkpoint", checkpoints),
            &checkpoints,
            |b, _| {
                b.iter(|| {
                    black_box(windowed_average(
                        black_box(&account),
                        black_box(now),
                        WINDOW,
                        HistoryAnchor::FirstCheckpoint,
                    ))
                });
            },
        );
    }

    group.finish();
}

fn bench_distribution(c: &mut Criterion) {
    let mut group = c.benchmark_group("distribute_reward");
    group.sample_size(20);

    for accounts in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::new("accounts", accounts), &accounts, |b, &n| {
            b.iter_batched(
                || {
                    let config = StakingConfig {
                        rolling_window_secs: WINDOW,
                        min_stake: 500,
                        ..Default::default()
                    };
                    let ledger = NullValueLedger::new(config.custody.clone());
                    let mut engine = StakingEngine::open(NullStakingStore::new(), ledger, config).unwrap();
                    for i in 0..n {
                        let id = AccountId::new(format!("staker-{i}"));
                        engine.ledger().fund(&id, 10_000);
                        engine.stake(&id, 500 + i as u128, Timestamp::new(i as u64)).unwrap();
                    }
                    let sponsor = AccountId::new("sponsor");
                    engine.ledger().fund(&sponsor, 1_000_000);
                    engine.add_reward(&sponsor, 1_000_000).unwrap();
                    engine
                },
                |mut engine| {
                    black_box(
                        engine
                            .distribute_reward(&AccountId::new("admin"), Timestamp::new(2 * WINDOW))
                            .unwrap(),
                    )
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_windowed_average, bench_distribution);
criterion_main!(benches);
