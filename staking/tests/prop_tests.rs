use proptest::prelude::*;

use tally_nullables::{NullStakingStore, NullValueLedger};
use tally_staking::{CheckpointLog, StakingConfig, StakingEngine, ValueLedger};
use tally_types::{AccountId, Timestamp};

const WINDOW: u64 = 1_000;
const STAKERS: [&str; 3] = ["alice", "bob", "carol"];

#[derive(Clone, Debug)]
enum Op {
    Stake(usize, u128),
    Unstake(usize, u128),
    AddReward(u128),
    Distribute,
    Claim(usize, u128),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..STAKERS.len(), 1u128..2_000).prop_map(|(i, a)| Op::Stake(i, a)),
        2 => (0..STAKERS.len(), 1u128..2_000).prop_map(|(i, a)| Op::Unstake(i, a)),
        2 => (1u128..5_000).prop_map(Op::AddReward),
        1 => Just(Op::Distribute),
        2 => (0..STAKERS.len(), 1u128..500).prop_map(|(i, a)| Op::Claim(i, a)),
    ]
}

fn engine() -> StakingEngine<NullStakingStore, NullValueLedger> {
    let config = StakingConfig {
        rolling_window_secs: WINDOW,
        min_stake: 500,
        ..Default::default()
    };
    let ledger = NullValueLedger::new(config.custody.clone());
    for who in STAKERS {
        ledger.fund(&AccountId::new(who), u128::from(u32::MAX));
    }
    ledger.fund(&AccountId::new("sponsor"), u128::from(u32::MAX));
    StakingEngine::open(NullStakingStore::new(), ledger, config).unwrap()
}

proptest! {
    /// Checkpoints stay strictly increasing; same-instant writes collapse.
    #[test]
    fn checkpoint_timestamps_strictly_increase(
        steps in prop::collection::vec((0u64..5, 0u128..1_000), 1..60),
    ) {
        let mut log = CheckpointLog::new();
        let mut now = 0u64;
        for (gap, balance) in steps {
            now += gap;
            log.append(Timestamp::new(now), balance).unwrap();
            prop_assert_eq!(log.current_balance(), balance);
        }
        for pair in log.entries().windows(2) {
            prop_assert!(pair[0].at < pair[1].at);
        }
    }

    /// A read between two checkpoints sees the earlier one; before the
    /// first it sees zero.
    #[test]
    fn balance_at_matches_governing_checkpoint(
        steps in prop::collection::vec((1u64..100, 0u128..1_000), 1..40),
        query_offset in 0u64..99,
    ) {
        let mut log = CheckpointLog::new();
        let mut now = 100u64;
        for (gap, balance) in &steps {
            now += gap;
            log.append(Timestamp::new(now), *balance).unwrap();
        }
        prop_assert_eq!(log.balance_at(Timestamp::new(query_offset)), 0);
        for pair in log.entries().windows(2) {
            let gap = pair[1].at.as_secs() - pair[0].at.as_secs();
            let query = pair[0].at.as_secs() + query_offset % gap;
            prop_assert_eq!(log.balance_at(Timestamp::new(query)), pair[0].balance);
        }
    }

    /// Arbitrary operation sequences keep every ledger invariant, keep
    /// custody solvent and never credit more reward than was deposited.
    #[test]
    fn random_operations_preserve_invariants(
        ops in prop::collection::vec((op_strategy(), 0u64..400), 1..80),
    ) {
        let mut engine = engine();
        let admin = AccountId::new("admin");
        let sponsor = AccountId::new("sponsor");
        let mut now = 0u64;

        for (op, gap) in ops {
            now += gap;
            let at = Timestamp::new(now);
            let before = engine.state().summary(None);
            let result = match op {
                Op::Stake(i, amount) => engine.stake(&AccountId::new(STAKERS[i]), amount, at).map(|_| ()),
                Op::Unstake(i, amount) => engine.unstake(&AccountId::new(STAKERS[i]), amount, at).map(|_| ()),
                Op::AddReward(amount) => engine.add_reward(&sponsor, amount),
                Op::Distribute => engine.distribute_reward(&admin, at).map(|report| {
                    assert!(report.distributed <= report.pool);
                    assert_eq!(report.distributed + report.remainder, report.pool);
                }),
                Op::Claim(i, amount) => {
                    let who = AccountId::new(STAKERS[i]);
                    engine.claim_reward(&who, amount, &who).map(|_| ())
                }
            };
            if result.is_err() {
                prop_assert_eq!(engine.state().summary(None), before);
            }

            prop_assert_eq!(engine.state().check_invariants(), vec![]);
            prop_assert!(engine.is_solvent());
            let g = engine.state().globals();
            prop_assert_eq!(
                g.total_distributed + g.total_retired + engine.state().undistributed_reward(),
                g.total_reward
            );
            prop_assert_eq!(
                engine.ledger().custody_balance(),
                engine.state().total_locked() + engine.state().reward_treasury()
            );
        }
    }
}
