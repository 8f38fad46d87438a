// End-to-end settlement scenarios
//
// These tests drive the full liquidity / oracle / betting cycle in-process
// against a manually advanced clock, the way the deployment wires the
// components together.

use peerbet::{
    AccountLedger, Amount, BetError, BettingPool, Clock, LiquidityError, LiquidityPool,
    ManualClock, Oracle, OracleError, SettlementEvent, ValueLedger, UNIT,
};

// ============================================================================
// FIXTURE
// ============================================================================

const MIN_BET: Amount = UNIT / 10;
const MAX_BET: Amount = UNIT;
const DURATION: u64 = 3_600; // 1 hour in seconds
const STANDARD_BET: Amount = UNIT / 2;
const MINIMUM_STAKE: Amount = UNIT / 10;
const STAKING_WINDOW: u64 = 24 * 60 * 60;
const SEED: Amount = 100 * UNIT;

struct Fixture {
    clock: ManualClock,
    ledger: AccountLedger,
    liquidity: LiquidityPool,
    oracle: Oracle,
    betting: BettingPool,
}

/// Deploys all components and funds the standard test accounts.
fn deploy() -> Fixture {
    let mut ledger = AccountLedger::new();
    for account in ["owner", "alice", "bob", "carol", "dave"] {
        ledger.register(account, SEED);
    }
    let liquidity = LiquidityPool::new();
    let betting =
        BettingPool::new().with_liquidity_backing(liquidity.escrow_account().to_string());
    Fixture {
        clock: ManualClock::new(1_700_000_000),
        ledger,
        liquidity,
        oracle: Oracle::new(MINIMUM_STAKE, STAKING_WINDOW),
        betting,
    }
}

// ============================================================================
// LIQUIDITY POOL
// ============================================================================

#[test]
fn should_allow_adding_liquidity() {
    let mut fx = deploy();

    fx.liquidity
        .add_liquidity(&mut fx.ledger, "alice", UNIT)
        .unwrap();

    assert_eq!(fx.liquidity.liquidity_share("alice"), UNIT);
    assert_eq!(fx.liquidity.available_liquidity(), UNIT);
    assert_eq!(
        fx.liquidity.events().last(),
        Some(&SettlementEvent::LiquidityAdded {
            account: "alice".to_string(),
            amount: UNIT,
        })
    );
}

#[test]
fn should_allow_removing_liquidity() {
    let mut fx = deploy();
    fx.liquidity
        .add_liquidity(&mut fx.ledger, "alice", UNIT)
        .unwrap();

    fx.liquidity
        .remove_liquidity(&mut fx.ledger, "alice", UNIT)
        .unwrap();

    assert_eq!(fx.liquidity.liquidity_share("alice"), 0);
    assert_eq!(fx.ledger.balance_of("alice"), SEED);
    assert_eq!(
        fx.liquidity.events().last(),
        Some(&SettlementEvent::LiquidityRemoved {
            account: "alice".to_string(),
            amount: UNIT,
        })
    );
}

#[test]
fn should_prevent_removing_more_than_contributed() {
    let mut fx = deploy();
    fx.liquidity
        .add_liquidity(&mut fx.ledger, "alice", UNIT)
        .unwrap();

    let err = fx
        .liquidity
        .remove_liquidity(&mut fx.ledger, "alice", 2 * UNIT)
        .unwrap_err();

    assert_eq!(
        err,
        LiquidityError::InsufficientShares {
            requested: 2 * UNIT,
            held: UNIT,
        }
    );
}

// ============================================================================
// ORACLE
// ============================================================================

#[test]
fn should_require_minimum_stake() {
    let mut fx = deploy();
    fx.oracle.initialize(fx.clock.now(), 0).unwrap();

    let err = fx
        .oracle
        .stake(&mut fx.ledger, fx.clock.now(), 0, "alice", MINIMUM_STAKE / 2)
        .unwrap_err();

    assert_eq!(
        err,
        OracleError::InsufficientStake {
            payment: MINIMUM_STAKE / 2,
            minimum: MINIMUM_STAKE,
        }
    );
}

#[test]
fn should_handle_correct_staking_process() {
    let mut fx = deploy();
    fx.oracle.initialize(fx.clock.now(), 0).unwrap();

    fx.oracle
        .stake(&mut fx.ledger, fx.clock.now(), 0, "alice", MINIMUM_STAKE)
        .unwrap();

    assert_eq!(
        fx.oracle.events().last(),
        Some(&SettlementEvent::OracleStaked {
            bet_id: 0,
            staker: "alice".to_string(),
            amount: MINIMUM_STAKE,
        })
    );
    assert_eq!(fx.ledger.balance_of("alice"), SEED - MINIMUM_STAKE);
}

#[test]
fn should_prevent_duplicate_staking() {
    let mut fx = deploy();
    fx.oracle.initialize(fx.clock.now(), 0).unwrap();
    fx.oracle
        .stake(&mut fx.ledger, fx.clock.now(), 0, "alice", MINIMUM_STAKE)
        .unwrap();

    let err = fx
        .oracle
        .stake(&mut fx.ledger, fx.clock.now(), 0, "alice", MINIMUM_STAKE)
        .unwrap_err();

    assert_eq!(err, OracleError::AlreadyStaked("alice".to_string()));
}

#[test]
fn should_handle_voting_and_consensus_correctly() {
    let mut fx = deploy();
    fx.oracle.initialize(fx.clock.now(), 0).unwrap();

    // Set up oracles during staking period
    for account in ["alice", "bob", "carol"] {
        fx.oracle
            .stake(&mut fx.ledger, fx.clock.now(), 0, account, MINIMUM_STAKE)
            .unwrap();
    }

    // Fast forward past staking period, then close it explicitly
    fx.clock.advance(STAKING_WINDOW + 1);
    fx.oracle.end_staking_period(fx.clock.now(), 0).unwrap();

    fx.oracle.vote(&mut fx.ledger, 0, "alice", true).unwrap();
    // Second matching vote holds a strict majority of all staked weight and
    // finalizes immediately.
    fx.oracle.vote(&mut fx.ledger, 0, "bob", true).unwrap();

    assert_eq!(
        fx.oracle.events().last(),
        Some(&SettlementEvent::ConsensusReached {
            bet_id: 0,
            outcome: true,
        })
    );
    assert_eq!(fx.oracle.consensus(0), (true, true));

    // The outcome is settled; a late dissent is rejected.
    assert_eq!(
        fx.oracle.vote(&mut fx.ledger, 0, "carol", false),
        Err(OracleError::AlreadyFinalized(0))
    );
}

#[test]
fn should_properly_slash_incorrect_votes() {
    let mut fx = deploy();
    fx.oracle.initialize(fx.clock.now(), 0).unwrap();

    for account in ["alice", "bob", "carol"] {
        fx.oracle
            .stake(&mut fx.ledger, fx.clock.now(), 0, account, MINIMUM_STAKE)
            .unwrap();
    }
    fx.clock.advance(STAKING_WINDOW + 1);
    fx.oracle.end_staking_period(fx.clock.now(), 0).unwrap();

    // carol dissents before the majority lands
    fx.oracle.vote(&mut fx.ledger, 0, "alice", true).unwrap();
    fx.oracle.vote(&mut fx.ledger, 0, "carol", false).unwrap();
    fx.oracle.vote(&mut fx.ledger, 0, "bob", true).unwrap();

    assert_eq!(fx.oracle.consensus(0), (true, true));

    // Dissenter loses the full stake; honest arbiters never take a net loss.
    assert_eq!(fx.ledger.balance_of("carol"), SEED - MINIMUM_STAKE);
    assert_eq!(fx.ledger.balance_of("alice"), SEED + MINIMUM_STAKE / 2);
    assert_eq!(fx.ledger.balance_of("bob"), SEED + MINIMUM_STAKE / 2);
    assert_eq!(fx.ledger.balance_of(fx.oracle.escrow_account()), 0);
}

// ============================================================================
// BETTING POOL - CREATION AND JOINING
// ============================================================================

#[test]
fn should_create_a_bet_correctly() {
    let mut fx = deploy();

    let bet_id = fx
        .betting
        .create_bet(
            &mut fx.ledger,
            fx.clock.now(),
            "alice",
            "Will ETH reach $5000?",
            MIN_BET,
            MAX_BET,
            DURATION,
            STANDARD_BET,
        )
        .unwrap();

    assert_eq!(bet_id, 0);
    let details = fx.betting.bet_details(0).unwrap();
    assert_eq!(details.total_true, STANDARD_BET);
    assert_eq!(details.total_false, 0);
}

#[test]
fn should_allow_taking_positions() {
    let mut fx = deploy();
    fx.betting
        .create_bet(
            &mut fx.ledger,
            fx.clock.now(),
            "alice",
            "Test bet",
            MIN_BET,
            MAX_BET,
            DURATION,
            STANDARD_BET,
        )
        .unwrap();

    fx.betting
        .take_position(&mut fx.ledger, fx.clock.now(), 0, "bob", false, 3 * UNIT / 10)
        .unwrap();

    assert_eq!(fx.betting.bet_details(0).unwrap().total_false, 3 * UNIT / 10);
    assert_eq!(
        fx.betting.events().last(),
        Some(&SettlementEvent::BetPositionTaken {
            bet_id: 0,
            participant: "bob".to_string(),
            side: false,
            amount: 3 * UNIT / 10,
        })
    );
}

// ============================================================================
// BETTING POOL - RESOLUTION AND PAYOUTS
// ============================================================================

#[test]
fn should_execute_complete_betting_cycle_with_correct_payouts() {
    let mut fx = deploy();

    // Create and participate in bet: 1 UNIT true vs 1 UNIT false
    fx.betting
        .create_bet(
            &mut fx.ledger,
            fx.clock.now(),
            "alice",
            "Test bet",
            MIN_BET,
            MAX_BET,
            DURATION,
            UNIT / 2,
        )
        .unwrap();
    fx.betting
        .take_position(&mut fx.ledger, fx.clock.now(), 0, "bob", true, UNIT / 2)
        .unwrap();
    fx.betting
        .take_position(&mut fx.ledger, fx.clock.now(), 0, "carol", false, UNIT)
        .unwrap();

    // Setup oracle consensus for the same bet id
    fx.oracle.initialize(fx.clock.now(), 0).unwrap();
    for account in ["alice", "bob", "carol"] {
        fx.oracle
            .stake(&mut fx.ledger, fx.clock.now(), 0, account, MINIMUM_STAKE)
            .unwrap();
    }

    // Past the staking window (which also ends the betting period)
    fx.clock.advance(STAKING_WINDOW + 1);
    fx.oracle.end_staking_period(fx.clock.now(), 0).unwrap();
    fx.oracle.vote(&mut fx.ledger, 0, "alice", true).unwrap();
    fx.oracle.vote(&mut fx.ledger, 0, "bob", true).unwrap();
    assert_eq!(fx.oracle.consensus(0), (true, true));

    let outcome = fx
        .betting
        .resolve_bet(&mut fx.ledger, &fx.oracle, fx.clock.now(), 0)
        .unwrap();
    assert!(outcome);

    // TRUE side won: alice and bob split carol's UNIT on top of their stakes.
    // carol also lost her oracle stake for never voting.
    assert_eq!(
        fx.ledger.balance_of("alice"),
        SEED + UNIT / 2 + MINIMUM_STAKE / 2
    );
    assert_eq!(
        fx.ledger.balance_of("bob"),
        SEED + UNIT / 2 + MINIMUM_STAKE / 2
    );
    assert_eq!(
        fx.ledger.balance_of("carol"),
        SEED - UNIT - MINIMUM_STAKE
    );
    assert_eq!(fx.ledger.balance_of(fx.betting.escrow_account()), 0);
}

#[test]
fn should_prevent_bet_resolution_before_end_time() {
    let mut fx = deploy();
    fx.betting
        .create_bet(
            &mut fx.ledger,
            fx.clock.now(),
            "alice",
            "Test bet",
            MIN_BET,
            MAX_BET,
            DURATION,
            STANDARD_BET,
        )
        .unwrap();

    let err = fx
        .betting
        .resolve_bet(&mut fx.ledger, &fx.oracle, fx.clock.now(), 0)
        .unwrap_err();

    assert!(matches!(err, BetError::BettingPeriodActive { .. }));
    // No state change: escrow untouched, bet still open.
    assert_eq!(
        fx.ledger.balance_of(fx.betting.escrow_account()),
        STANDARD_BET
    );
    assert!(!fx.betting.bet(0).unwrap().resolved);
}

#[test]
fn should_not_pay_out_twice() {
    let mut fx = deploy();
    fx.betting
        .create_bet(
            &mut fx.ledger,
            fx.clock.now(),
            "alice",
            "Test bet",
            MIN_BET,
            MAX_BET,
            DURATION,
            STANDARD_BET,
        )
        .unwrap();
    fx.betting
        .take_position(&mut fx.ledger, fx.clock.now(), 0, "carol", false, UNIT)
        .unwrap();

    fx.oracle.initialize(fx.clock.now(), 0).unwrap();
    fx.oracle
        .stake(&mut fx.ledger, fx.clock.now(), 0, "dave", MINIMUM_STAKE)
        .unwrap();
    fx.clock.advance(STAKING_WINDOW + 1);
    fx.oracle.end_staking_period(fx.clock.now(), 0).unwrap();
    fx.oracle.vote(&mut fx.ledger, 0, "dave", true).unwrap();

    fx.betting
        .resolve_bet(&mut fx.ledger, &fx.oracle, fx.clock.now(), 0)
        .unwrap();
    let balances_after_first: Vec<Amount> = ["alice", "carol"]
        .iter()
        .map(|a| fx.ledger.balance_of(a))
        .collect();

    let err = fx
        .betting
        .resolve_bet(&mut fx.ledger, &fx.oracle, fx.clock.now(), 0)
        .unwrap_err();

    assert_eq!(err, BetError::AlreadyResolved(0));
    let balances_after_second: Vec<Amount> = ["alice", "carol"]
        .iter()
        .map(|a| fx.ledger.balance_of(a))
        .collect();
    assert_eq!(balances_after_first, balances_after_second);
}

#[test]
fn conservation_holds_across_resolution() {
    let mut fx = deploy();
    // Uneven positions to force integer-division dust.
    fx.betting
        .create_bet(
            &mut fx.ledger,
            fx.clock.now(),
            "alice",
            "Test bet",
            1,
            MAX_BET,
            DURATION,
            UNIT / 3 + 1,
        )
        .unwrap();
    fx.betting
        .take_position(&mut fx.ledger, fx.clock.now(), 0, "bob", true, UNIT / 7 + 1)
        .unwrap();
    fx.betting
        .take_position(&mut fx.ledger, fx.clock.now(), 0, "carol", false, UNIT)
        .unwrap();

    let details = fx.betting.bet_details(0).unwrap();
    let pool_total = details.total_true + details.total_false;
    assert_eq!(
        fx.ledger.balance_of(fx.betting.escrow_account()),
        pool_total
    );

    fx.oracle.initialize(fx.clock.now(), 0).unwrap();
    fx.oracle
        .stake(&mut fx.ledger, fx.clock.now(), 0, "dave", MINIMUM_STAKE)
        .unwrap();
    fx.clock.advance(STAKING_WINDOW + 1);
    fx.oracle.end_staking_period(fx.clock.now(), 0).unwrap();
    fx.oracle.vote(&mut fx.ledger, 0, "dave", true).unwrap();

    let before: Amount = ["alice", "bob"].iter().map(|a| fx.ledger.balance_of(a)).sum();
    fx.betting
        .resolve_bet(&mut fx.ledger, &fx.oracle, fx.clock.now(), 0)
        .unwrap();
    let after: Amount = ["alice", "bob"].iter().map(|a| fx.ledger.balance_of(a)).sum();

    // Paid out plus residual dust equals the escrowed pool exactly.
    let paid_out = after - before;
    let dust = fx.ledger.balance_of(fx.betting.escrow_account());
    assert_eq!(paid_out + dust, pool_total);
    // Dust is bounded below the number of winning participants.
    assert!(dust < 2);
}
