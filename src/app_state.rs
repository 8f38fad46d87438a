// Application state - deployment wiring
//
// The three settlement components are instantiated once and linked here:
// the oracle gets its configured minimum stake, the betting pool gets the
// liquidity pool's escrow handle. All mutations serialize through one lock,
// which gives every per-record operation a total order; the one-way phase
// flags inside the components keep correctness even without it.

use std::sync::{Arc, Mutex};
use tracing::info;

use crate::clock::{Clock, SystemClock, Timestamp};
use crate::config::EngineConfig;
use crate::events::SettlementEvent;
use crate::ledger::AccountLedger;
use crate::settlement::{BettingPool, LiquidityPool, Oracle};

pub type SharedState = Arc<Mutex<AppState>>;

pub struct AppState {
    pub config: EngineConfig,
    pub clock: Box<dyn Clock>,
    pub ledger: AccountLedger,
    pub liquidity: LiquidityPool,
    pub oracle: Oracle,
    pub betting: BettingPool,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Box<dyn Clock>) -> Self {
        let liquidity = LiquidityPool::new();
        let oracle = Oracle::new(config.min_stake, config.staking_window_secs);
        let betting =
            BettingPool::new().with_liquidity_backing(liquidity.escrow_account().to_string());

        info!(
            min_stake = config.min_stake,
            staking_window_secs = config.staking_window_secs,
            "settlement engine initialized"
        );

        Self {
            config,
            clock,
            ledger: AccountLedger::new(),
            liquidity,
            oracle,
            betting,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Merged audit trail across all three components.
    pub fn all_events(&self) -> Vec<SettlementEvent> {
        let mut events: Vec<SettlementEvent> = Vec::new();
        events.extend_from_slice(self.liquidity.events());
        events.extend_from_slice(self.oracle.events());
        events.extend_from_slice(self.betting.events());
        events
    }
}
