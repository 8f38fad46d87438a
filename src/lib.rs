/// peerbet - Peer-Staked Prediction-Market Settlement Engine
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod clock;
pub mod config;
pub mod events;
pub mod ledger;
pub mod ledger_rpc;
pub mod settlement;

// Re-export the settlement core
pub use settlement::{
    Bet, BetDetails, BetError, BetId, BettingPool, ConsensusSource, LiquidityError, LiquidityPool,
    Oracle, OracleError, OraclePhase, OracleState, Position,
};

pub use app_state::AppState;
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::EngineConfig;
pub use events::SettlementEvent;
pub use ledger::{
    escrow_account, AccountId, AccountLedger, Amount, Transaction, TransferFailed, TxKind,
    ValueLedger, UNIT,
};
pub use ledger_rpc::{LedgerRpcClient, LedgerRpcError};
