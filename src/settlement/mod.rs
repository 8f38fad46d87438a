// ============================================================================
// Settlement Module - Core Wager & Consensus Logic
// ============================================================================
//
// This module contains the core settlement machinery:
//   - liquidity: share-proportional deposit/withdraw pool
//   - oracle: per-event staking, voting, consensus and slashing
//   - betting: per-wager escrow, position taking, resolution and payout
//
// ============================================================================

pub mod betting;
pub mod liquidity;
pub mod oracle;

pub use betting::{Bet, BetDetails, BetError, BettingPool, Position};
pub use liquidity::{LiquidityError, LiquidityPool};
pub use oracle::{ConsensusSource, Oracle, OracleError, OraclePhase, OracleState};

/// Sequential wager identifier, assigned at bet creation.
pub type BetId = u64;
