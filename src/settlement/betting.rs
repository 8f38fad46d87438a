// Betting pool - wager escrow and settlement
//
// Per-wager state: Open until `end_time` passes (time lock, no explicit
// transition), then resolvable exactly once against the oracle's finalized
// outcome. The whole escrowed pool is distributed pro-rata among winning-side
// positions; integer-division dust stays in escrow, bounded below the number
// of winners. If nobody took the winning side, every escrower is refunded
// their exact stake.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use super::oracle::ConsensusSource;
use super::BetId;
use crate::clock::Timestamp;
use crate::events::SettlementEvent;
use crate::ledger::{escrow_account, AccountId, Amount, TransferFailed, TxKind, ValueLedger};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BetError {
    UnknownBet(BetId),
    InvalidRange { min: Amount, max: Amount },
    InvalidStake { amount: Amount, min: Amount, max: Amount },
    BetExpired { end_time: Timestamp, now: Timestamp },
    /// The participant already holds the opposite side of this wager.
    PositionConflict(AccountId),
    BettingPeriodActive { end_time: Timestamp, now: Timestamp },
    AlreadyResolved(BetId),
    OracleNotFinalized(BetId),
    Transfer(TransferFailed),
}

impl std::fmt::Display for BetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BetError::UnknownBet(id) => write!(f, "Unknown bet: {}", id),
            BetError::InvalidRange { min, max } => {
                write!(f, "Invalid position range: {}..{}", min, max)
            }
            BetError::InvalidStake { amount, min, max } => {
                write!(f, "Invalid stake {}: must be within {}..{}", amount, min, max)
            }
            BetError::BetExpired { end_time, now } => {
                write!(f, "Bet expired at {} (now {})", end_time, now)
            }
            BetError::PositionConflict(id) => {
                write!(f, "{} already holds the opposite side", id)
            }
            BetError::BettingPeriodActive { end_time, now } => {
                write!(f, "Betting period active until {} (now {})", end_time, now)
            }
            BetError::AlreadyResolved(id) => write!(f, "Bet {} already resolved", id),
            BetError::OracleNotFinalized(id) => {
                write!(f, "Oracle consensus not finalized for bet {}", id)
            }
            BetError::Transfer(e) => write!(f, "Transfer failed: {}", e),
        }
    }
}

impl std::error::Error for BetError {}

impl BetError {
    /// Stable machine-readable kind for the API surface.
    pub fn kind(&self) -> &'static str {
        match self {
            BetError::UnknownBet(_) => "UnknownBet",
            BetError::InvalidRange { .. } => "InvalidRange",
            BetError::InvalidStake { .. } => "InvalidStake",
            BetError::BetExpired { .. } => "BetExpired",
            BetError::PositionConflict(_) => "PositionConflict",
            BetError::BettingPeriodActive { .. } => "BettingPeriodActive",
            BetError::AlreadyResolved(_) => "AlreadyResolved",
            BetError::OracleNotFinalized(_) => "OracleNotFinalized",
            BetError::Transfer(_) => "TransferFailed",
        }
    }
}

// ============================================================================
// STATE
// ============================================================================

/// A participant's escrowed side of a wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub account: AccountId,
    pub side: bool,
    pub amount: Amount,
}

/// A binary wager. `total_true + total_false` always equals the sum of all
/// escrowed position amounts.
#[derive(Debug, Clone, Serialize)]
pub struct Bet {
    pub description: String,
    pub creator: AccountId,
    pub min_position: Amount,
    pub max_position: Amount,
    pub end_time: Timestamp,
    pub total_true: Amount,
    pub total_false: Amount,
    /// Insertion order; one side per participant.
    pub positions: Vec<Position>,
    pub resolved: bool,
}

/// Read-only projection for the API surface.
#[derive(Debug, Clone, Serialize)]
pub struct BetDetails {
    pub bet_id: BetId,
    pub description: String,
    pub creator: AccountId,
    pub min_position: Amount,
    pub max_position: Amount,
    pub end_time: Timestamp,
    pub total_true: Amount,
    pub total_false: Amount,
    pub position_count: usize,
    pub resolved: bool,
}

// ============================================================================
// BETTING POOL
// ============================================================================

#[derive(Debug)]
pub struct BettingPool {
    escrow: AccountId,
    bets: HashMap<BetId, Bet>,
    next_id: BetId,
    /// Liquidity-pool escrow handle wired by deployment. Surfaced in status
    /// reads; position backing through it is not exercised.
    liquidity_backing: Option<AccountId>,
    events: Vec<SettlementEvent>,
}

impl BettingPool {
    pub fn new() -> Self {
        Self {
            escrow: escrow_account("betting"),
            bets: HashMap::new(),
            next_id: 0,
            liquidity_backing: None,
            events: Vec::new(),
        }
    }

    pub fn with_liquidity_backing(mut self, escrow: AccountId) -> Self {
        self.liquidity_backing = Some(escrow);
        self
    }

    /// Ledger account holding all wager escrow.
    pub fn escrow_account(&self) -> &str {
        &self.escrow
    }

    pub fn liquidity_backing(&self) -> Option<&str> {
        self.liquidity_backing.as_deref()
    }

    /// Open a wager, escrowing the creator's stake as the TRUE side.
    /// Returns the assigned sequential id.
    pub fn create_bet(
        &mut self,
        ledger: &mut dyn ValueLedger,
        now: Timestamp,
        creator: &str,
        description: &str,
        min_position: Amount,
        max_position: Amount,
        duration: u64,
        stake: Amount,
    ) -> Result<BetId, BetError> {
        if min_position > max_position || min_position == 0 {
            return Err(BetError::InvalidRange {
                min: min_position,
                max: max_position,
            });
        }
        if stake < min_position || stake > max_position {
            return Err(BetError::InvalidStake {
                amount: stake,
                min: min_position,
                max: max_position,
            });
        }

        ledger
            .transfer(TxKind::Escrow, creator, &self.escrow, stake)
            .map_err(BetError::Transfer)?;

        let bet_id = self.next_id;
        self.next_id += 1;
        let end_time = now + duration;

        self.bets.insert(
            bet_id,
            Bet {
                description: description.to_string(),
                creator: creator.to_string(),
                min_position,
                max_position,
                end_time,
                total_true: stake,
                total_false: 0,
                positions: vec![Position {
                    account: creator.to_string(),
                    side: true,
                    amount: stake,
                }],
                resolved: false,
            },
        );

        self.events.push(SettlementEvent::BetCreated {
            bet_id,
            creator: creator.to_string(),
            description: description.to_string(),
            min_position,
            max_position,
            end_time,
            stake,
        });
        info!(bet_id, creator, stake, end_time, "bet created");
        Ok(bet_id)
    }

    /// Escrow a position on one side of an open wager. A repeat position on
    /// the same side accumulates; the opposite side is rejected.
    pub fn take_position(
        &mut self,
        ledger: &mut dyn ValueLedger,
        now: Timestamp,
        bet_id: BetId,
        participant: &str,
        side: bool,
        amount: Amount,
    ) -> Result<(), BetError> {
        let escrow = self.escrow.clone();
        let bet = self
            .bets
            .get_mut(&bet_id)
            .ok_or(BetError::UnknownBet(bet_id))?;

        if now >= bet.end_time {
            return Err(BetError::BetExpired {
                end_time: bet.end_time,
                now,
            });
        }
        if amount < bet.min_position || amount > bet.max_position {
            return Err(BetError::InvalidStake {
                amount,
                min: bet.min_position,
                max: bet.max_position,
            });
        }
        let existing = bet
            .positions
            .iter()
            .position(|p| p.account == participant);
        if let Some(idx) = existing {
            if bet.positions[idx].side != side {
                return Err(BetError::PositionConflict(participant.to_string()));
            }
        }

        ledger
            .transfer(TxKind::Escrow, participant, &escrow, amount)
            .map_err(BetError::Transfer)?;

        match existing {
            Some(idx) => bet.positions[idx].amount += amount,
            None => bet.positions.push(Position {
                account: participant.to_string(),
                side,
                amount,
            }),
        }
        if side {
            bet.total_true += amount;
        } else {
            bet.total_false += amount;
        }

        self.events.push(SettlementEvent::BetPositionTaken {
            bet_id,
            participant: participant.to_string(),
            side,
            amount,
        });
        info!(bet_id, participant, side, amount, "position taken");
        Ok(())
    }

    /// Settle an expired wager against the oracle's finalized outcome.
    /// Any caller may trigger this; it succeeds exactly once.
    pub fn resolve_bet(
        &mut self,
        ledger: &mut dyn ValueLedger,
        consensus: &dyn ConsensusSource,
        now: Timestamp,
        bet_id: BetId,
    ) -> Result<bool, BetError> {
        let escrow = self.escrow.clone();
        let bet = self
            .bets
            .get_mut(&bet_id)
            .ok_or(BetError::UnknownBet(bet_id))?;

        if now < bet.end_time {
            return Err(BetError::BettingPeriodActive {
                end_time: bet.end_time,
                now,
            });
        }
        if bet.resolved {
            return Err(BetError::AlreadyResolved(bet_id));
        }
        let (outcome, finalized) = consensus.consensus(bet_id);
        if !finalized {
            return Err(BetError::OracleNotFinalized(bet_id));
        }

        let winning_total = if outcome { bet.total_true } else { bet.total_false };
        let losing_total = if outcome { bet.total_false } else { bet.total_true };

        // Nobody on the winning side: the pool is returned instead of paid
        // out, every escrower gets their exact stake back.
        let (kind, intents): (TxKind, Vec<(AccountId, Amount)>) = if winning_total == 0 {
            (
                TxKind::Refund,
                bet.positions
                    .iter()
                    .map(|p| (p.account.clone(), p.amount))
                    .collect(),
            )
        } else {
            (
                TxKind::Payout,
                bet.positions
                    .iter()
                    .filter(|p| p.side == outcome)
                    .map(|p| {
                        let share = (p.amount as u128 * losing_total as u128
                            / winning_total as u128) as Amount;
                        (p.account.clone(), p.amount + share)
                    })
                    .collect(),
            )
        };

        let mut applied: Vec<(AccountId, Amount)> = Vec::new();
        for (to, amount) in &intents {
            match ledger.transfer(kind, &escrow, to, *amount) {
                Ok(()) => applied.push((to.clone(), *amount)),
                Err(failure) => {
                    for (paid_to, paid) in applied.iter().rev() {
                        if let Err(e) = ledger.transfer(TxKind::Refund, paid_to, &escrow, *paid) {
                            warn!(account = %paid_to, %e, "compensation transfer failed");
                        }
                    }
                    warn!(bet_id, %failure, "payout pass failed, bet stays unresolved");
                    return Err(BetError::Transfer(failure));
                }
            }
        }

        bet.resolved = true;
        let paid_out: Amount = intents.iter().map(|(_, amount)| *amount).sum();

        self.events.push(SettlementEvent::BetResolved {
            bet_id,
            outcome,
            paid_out,
        });
        info!(bet_id, outcome, paid_out, "bet resolved");
        Ok(outcome)
    }

    pub fn bet(&self, bet_id: BetId) -> Option<&Bet> {
        self.bets.get(&bet_id)
    }

    pub fn bet_details(&self, bet_id: BetId) -> Option<BetDetails> {
        self.bets.get(&bet_id).map(|bet| BetDetails {
            bet_id,
            description: bet.description.clone(),
            creator: bet.creator.clone(),
            min_position: bet.min_position,
            max_position: bet.max_position,
            end_time: bet.end_time,
            total_true: bet.total_true,
            total_false: bet.total_false,
            position_count: bet.positions.len(),
            resolved: bet.resolved,
        })
    }

    pub fn bet_count(&self) -> usize {
        self.bets.len()
    }

    pub fn events(&self) -> &[SettlementEvent] {
        &self.events
    }
}

impl Default for BettingPool {
    fn default() -> Self {
        Self::new()
    }
}
