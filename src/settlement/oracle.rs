// Oracle - staked outcome consensus
//
// Per-event state machine: Staking -> Voting -> Finalized. Arbiters escrow
// collateral during the staking window, vote once the window is explicitly
// closed, and consensus fires as soon as either tally holds a strict majority
// of ALL staked weight. Finalization slashes every dissenting stake (a staker
// who never voted counts as dissenting) and redistributes the forfeited pool
// pro-rata to arbiters who voted with the outcome, in one atomic pass.
//
// The only retry semantics in the system live here: if any payout transfer
// inside the slashing pass fails, the applied prefix is compensated, the
// triggering vote is removed, and the record drops back to Voting so a later
// vote can re-run finalization.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use super::BetId;
use crate::clock::Timestamp;
use crate::events::SettlementEvent;
use crate::ledger::{escrow_account, AccountId, Amount, TransferFailed, TxKind, ValueLedger};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OracleError {
    AlreadyInitialized(BetId),
    UnknownEvent(BetId),
    /// Stake attempted outside the staking phase or past the deadline.
    StakingClosed(BetId),
    InsufficientStake { payment: Amount, minimum: Amount },
    AlreadyStaked(AccountId),
    StakingStillActive { deadline: Timestamp, now: Timestamp },
    StakingAlreadyClosed(BetId),
    VotingNotOpen(BetId),
    NotStaked(AccountId),
    AlreadyVoted(AccountId),
    AlreadyFinalized(BetId),
    /// Escrowing the stake itself failed.
    Transfer(TransferFailed),
    /// A payout inside the slashing pass failed; the vote was rolled back.
    SlashingTransferFailed(TransferFailed),
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::AlreadyInitialized(id) => write!(f, "Oracle {} already initialized", id),
            OracleError::UnknownEvent(id) => write!(f, "Unknown oracle event: {}", id),
            OracleError::StakingClosed(id) => write!(f, "Staking closed for event {}", id),
            OracleError::InsufficientStake { payment, minimum } => {
                write!(f, "Insufficient stake: {} < {}", payment, minimum)
            }
            OracleError::AlreadyStaked(id) => write!(f, "Already staked: {}", id),
            OracleError::StakingStillActive { deadline, now } => {
                write!(f, "Staking still active until {} (now {})", deadline, now)
            }
            OracleError::StakingAlreadyClosed(id) => {
                write!(f, "Staking already closed for event {}", id)
            }
            OracleError::VotingNotOpen(id) => write!(f, "Voting not open for event {}", id),
            OracleError::NotStaked(id) => write!(f, "Not staked: {}", id),
            OracleError::AlreadyVoted(id) => write!(f, "Already voted: {}", id),
            OracleError::AlreadyFinalized(id) => write!(f, "Event {} already finalized", id),
            OracleError::Transfer(e) => write!(f, "Transfer failed: {}", e),
            OracleError::SlashingTransferFailed(e) => {
                write!(f, "Slashing transfer failed: {}", e)
            }
        }
    }
}

impl std::error::Error for OracleError {}

impl OracleError {
    /// Stable machine-readable kind for the API surface.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::AlreadyInitialized(_) => "AlreadyInitialized",
            OracleError::UnknownEvent(_) => "UnknownEvent",
            OracleError::StakingClosed(_) => "StakingClosed",
            OracleError::InsufficientStake { .. } => "InsufficientStake",
            OracleError::AlreadyStaked(_) => "AlreadyStaked",
            OracleError::StakingStillActive { .. } => "StakingStillActive",
            OracleError::StakingAlreadyClosed(_) => "StakingAlreadyClosed",
            OracleError::VotingNotOpen(_) => "VotingNotOpen",
            OracleError::NotStaked(_) => "NotStaked",
            OracleError::AlreadyVoted(_) => "AlreadyVoted",
            OracleError::AlreadyFinalized(_) => "AlreadyFinalized",
            OracleError::Transfer(_) => "TransferFailed",
            OracleError::SlashingTransferFailed(_) => "SlashingTransferFailed",
        }
    }
}

// ============================================================================
// STATE
// ============================================================================

/// Tagged phase variant. Illegal flag combinations cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum OraclePhase {
    Staking,
    Voting,
    Finalized { outcome: bool },
}

/// Per-event oracle record. Never destroyed, retained for audit.
#[derive(Debug, Clone, Serialize)]
pub struct OracleState {
    pub phase: OraclePhase,
    pub staking_deadline: Timestamp,
    /// Collateral per arbiter; zero means not staked.
    pub stakes: HashMap<AccountId, Amount>,
    pub votes: HashMap<AccountId, bool>,
    /// Staking insertion order, used for the slashing pass.
    pub voter_list: Vec<AccountId>,
    pub total_staked: Amount,
    pub true_weight: Amount,
    pub false_weight: Amount,
}

impl OracleState {
    fn new(staking_deadline: Timestamp) -> Self {
        Self {
            phase: OraclePhase::Staking,
            staking_deadline,
            stakes: HashMap::new(),
            votes: HashMap::new(),
            voter_list: Vec::new(),
            total_staked: 0,
            true_weight: 0,
            false_weight: 0,
        }
    }
}

// ============================================================================
// CONSENSUS CAPABILITY
// ============================================================================

/// Read-only consensus view the betting pool resolves against. Behind a
/// trait so a test double can substitute for the real oracle.
pub trait ConsensusSource {
    /// Returns `(outcome, finalized)`. `(false, false)` before finalization
    /// or for unknown ids.
    fn consensus(&self, bet_id: BetId) -> (bool, bool);
}

// ============================================================================
// ORACLE
// ============================================================================

#[derive(Debug)]
pub struct Oracle {
    min_stake: Amount,
    staking_window: u64,
    escrow: AccountId,
    states: HashMap<BetId, OracleState>,
    events: Vec<SettlementEvent>,
}

impl Oracle {
    pub fn new(min_stake: Amount, staking_window: u64) -> Self {
        Self {
            min_stake,
            staking_window,
            escrow: escrow_account("oracle"),
            states: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Ledger account holding all arbiter collateral.
    pub fn escrow_account(&self) -> &str {
        &self.escrow
    }

    pub fn min_stake(&self) -> Amount {
        self.min_stake
    }

    /// Create the per-event record and open the staking window.
    pub fn initialize(&mut self, now: Timestamp, bet_id: BetId) -> Result<(), OracleError> {
        if self.states.contains_key(&bet_id) {
            return Err(OracleError::AlreadyInitialized(bet_id));
        }
        self.states
            .insert(bet_id, OracleState::new(now + self.staking_window));
        info!(bet_id, deadline = now + self.staking_window, "oracle initialized");
        Ok(())
    }

    /// Escrow arbiter collateral for an event. One stake per identity.
    pub fn stake(
        &mut self,
        ledger: &mut dyn ValueLedger,
        now: Timestamp,
        bet_id: BetId,
        staker: &str,
        payment: Amount,
    ) -> Result<(), OracleError> {
        let escrow = self.escrow.clone();
        let min_stake = self.min_stake;
        let state = self
            .states
            .get_mut(&bet_id)
            .ok_or(OracleError::UnknownEvent(bet_id))?;

        if state.phase != OraclePhase::Staking || now >= state.staking_deadline {
            return Err(OracleError::StakingClosed(bet_id));
        }
        if payment < min_stake {
            return Err(OracleError::InsufficientStake {
                payment,
                minimum: min_stake,
            });
        }
        if state.stakes.get(staker).copied().unwrap_or(0) > 0 {
            return Err(OracleError::AlreadyStaked(staker.to_string()));
        }

        ledger
            .transfer(TxKind::Escrow, staker, &escrow, payment)
            .map_err(OracleError::Transfer)?;

        state.stakes.insert(staker.to_string(), payment);
        state.voter_list.push(staker.to_string());
        state.total_staked += payment;

        self.events.push(SettlementEvent::OracleStaked {
            bet_id,
            staker: staker.to_string(),
            amount: payment,
        });
        info!(bet_id, staker, amount = payment, "arbiter staked");
        Ok(())
    }

    /// Explicitly close the staking window once the deadline has elapsed.
    /// The deadline is advisory; this call performs the phase transition.
    /// Racing callers: the first wins, the rest get the "already" error.
    pub fn end_staking_period(&mut self, now: Timestamp, bet_id: BetId) -> Result<(), OracleError> {
        let state = self
            .states
            .get_mut(&bet_id)
            .ok_or(OracleError::UnknownEvent(bet_id))?;

        if state.phase != OraclePhase::Staking {
            return Err(OracleError::StakingAlreadyClosed(bet_id));
        }
        if now < state.staking_deadline {
            return Err(OracleError::StakingStillActive {
                deadline: state.staking_deadline,
                now,
            });
        }

        state.phase = OraclePhase::Voting;
        info!(bet_id, "staking period closed, voting open");
        Ok(())
    }

    /// Record a vote. Finalizes immediately when either tally holds a strict
    /// majority of all staked weight.
    pub fn vote(
        &mut self,
        ledger: &mut dyn ValueLedger,
        bet_id: BetId,
        voter: &str,
        choice: bool,
    ) -> Result<(), OracleError> {
        let escrow = self.escrow.clone();
        let state = self
            .states
            .get_mut(&bet_id)
            .ok_or(OracleError::UnknownEvent(bet_id))?;

        match state.phase {
            OraclePhase::Voting => {}
            OraclePhase::Staking => return Err(OracleError::VotingNotOpen(bet_id)),
            OraclePhase::Finalized { .. } => return Err(OracleError::AlreadyFinalized(bet_id)),
        }

        let weight = state.stakes.get(voter).copied().unwrap_or(0);
        if weight == 0 {
            return Err(OracleError::NotStaked(voter.to_string()));
        }
        if state.votes.contains_key(voter) {
            return Err(OracleError::AlreadyVoted(voter.to_string()));
        }

        state.votes.insert(voter.to_string(), choice);
        if choice {
            state.true_weight += weight;
        } else {
            state.false_weight += weight;
        }

        // Strict majority of TOTAL staked weight, checked after every vote,
        // not only once everyone has voted.
        let mut finalized_outcome = None;
        if 2 * state.true_weight > state.total_staked
            || 2 * state.false_weight > state.total_staked
        {
            let outcome = state.true_weight > state.false_weight;
            match Self::settle_stakes(ledger, &escrow, state, outcome) {
                Ok(()) => {
                    state.phase = OraclePhase::Finalized { outcome };
                    finalized_outcome = Some(outcome);
                }
                Err(failure) => {
                    // Roll the triggering vote back so a later vote can retry
                    // the whole finalization.
                    state.votes.remove(voter);
                    if choice {
                        state.true_weight -= weight;
                    } else {
                        state.false_weight -= weight;
                    }
                    warn!(bet_id, voter, %failure, "slashing pass failed, vote rolled back");
                    return Err(OracleError::SlashingTransferFailed(failure));
                }
            }
        }

        self.events.push(SettlementEvent::VoteCast {
            bet_id,
            voter: voter.to_string(),
            choice,
        });
        if let Some(outcome) = finalized_outcome {
            self.events
                .push(SettlementEvent::ConsensusReached { bet_id, outcome });
            info!(bet_id, outcome, "consensus reached");
        }
        Ok(())
    }

    /// The single atomic slashing pass: build payout intents for every
    /// arbiter who voted with the outcome, then apply them. Dissenting and
    /// silent stakes stay in escrow and fund the winners' rewards. On any
    /// transfer failure the applied prefix is compensated so the escrow ends
    /// exactly where it started.
    fn settle_stakes(
        ledger: &mut dyn ValueLedger,
        escrow: &str,
        state: &OracleState,
        outcome: bool,
    ) -> Result<(), TransferFailed> {
        let winning_weight = if outcome {
            state.true_weight
        } else {
            state.false_weight
        };
        let slashed_pool = state.total_staked - winning_weight;

        let mut intents: Vec<(AccountId, Amount)> = Vec::new();
        for arbiter in &state.voter_list {
            if state.votes.get(arbiter) == Some(&outcome) {
                let own = state.stakes[arbiter];
                let reward =
                    own + (own as u128 * slashed_pool as u128 / winning_weight as u128) as Amount;
                intents.push((arbiter.clone(), reward));
            }
        }

        let mut applied: Vec<(AccountId, Amount)> = Vec::new();
        for (to, amount) in &intents {
            match ledger.transfer(TxKind::Payout, escrow, to, *amount) {
                Ok(()) => applied.push((to.clone(), *amount)),
                Err(failure) => {
                    for (paid_to, paid) in applied.iter().rev() {
                        if let Err(e) = ledger.transfer(TxKind::Refund, paid_to, escrow, *paid) {
                            warn!(account = %paid_to, %e, "compensation transfer failed");
                        }
                    }
                    return Err(failure);
                }
            }
        }
        Ok(())
    }

    /// Returns `(outcome, finalized)`. `(false, false)` before finalization
    /// or for unknown ids.
    pub fn consensus(&self, bet_id: BetId) -> (bool, bool) {
        match self.states.get(&bet_id).map(|s| s.phase) {
            Some(OraclePhase::Finalized { outcome }) => (outcome, true),
            _ => (false, false),
        }
    }

    pub fn state(&self, bet_id: BetId) -> Option<&OracleState> {
        self.states.get(&bet_id)
    }

    pub fn events(&self) -> &[SettlementEvent] {
        &self.events
    }
}

impl ConsensusSource for Oracle {
    fn consensus(&self, bet_id: BetId) -> (bool, bool) {
        Oracle::consensus(self, bet_id)
    }
}
