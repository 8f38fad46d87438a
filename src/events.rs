// Settlement events
//
// Every state-changing operation appends a typed event to its component's
// log. The merged log is the audit trail the HTTP surface exposes.

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::ledger::{AccountId, Amount};
use crate::settlement::BetId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SettlementEvent {
    LiquidityAdded {
        account: AccountId,
        amount: Amount,
    },
    LiquidityRemoved {
        account: AccountId,
        amount: Amount,
    },
    OracleStaked {
        bet_id: BetId,
        staker: AccountId,
        amount: Amount,
    },
    VoteCast {
        bet_id: BetId,
        voter: AccountId,
        choice: bool,
    },
    ConsensusReached {
        bet_id: BetId,
        outcome: bool,
    },
    BetCreated {
        bet_id: BetId,
        creator: AccountId,
        description: String,
        min_position: Amount,
        max_position: Amount,
        end_time: Timestamp,
        stake: Amount,
    },
    BetPositionTaken {
        bet_id: BetId,
        participant: AccountId,
        side: bool,
        amount: Amount,
    },
    BetResolved {
        bet_id: BetId,
        outcome: bool,
        paid_out: Amount,
    },
}
