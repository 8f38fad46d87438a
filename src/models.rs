// Request models for the peerbet API

use serde::Deserialize;

use crate::ledger::{AccountId, Amount};

#[derive(Debug, Deserialize)]
pub struct RegisterAccountRequest {
    pub account: AccountId,
}

#[derive(Debug, Deserialize)]
pub struct LiquidityRequest {
    pub account: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    pub staker: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub voter: AccountId,
    pub choice: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateBetRequest {
    pub creator: AccountId,
    pub description: String,
    pub min_position: Amount,
    pub max_position: Amount,
    pub duration_secs: u64,
    pub stake: Amount,
}

#[derive(Debug, Deserialize)]
pub struct TakePositionRequest {
    pub participant: AccountId,
    pub side: bool,
    pub amount: Amount,
}
