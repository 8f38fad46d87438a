// HTTP request handlers for the peerbet API
//
// Every handler maps 1:1 to a core operation and surfaces the specific
// typed error kind in the JSON body, never a generic failure.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::app_state::SharedState;
use crate::ledger::ValueLedger;
use crate::ledger_rpc::LedgerRpcClient;
use crate::models::*;
use crate::settlement::{BetError, BetId, LiquidityError, OracleError};
use std::sync::Arc;

/// Axum state: the engine behind its lock plus the async ledger-node client
/// (kept outside the lock so no await happens while holding it).
#[derive(Clone)]
pub struct ApiContext {
    pub engine: SharedState,
    pub ledger_rpc: Arc<LedgerRpcClient>,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn failure(status: StatusCode, kind: &str, message: String) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "success": false, "error_kind": kind, "error": message })),
    )
}

fn liquidity_failure(e: LiquidityError) -> (StatusCode, Json<Value>) {
    let status = match e {
        LiquidityError::Transfer(_) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    failure(status, e.kind(), e.to_string())
}

fn oracle_failure(e: OracleError) -> (StatusCode, Json<Value>) {
    let status = match e {
        OracleError::UnknownEvent(_) => StatusCode::NOT_FOUND,
        OracleError::AlreadyInitialized(_)
        | OracleError::AlreadyStaked(_)
        | OracleError::AlreadyVoted(_)
        | OracleError::AlreadyFinalized(_)
        | OracleError::StakingAlreadyClosed(_) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    failure(status, e.kind(), e.to_string())
}

fn bet_failure(e: BetError) -> (StatusCode, Json<Value>) {
    let status = match e {
        BetError::UnknownBet(_) => StatusCode::NOT_FOUND,
        BetError::AlreadyResolved(_) | BetError::PositionConflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    failure(status, e.kind(), e.to_string())
}

// ===== ACCOUNT ENDPOINTS =====

/// Register an account, seeding its engine balance from the external ledger
/// node (a fixed seed in mock mode).
pub async fn register_account(
    State(ctx): State<ApiContext>,
    Json(request): Json<RegisterAccountRequest>,
) -> ApiResult {
    let initial = ctx
        .ledger_rpc
        .get_balance(&request.account)
        .await
        .map_err(|e| failure(StatusCode::BAD_GATEWAY, "LedgerRpcError", e.to_string()))?;

    let mut state = ctx.engine.lock().unwrap();
    let balance = state.ledger.register(&request.account, initial);
    Ok(Json(
        json!({ "success": true, "account": request.account, "balance": balance }),
    ))
}

pub async fn get_balance(
    State(ctx): State<ApiContext>,
    Path(account): Path<String>,
) -> Json<Value> {
    let state = ctx.engine.lock().unwrap();
    Json(json!({ "account": account, "balance": state.ledger.balance_of(&account) }))
}

// ===== LIQUIDITY ENDPOINTS =====

pub async fn add_liquidity(
    State(ctx): State<ApiContext>,
    Json(request): Json<LiquidityRequest>,
) -> ApiResult {
    let mut state = ctx.engine.lock().unwrap();
    let state = &mut *state;
    state
        .liquidity
        .add_liquidity(&mut state.ledger, &request.account, request.amount)
        .map_err(liquidity_failure)?;
    Ok(Json(json!({
        "success": true,
        "account": request.account,
        "shares": state.liquidity.liquidity_share(&request.account),
    })))
}

pub async fn remove_liquidity(
    State(ctx): State<ApiContext>,
    Json(request): Json<LiquidityRequest>,
) -> ApiResult {
    let mut state = ctx.engine.lock().unwrap();
    let state = &mut *state;
    state
        .liquidity
        .remove_liquidity(&mut state.ledger, &request.account, request.amount)
        .map_err(liquidity_failure)?;
    Ok(Json(json!({
        "success": true,
        "account": request.account,
        "shares": state.liquidity.liquidity_share(&request.account),
    })))
}

pub async fn get_liquidity_share(
    State(ctx): State<ApiContext>,
    Path(account): Path<String>,
) -> Json<Value> {
    let state = ctx.engine.lock().unwrap();
    Json(json!({
        "account": account,
        "shares": state.liquidity.liquidity_share(&account),
    }))
}

pub async fn get_available_liquidity(State(ctx): State<ApiContext>) -> Json<Value> {
    let state = ctx.engine.lock().unwrap();
    Json(json!({ "available": state.liquidity.available_liquidity() }))
}

// ===== ORACLE ENDPOINTS =====

pub async fn initialize_oracle(
    State(ctx): State<ApiContext>,
    Path(bet_id): Path<BetId>,
) -> ApiResult {
    let mut state = ctx.engine.lock().unwrap();
    let now = state.now();
    state
        .oracle
        .initialize(now, bet_id)
        .map_err(oracle_failure)?;
    Ok(Json(json!({ "success": true, "bet_id": bet_id })))
}

pub async fn oracle_stake(
    State(ctx): State<ApiContext>,
    Path(bet_id): Path<BetId>,
    Json(request): Json<StakeRequest>,
) -> ApiResult {
    let mut state = ctx.engine.lock().unwrap();
    let now = state.now();
    let state = &mut *state;
    state
        .oracle
        .stake(&mut state.ledger, now, bet_id, &request.staker, request.amount)
        .map_err(oracle_failure)?;
    Ok(Json(json!({
        "success": true,
        "bet_id": bet_id,
        "staker": request.staker,
        "amount": request.amount,
    })))
}

pub async fn close_staking(
    State(ctx): State<ApiContext>,
    Path(bet_id): Path<BetId>,
) -> ApiResult {
    let mut state = ctx.engine.lock().unwrap();
    let now = state.now();
    state
        .oracle
        .end_staking_period(now, bet_id)
        .map_err(oracle_failure)?;
    Ok(Json(json!({ "success": true, "bet_id": bet_id })))
}

pub async fn oracle_vote(
    State(ctx): State<ApiContext>,
    Path(bet_id): Path<BetId>,
    Json(request): Json<VoteRequest>,
) -> ApiResult {
    let mut state = ctx.engine.lock().unwrap();
    let state = &mut *state;
    state
        .oracle
        .vote(&mut state.ledger, bet_id, &request.voter, request.choice)
        .map_err(oracle_failure)?;

    let (outcome, finalized) = state.oracle.consensus(bet_id);
    Ok(Json(json!({
        "success": true,
        "bet_id": bet_id,
        "voter": request.voter,
        "finalized": finalized,
        "outcome": if finalized { Some(outcome) } else { None },
    })))
}

pub async fn get_consensus(
    State(ctx): State<ApiContext>,
    Path(bet_id): Path<BetId>,
) -> Json<Value> {
    let state = ctx.engine.lock().unwrap();
    let (outcome, finalized) = state.oracle.consensus(bet_id);
    Json(json!({ "bet_id": bet_id, "outcome": outcome, "finalized": finalized }))
}

pub async fn get_oracle_state(
    State(ctx): State<ApiContext>,
    Path(bet_id): Path<BetId>,
) -> Result<Json<Value>, StatusCode> {
    let state = ctx.engine.lock().unwrap();
    let record = state.oracle.state(bet_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({ "bet_id": bet_id, "state": record })))
}

// ===== BETTING ENDPOINTS =====

pub async fn create_bet(
    State(ctx): State<ApiContext>,
    Json(request): Json<CreateBetRequest>,
) -> ApiResult {
    let mut state = ctx.engine.lock().unwrap();
    let now = state.now();
    let state = &mut *state;
    let bet_id = state
        .betting
        .create_bet(
            &mut state.ledger,
            now,
            &request.creator,
            &request.description,
            request.min_position,
            request.max_position,
            request.duration_secs,
            request.stake,
        )
        .map_err(bet_failure)?;
    Ok(Json(json!({ "success": true, "bet_id": bet_id })))
}

pub async fn take_position(
    State(ctx): State<ApiContext>,
    Path(bet_id): Path<BetId>,
    Json(request): Json<TakePositionRequest>,
) -> ApiResult {
    let mut state = ctx.engine.lock().unwrap();
    let now = state.now();
    let state = &mut *state;
    state
        .betting
        .take_position(
            &mut state.ledger,
            now,
            bet_id,
            &request.participant,
            request.side,
            request.amount,
        )
        .map_err(bet_failure)?;
    Ok(Json(json!({
        "success": true,
        "bet_id": bet_id,
        "participant": request.participant,
        "side": request.side,
        "amount": request.amount,
    })))
}

pub async fn resolve_bet(
    State(ctx): State<ApiContext>,
    Path(bet_id): Path<BetId>,
) -> ApiResult {
    let mut state = ctx.engine.lock().unwrap();
    let now = state.now();
    let state = &mut *state;
    let outcome = state
        .betting
        .resolve_bet(&mut state.ledger, &state.oracle, now, bet_id)
        .map_err(bet_failure)?;
    Ok(Json(json!({ "success": true, "bet_id": bet_id, "outcome": outcome })))
}

pub async fn get_bet(
    State(ctx): State<ApiContext>,
    Path(bet_id): Path<BetId>,
) -> Result<Json<Value>, StatusCode> {
    let state = ctx.engine.lock().unwrap();
    let details = state.betting.bet_details(bet_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!(details)))
}

// ===== AUDIT ENDPOINTS =====

pub async fn get_events(State(ctx): State<ApiContext>) -> Json<Value> {
    let state = ctx.engine.lock().unwrap();
    Json(json!({ "events": state.all_events() }))
}

pub async fn get_transactions(State(ctx): State<ApiContext>) -> Json<Value> {
    let state = ctx.engine.lock().unwrap();
    Json(json!({ "transactions": state.ledger.journal() }))
}

pub async fn get_status(State(ctx): State<ApiContext>) -> Json<Value> {
    let state = ctx.engine.lock().unwrap();
    Json(json!({
        "accounts": state.ledger.account_count(),
        "bets": state.betting.bet_count(),
        "available_liquidity": state.liquidity.available_liquidity(),
        "min_stake": state.oracle.min_stake(),
        "liquidity_backing": state.betting.liquidity_backing(),
        "ledger_mock_mode": ctx.ledger_rpc.mock,
        "server_time": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn health_check() -> &'static str {
    "peerbet settlement engine - online"
}
