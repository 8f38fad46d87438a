// peerbet - peer-staked prediction-market settlement engine
// HTTP surface over the liquidity / oracle / betting settlement core

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

mod app_state;
mod clock;
mod config;
mod events;
mod handlers;
mod ledger;
mod ledger_rpc;
mod models;
mod settlement;

use app_state::AppState;
use config::EngineConfig;
use handlers::*;
use ledger_rpc::LedgerRpcClient;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peerbet=info".into()),
        )
        .init();

    let config = EngineConfig::from_env();
    let bind_addr = config.bind_addr.clone();
    let ledger_rpc = Arc::new(LedgerRpcClient::from_config(&config));

    let ctx = ApiContext {
        engine: Arc::new(Mutex::new(AppState::new(config))),
        ledger_rpc,
    };

    let app = Router::new()
        // ===== ACCOUNT ENDPOINTS =====
        .route("/accounts", post(register_account))
        .route("/accounts/:account/balance", get(get_balance))
        // ===== LIQUIDITY ENDPOINTS =====
        .route("/liquidity/add", post(add_liquidity))
        .route("/liquidity/remove", post(remove_liquidity))
        .route("/liquidity/:account", get(get_liquidity_share))
        .route("/liquidity", get(get_available_liquidity))
        // ===== ORACLE ENDPOINTS =====
        .route("/oracle/:bet_id/initialize", post(initialize_oracle))
        .route("/oracle/:bet_id/stake", post(oracle_stake))
        .route("/oracle/:bet_id/close-staking", post(close_staking))
        .route("/oracle/:bet_id/vote", post(oracle_vote))
        .route("/oracle/:bet_id/consensus", get(get_consensus))
        .route("/oracle/:bet_id", get(get_oracle_state))
        // ===== BETTING ENDPOINTS =====
        .route("/bets", post(create_bet))
        .route("/bets/:bet_id/positions", post(take_position))
        .route("/bets/:bet_id/resolve", post(resolve_bet))
        .route("/bets/:bet_id", get(get_bet))
        // ===== AUDIT ENDPOINTS =====
        .route("/events", get(get_events))
        .route("/transactions", get(get_transactions))
        .route("/status", get(get_status))
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        // Apply CORS and state
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(ctx);

    info!(addr = %bind_addr, "peerbet settlement engine listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
