// Engine configuration
//
// All knobs come from the environment with sensible local defaults, so the
// binary runs with no setup. `.env` files are honored via dotenv in main.

use crate::ledger::{Amount, UNIT};

/// Minimum arbiter collateral per event.
pub const DEFAULT_MIN_STAKE: Amount = UNIT / 10;

/// How long the staking window stays open after oracle initialization.
pub const DEFAULT_STAKING_WINDOW_SECS: u64 = 24 * 60 * 60;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";

pub const DEFAULT_LEDGER_RPC_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub min_stake: Amount,
    pub staking_window_secs: u64,
    pub bind_addr: String,
    pub ledger_rpc_url: String,
    /// Use mock mode (no real ledger-node calls).
    pub ledger_mock_mode: bool,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            min_stake: env_u64("PEERBET_MIN_STAKE").unwrap_or(DEFAULT_MIN_STAKE),
            staking_window_secs: env_u64("PEERBET_STAKING_WINDOW_SECS")
                .unwrap_or(DEFAULT_STAKING_WINDOW_SECS),
            bind_addr: std::env::var("PEERBET_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            ledger_rpc_url: std::env::var("LEDGER_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_LEDGER_RPC_URL.to_string()),
            ledger_mock_mode: std::env::var("LEDGER_MOCK_MODE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_stake: DEFAULT_MIN_STAKE,
            staking_window_secs: DEFAULT_STAKING_WINDOW_SECS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            ledger_rpc_url: DEFAULT_LEDGER_RPC_URL.to_string(),
            ledger_mock_mode: true,
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
