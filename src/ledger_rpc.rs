/// External value-ledger RPC client
///
/// HTTP client for the external ledger node that custodies real balances.
/// Supports mock mode for local development without a live node; in mock
/// mode every account reads a fixed seed balance.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EngineConfig;
use crate::ledger::{Amount, UNIT};

/// Default timeout for ledger-node RPC calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Seed balance every account reads in mock mode.
pub const MOCK_BALANCE: Amount = 1_000 * UNIT;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerRpcError {
    /// HTTP request failed
    RequestFailed(String),
    /// Invalid response from the ledger node
    InvalidResponse(String),
}

impl std::fmt::Display for LedgerRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerRpcError::RequestFailed(msg) => write!(f, "Ledger request failed: {}", msg),
            LedgerRpcError::InvalidResponse(msg) => {
                write!(f, "Invalid ledger response: {}", msg)
            }
        }
    }
}

impl std::error::Error for LedgerRpcError {}

// ============================================================================
// CLIENT
// ============================================================================

/// Client for the external ledger node.
pub struct LedgerRpcClient {
    pub url: String,
    pub mock: bool,
    client: Client,
}

impl LedgerRpcClient {
    pub fn new(url: String, mock: bool) -> Self {
        Self {
            url,
            mock,
            client: Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.ledger_rpc_url.clone(), config.ledger_mock_mode)
    }

    /// Balance an account holds on the external ledger. Used to seed the
    /// in-process ledger when an account registers.
    pub async fn get_balance(&self, account: &str) -> Result<Amount, LedgerRpcError> {
        if self.mock {
            return Ok(MOCK_BALANCE);
        }

        #[derive(Deserialize)]
        struct BalanceResponse {
            balance: Amount,
        }

        let url = format!("{}/accounts/{}/balance", self.url, account);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerRpcError::RequestFailed(e.to_string()))?;

        let data: BalanceResponse = resp
            .json()
            .await
            .map_err(|e| LedgerRpcError::InvalidResponse(e.to_string()))?;

        Ok(data.balance)
    }

    /// Liveness probe against the ledger node.
    pub async fn health(&self) -> Result<bool, LedgerRpcError> {
        if self.mock {
            return Ok(true);
        }

        let url = format!("{}/health", self.url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerRpcError::RequestFailed(e.to_string()))?;

        Ok(resp.status().is_success())
    }
}
