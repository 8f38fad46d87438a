// Liquidity pool
//
// Share-proportional deposit/withdraw pool. Shares are valued 1:1 with the
// deposited amount, so total shares always equal the pool's escrowed balance.
// Entries are zeroed, not removed, on full withdrawal.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::events::SettlementEvent;
use crate::ledger::{escrow_account, AccountId, Amount, TransferFailed, TxKind, ValueLedger};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LiquidityError {
    /// Zero-amount deposits are rejected.
    ZeroAmount,
    InsufficientShares { requested: Amount, held: Amount },
    Transfer(TransferFailed),
}

impl std::fmt::Display for LiquidityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiquidityError::ZeroAmount => write!(f, "Deposit amount must be positive"),
            LiquidityError::InsufficientShares { requested, held } => {
                write!(f, "Insufficient shares: {} > {}", requested, held)
            }
            LiquidityError::Transfer(e) => write!(f, "Transfer failed: {}", e),
        }
    }
}

impl std::error::Error for LiquidityError {}

impl From<TransferFailed> for LiquidityError {
    fn from(e: TransferFailed) -> Self {
        LiquidityError::Transfer(e)
    }
}

impl LiquidityError {
    /// Stable machine-readable kind for the API surface.
    pub fn kind(&self) -> &'static str {
        match self {
            LiquidityError::ZeroAmount => "ZeroAmount",
            LiquidityError::InsufficientShares { .. } => "InsufficientShares",
            LiquidityError::Transfer(_) => "TransferFailed",
        }
    }
}

/// Process-lifetime share pool.
#[derive(Debug)]
pub struct LiquidityPool {
    escrow: AccountId,
    shares: HashMap<AccountId, Amount>,
    total_shares: Amount,
    events: Vec<SettlementEvent>,
}

impl LiquidityPool {
    pub fn new() -> Self {
        Self {
            escrow: escrow_account("liquidity"),
            shares: HashMap::new(),
            total_shares: 0,
            events: Vec::new(),
        }
    }

    /// Ledger account holding the pool's funds.
    pub fn escrow_account(&self) -> &str {
        &self.escrow
    }

    /// Deposit `amount` and receive shares 1:1.
    pub fn add_liquidity(
        &mut self,
        ledger: &mut dyn ValueLedger,
        caller: &str,
        amount: Amount,
    ) -> Result<(), LiquidityError> {
        if amount == 0 {
            return Err(LiquidityError::ZeroAmount);
        }

        ledger.transfer(TxKind::Escrow, caller, &self.escrow, amount)?;

        *self.shares.entry(caller.to_string()).or_insert(0) += amount;
        self.total_shares += amount;
        self.events.push(SettlementEvent::LiquidityAdded {
            account: caller.to_string(),
            amount,
        });
        info!(account = caller, amount, "liquidity added");
        Ok(())
    }

    /// Burn shares and withdraw the matching amount.
    pub fn remove_liquidity(
        &mut self,
        ledger: &mut dyn ValueLedger,
        caller: &str,
        amount: Amount,
    ) -> Result<(), LiquidityError> {
        let held = self.shares.get(caller).copied().unwrap_or(0);
        if amount > held {
            warn!(account = caller, amount, held, "liquidity withdrawal rejected");
            return Err(LiquidityError::InsufficientShares {
                requested: amount,
                held,
            });
        }

        ledger.transfer(TxKind::Payout, &self.escrow, caller, amount)?;

        *self.shares.entry(caller.to_string()).or_insert(0) -= amount;
        self.total_shares -= amount;
        self.events.push(SettlementEvent::LiquidityRemoved {
            account: caller.to_string(),
            amount,
        });
        info!(account = caller, amount, "liquidity removed");
        Ok(())
    }

    pub fn liquidity_share(&self, id: &str) -> Amount {
        self.shares.get(id).copied().unwrap_or(0)
    }

    /// Total share-backed liquidity held by the pool.
    pub fn available_liquidity(&self) -> Amount {
        self.total_shares
    }

    pub fn events(&self) -> &[SettlementEvent] {
        &self.events
    }
}

impl Default for LiquidityPool {
    fn default() -> Self {
        Self::new()
    }
}
