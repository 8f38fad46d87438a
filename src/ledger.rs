/// Value Ledger for the peerbet settlement engine
///
/// Append-only account-balance system providing atomic, all-or-nothing value
/// transfers between identities and synchronous balance queries. The
/// settlement components (liquidity, oracle, betting) run against the
/// `ValueLedger` trait so a test double can stand in for the real thing.
///
/// Amounts are fixed-precision integers in the smallest transferable unit.
/// No floating point anywhere in the accounting path.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Smallest transferable unit.
pub type Amount = u64;

/// Opaque account/participant reference.
pub type AccountId = String;

/// One whole token in smallest units.
pub const UNIT: Amount = 1_000_000_000;

// ============================================================================
// ERRORS
// ============================================================================

/// A value transfer that did not happen. No partial state is ever retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferFailed {
    UnknownAccount(AccountId),
    InsufficientFunds {
        account: AccountId,
        needed: Amount,
        available: Amount,
    },
    /// The external ledger node refused the transfer.
    Rejected(String),
}

impl std::fmt::Display for TransferFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferFailed::UnknownAccount(id) => write!(f, "Unknown account: {}", id),
            TransferFailed::InsufficientFunds {
                account,
                needed,
                available,
            } => write!(
                f,
                "Insufficient funds for {}: {} < {}",
                account, available, needed
            ),
            TransferFailed::Rejected(msg) => write!(f, "Transfer rejected: {}", msg),
        }
    }
}

impl std::error::Error for TransferFailed {}

// ============================================================================
// TRANSACTION JOURNAL
// ============================================================================

/// What a journal entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    Register,
    Transfer,
    Escrow,
    Payout,
    Refund,
}

/// A single applied transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub kind: TxKind,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
    pub timestamp: u64,
}

impl Transaction {
    fn new(kind: TxKind, from: &str, to: &str, amount: Amount) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            from: from.to_string(),
            to: to.to_string(),
            amount,
            timestamp: now(),
        }
    }
}

// ============================================================================
// VALUE LEDGER TRAIT
// ============================================================================

/// Value-transfer capability the settlement components depend on.
pub trait ValueLedger {
    /// Atomic transfer: either fully applies or fails with no state change.
    /// The recipient account is created on first credit; the sender must
    /// exist and hold at least `amount`.
    fn transfer(
        &mut self,
        kind: TxKind,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<(), TransferFailed>;

    /// Synchronous balance query. Unknown accounts read zero.
    fn balance_of(&self, id: &str) -> Amount;
}

// ============================================================================
// IN-MEMORY ACCOUNT LEDGER
// ============================================================================

/// The in-process ledger: balances plus an append-only journal of every
/// applied transfer.
#[derive(Debug, Default)]
pub struct AccountLedger {
    balances: HashMap<AccountId, Amount>,
    journal: Vec<Transaction>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account with an initial balance. Re-registering an existing
    /// account is a no-op. Returns the resulting balance.
    pub fn register(&mut self, id: &str, initial: Amount) -> Amount {
        if let Some(balance) = self.balances.get(id) {
            return *balance;
        }
        self.balances.insert(id.to_string(), initial);
        self.journal
            .push(Transaction::new(TxKind::Register, "GENESIS", id, initial));
        initial
    }

    pub fn journal(&self) -> &[Transaction] {
        &self.journal
    }

    /// Journal entries touching the given account.
    pub fn transactions_for(&self, id: &str) -> Vec<&Transaction> {
        self.journal
            .iter()
            .filter(|tx| tx.from == id || tx.to == id)
            .collect()
    }

    pub fn account_count(&self) -> usize {
        self.balances.len()
    }
}

impl ValueLedger for AccountLedger {
    fn transfer(
        &mut self,
        kind: TxKind,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<(), TransferFailed> {
        let available = self
            .balances
            .get(from)
            .copied()
            .ok_or_else(|| TransferFailed::UnknownAccount(from.to_string()))?;

        if available < amount {
            return Err(TransferFailed::InsufficientFunds {
                account: from.to_string(),
                needed: amount,
                available,
            });
        }

        *self.balances.get_mut(from).unwrap() -= amount;
        *self.balances.entry(to.to_string()).or_insert(0) += amount;
        self.journal.push(Transaction::new(kind, from, to, amount));
        Ok(())
    }

    fn balance_of(&self, id: &str) -> Amount {
        self.balances.get(id).copied().unwrap_or(0)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Compute SHA256 hash, hex-encoded.
pub fn hash(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Deterministic escrow account for a settlement component.
pub fn escrow_account(label: &str) -> AccountId {
    format!("escrow_{}", &hash(label)[..16])
}
