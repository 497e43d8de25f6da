//! Core types and data structures for the bank ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bank account owned by the account store
///
/// Balances are kept in minor currency units (cents). The credential hash is
/// part of the stored record; redacting it is the gateway's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier, assigned on creation
    pub id: String,
    /// Display name, not unique
    pub name: String,
    /// External-world identity number (CPF, SSN, ...)
    pub tax_id: u64,
    /// Salted one-way hash of the account secret
    pub credential_hash: String,
    /// Current balance in minor units
    pub balance: i64,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account record stamped with the current time
    pub fn new(
        id: String,
        name: String,
        tax_id: u64,
        credential_hash: String,
        balance: i64,
    ) -> Self {
        Self {
            id,
            name,
            tax_id,
            credential_hash,
            balance,
            created_at: Utc::now(),
        }
    }

    /// Apply already-hashed field changes. `id`, `created_at` and `balance`
    /// are never touched here.
    pub fn apply_changes(&mut self, changes: &AccountChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(tax_id) = changes.tax_id {
            self.tax_id = tax_id;
        }
        if let Some(hash) = &changes.credential_hash {
            self.credential_hash = hash.clone();
        }
    }

    /// Move `amount` from this account into `destination`.
    ///
    /// Both sides are checked before either balance is written, so a failure
    /// leaves both records untouched.
    pub fn transfer_to(&mut self, destination: &mut Account, amount: i64) -> LedgerResult<()> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        if self.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account_id: self.id.clone(),
                balance: self.balance,
                requested: amount,
            });
        }

        let credited = destination
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(destination.id.clone()))?;

        self.balance -= amount;
        destination.balance = credited;
        Ok(())
    }
}

/// Fields a caller supplies to open an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub tax_id: u64,
    pub secret: String,
    /// Starting balance in minor units, zero unless set
    pub opening_balance: i64,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, tax_id: u64, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tax_id,
            secret: secret.into(),
            opening_balance: 0,
        }
    }

    pub fn with_opening_balance(mut self, balance: i64) -> Self {
        self.opening_balance = balance;
        self
    }
}

/// Caller-facing account update; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub tax_id: Option<u64>,
    /// New plaintext secret, hashed before it reaches storage
    pub secret: Option<String>,
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tax_id.is_none() && self.secret.is_none()
    }
}

/// Storage-level account update with the secret already hashed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub tax_id: Option<u64>,
    pub credential_hash: Option<String>,
}

/// Outcome of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Accepted,
    Rejected,
}

/// Settled movement of funds between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Unique identifier; equals the idempotency key when one was supplied
    pub id: String,
    pub origin_account_id: String,
    pub destination_account_id: String,
    /// Amount in minor units, always positive
    pub amount: i64,
    pub status: TransferStatus,
    /// Settlement time
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    /// Build an accepted transfer stamped with the settlement time
    pub fn accepted(id: String, request: &TransferRequest) -> Self {
        Self {
            id,
            origin_account_id: request.origin_account_id.clone(),
            destination_account_id: request.destination_account_id.clone(),
            amount: request.amount,
            status: TransferStatus::Accepted,
            created_at: Utc::now(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == TransferStatus::Accepted
    }

    /// Whether this transfer involves the given account on either side
    pub fn touches(&self, account_id: &str) -> bool {
        self.origin_account_id == account_id || self.destination_account_id == account_id
    }
}

/// Request to move funds, optionally carrying an idempotency key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub origin_account_id: String,
    pub destination_account_id: String,
    pub amount: i64,
    pub idempotency_key: Option<String>,
}

impl TransferRequest {
    pub fn new(
        origin_account_id: impl Into<String>,
        destination_account_id: impl Into<String>,
        amount: i64,
    ) -> Self {
        Self {
            origin_account_id: origin_account_id.into(),
            destination_account_id: destination_account_id.into(),
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// True when `transfer` carries the same parties and amount
    pub fn matches(&self, transfer: &Transfer) -> bool {
        self.origin_account_id == transfer.origin_account_id
            && self.destination_account_id == transfer.destination_account_id
            && self.amount == transfer.amount
    }
}

/// Errors that can occur in the ledger system
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Transfer not found: {0}")]
    TransferNotFound(String),
    #[error("Invalid amount: {0} (must be positive)")]
    InvalidAmount(i64),
    #[error("Cannot transfer from account {0} to itself")]
    SelfTransfer(String),
    #[error("Destination account not found: {0}")]
    DestinationNotFound(String),
    #[error("Origin account not found: {0}")]
    OriginNotFound(String),
    #[error("Insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: String,
        balance: i64,
        requested: i64,
    },
    #[error("Credential hashing failed: {0}")]
    CredentialHashing(String),
    #[error("Account already exists: {0}")]
    DuplicateAccount(String),
    #[error("Transfer already recorded: {0}")]
    DuplicateTransfer(String),
    #[error("Idempotency key {0} was already used for a different transfer")]
    IdempotencyConflict(String),
    #[error("Balance overflow on account {0}")]
    BalanceOverflow(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Stable machine-readable code reported on rejected requests
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::TransferNotFound(_) => "transfer_not_found",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::SelfTransfer(_) => "self_transfer",
            LedgerError::DestinationNotFound(_) => "destination_not_found",
            LedgerError::OriginNotFound(_) => "origin_not_found",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::CredentialHashing(_) => "credential_hashing_error",
            LedgerError::DuplicateAccount(_) => "duplicate_account",
            LedgerError::DuplicateTransfer(_) => "duplicate_transfer",
            LedgerError::IdempotencyConflict(_) => "idempotency_conflict",
            LedgerError::BalanceOverflow(_) => "balance_overflow",
            LedgerError::Validation(_) => "validation_error",
            LedgerError::Storage(_) => "storage_error",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountNotFound(_) | LedgerError::TransferNotFound(_)
        )
    }

    /// Business rejections of a transfer, as opposed to infrastructure failures
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAmount(_)
                | LedgerError::SelfTransfer(_)
                | LedgerError::DestinationNotFound(_)
                | LedgerError::OriginNotFound(_)
                | LedgerError::AccountNotFound(_)
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::IdempotencyConflict(_)
                | LedgerError::BalanceOverflow(_)
        )
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
