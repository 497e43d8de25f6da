//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::types::*;

/// Storage abstraction for the ledger system
///
/// Implementations own the account records and the transfer history. Every
/// method takes `&self`: a storage value is shared between concurrent callers
/// and must do its own synchronisation.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Insert a new account, failing if the id is already taken
    async fn insert_account(&self, account: Account) -> LedgerResult<()>;

    /// Get an account by ID
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>>;

    /// Check whether an account exists
    async fn account_exists(&self, account_id: &str) -> LedgerResult<bool> {
        Ok(self.get_account(account_id).await?.is_some())
    }

    /// Consistent snapshot of all accounts in insertion order
    async fn list_accounts(&self) -> LedgerResult<Vec<Account>>;

    /// Apply field changes to an account in place and return the new record
    async fn update_account(
        &self,
        account_id: &str,
        changes: &AccountChanges,
    ) -> LedgerResult<Account>;

    /// Settle `transfer`: debit its origin, credit its destination and
    /// append it to the history as one step.
    ///
    /// This is the only operation allowed to change a balance. Both account
    /// records stay locked until the history entry is written, so history
    /// order is settlement order. `created_at` is stamped inside the same
    /// critical section. On any error no balance changes and nothing is
    /// recorded.
    async fn debit_credit(&self, transfer: Transfer) -> LedgerResult<Transfer>;

    /// Get a transfer by ID
    async fn get_transfer(&self, transfer_id: &str) -> LedgerResult<Option<Transfer>>;

    /// Transfers in settlement order
    async fn list_transfers(&self) -> LedgerResult<Vec<Transfer>>;
}

/// One-way secret hashing capability
pub trait CredentialHasher: Send + Sync {
    /// Produce a salted hash of `secret`
    fn hash(&self, secret: &str) -> LedgerResult<String>;

    /// Check `secret` against a stored hash. A mismatch or an unreadable
    /// hash yields `false`.
    fn verify(&self, secret: &str, credential_hash: &str) -> bool;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before it is saved
    fn validate_account(&self, account: &Account) -> LedgerResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        if account.id.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account ID cannot be empty".to_string(),
            ));
        }

        if account.balance < 0 {
            return Err(LedgerError::Validation(format!(
                "Account balance cannot be negative: {}",
                account.balance
            )));
        }

        Ok(())
    }
}
