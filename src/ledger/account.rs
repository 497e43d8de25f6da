//! Account management functionality

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SeedAccount;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_account_id, validate_opening_balance};

/// Authoritative, concurrency-safe repository of accounts
///
/// Hashes secrets on the way in and routes every balance change through
/// [`AccountStore::atomic_debit_credit`].
pub struct AccountStore<S: LedgerStorage> {
    pub(crate) storage: S,
    hasher: Arc<dyn CredentialHasher>,
    validator: Box<dyn AccountValidator>,
}

impl<S: LedgerStorage> AccountStore<S> {
    /// Create a new account store
    pub fn new(storage: S, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            storage,
            hasher,
            validator: Box::new(DefaultAccountValidator),
        }
    }

    /// Create a new account store with custom validator
    pub fn with_validator(
        storage: S,
        hasher: Arc<dyn CredentialHasher>,
        validator: Box<dyn AccountValidator>,
    ) -> Self {
        Self {
            storage,
            hasher,
            validator,
        }
    }

    /// Open a new account with a generated id.
    ///
    /// The returned record still carries the credential hash.
    pub async fn create(&self, new_account: NewAccount) -> LedgerResult<Account> {
        validate_opening_balance(new_account.opening_balance)?;

        // A hashing failure aborts creation; nothing is stored
        let credential_hash = self.hasher.hash(&new_account.secret)?;

        let account = Account::new(
            Uuid::new_v4().to_string(),
            new_account.name,
            new_account.tax_id,
            credential_hash,
            new_account.opening_balance,
        );
        self.validator.validate_account(&account)?;

        self.storage.insert_account(account.clone()).await?;
        info!(account_id = %account.id, balance = account.balance, "account created");

        Ok(account)
    }

    /// Insert a seed account under its fixed id with a pre-computed hash
    pub async fn seed(&self, seed: &SeedAccount, credential_hash: &str) -> LedgerResult<Account> {
        validate_account_id(&seed.id)?;
        validate_opening_balance(seed.balance)?;

        let account = Account::new(
            seed.id.clone(),
            seed.name.clone(),
            seed.tax_id,
            credential_hash.to_string(),
            seed.balance,
        );
        self.validator.validate_account(&account)?;

        self.storage.insert_account(account.clone()).await?;
        info!(account_id = %account.id, balance = account.balance, "seed account loaded");

        Ok(account)
    }

    /// Get an account by ID
    pub async fn get(&self, account_id: &str) -> LedgerResult<Account> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// Check whether an account exists
    pub async fn exists(&self, account_id: &str) -> LedgerResult<bool> {
        self.storage.account_exists(account_id).await
    }

    /// Snapshot of all accounts in insertion order
    pub async fn list(&self) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts().await
    }

    /// Replace the mutable fields of an account.
    ///
    /// Never changes `id`, `created_at` or `balance`.
    pub async fn update(&self, account_id: &str, update: AccountUpdate) -> LedgerResult<Account> {
        let mut candidate = self.get(account_id).await?;

        let credential_hash = match &update.secret {
            Some(secret) => Some(self.hasher.hash(secret)?),
            None => None,
        };
        let changes = AccountChanges {
            name: update.name,
            tax_id: update.tax_id,
            credential_hash,
        };

        candidate.apply_changes(&changes);
        self.validator.validate_account(&candidate)?;

        let updated = self.storage.update_account(account_id, &changes).await?;
        info!(account_id, "account updated");

        Ok(updated)
    }

    /// Atomically move the transfer's amount from its origin to its
    /// destination and record it. Returns the transfer stamped with its
    /// settlement time.
    pub async fn atomic_debit_credit(&self, transfer: Transfer) -> LedgerResult<Transfer> {
        self.storage.debit_credit(transfer).await
    }

    /// Check a candidate secret. Only a missing account is an error.
    pub async fn verify_secret(&self, account_id: &str, candidate: &str) -> LedgerResult<bool> {
        let account = self.get(account_id).await?;
        let verified = self.hasher.verify(candidate, &account.credential_hash);
        debug!(account_id, verified, "secret checked");
        Ok(verified)
    }

    /// Current balance of an account
    pub async fn balance(&self, account_id: &str) -> LedgerResult<i64> {
        Ok(self.get(account_id).await?.balance)
    }
}
