//! Main ledger orchestrator that coordinates accounts and transfers

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::LedgerConfig;
use crate::credentials::Argon2Hasher;
use crate::ledger::{AccountStore, TransferLedger};
use crate::traits::*;
use crate::types::*;
use crate::utils::MemoryStorage;

/// Single-process ledger: one account store and one transfer history over a
/// shared storage backend
///
/// All methods take `&self`; wrap the ledger in an `Arc` to share it between
/// concurrent request handlers.
pub struct Ledger<S: LedgerStorage> {
    accounts: Arc<AccountStore<S>>,
    transfers: TransferLedger<S>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend and hasher
    pub fn new(storage: S, hasher: Arc<dyn CredentialHasher>) -> Self {
        let accounts = Arc::new(AccountStore::new(storage.clone(), hasher));
        Self {
            transfers: TransferLedger::new(accounts.clone(), storage),
            accounts,
        }
    }

    /// Create a new ledger with a custom account validator
    pub fn with_validator(
        storage: S,
        hasher: Arc<dyn CredentialHasher>,
        account_validator: Box<dyn AccountValidator>,
    ) -> Self {
        let accounts = Arc::new(AccountStore::with_validator(
            storage.clone(),
            hasher,
            account_validator,
        ));
        Self {
            transfers: TransferLedger::new(accounts.clone(), storage),
            accounts,
        }
    }

    /// Build a ledger from configuration and load its seed accounts.
    ///
    /// The bootstrap secret is hashed once and shared by every seed account.
    /// Any error here means the process has no usable bootstrap data and
    /// should not start serving.
    pub async fn bootstrap(storage: S, config: &LedgerConfig) -> LedgerResult<Self> {
        let hasher = Arc::new(Argon2Hasher::new(&config.hashing)?);
        let ledger = Self::new(storage, hasher.clone());

        if config.seed_accounts.is_empty() {
            return Ok(ledger);
        }

        let secret = config.bootstrap_secret.as_deref().ok_or_else(|| {
            LedgerError::Validation("Seed accounts require a bootstrap secret".to_string())
        })?;
        let credential_hash = hasher.hash(secret)?;

        for seed in &config.seed_accounts {
            ledger.accounts.seed(seed, &credential_hash).await?;
        }
        info!(
            seeded = config.seed_accounts.len(),
            "ledger bootstrapped"
        );

        Ok(ledger)
    }

    // Account operations
    /// Open a new account
    pub async fn create_account(&self, new_account: NewAccount) -> LedgerResult<Account> {
        self.accounts.create(new_account).await
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Account> {
        self.accounts.get(account_id).await
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.accounts.list().await
    }

    /// Update an account's name, tax id or secret
    pub async fn update_account(
        &self,
        account_id: &str,
        update: AccountUpdate,
    ) -> LedgerResult<Account> {
        self.accounts.update(account_id, update).await
    }

    /// Check a candidate secret against an account's credential
    pub async fn verify_secret(&self, account_id: &str, candidate: &str) -> LedgerResult<bool> {
        self.accounts.verify_secret(account_id, candidate).await
    }

    /// Current balance of an account
    pub async fn get_balance(&self, account_id: &str) -> LedgerResult<i64> {
        self.accounts.balance(account_id).await
    }

    // Transfer operations
    /// Validate and settle a transfer
    pub async fn submit_transfer(&self, request: TransferRequest) -> LedgerResult<Transfer> {
        self.transfers.submit(request).await
    }

    /// Shorthand for a transfer without an idempotency key
    pub async fn transfer(
        &self,
        origin_id: &str,
        destination_id: &str,
        amount: i64,
    ) -> LedgerResult<Transfer> {
        self.transfers
            .submit(TransferRequest::new(origin_id, destination_id, amount))
            .await
    }

    /// Get a transfer by ID
    pub async fn get_transfer(&self, transfer_id: &str) -> LedgerResult<Transfer> {
        self.transfers.get(transfer_id).await
    }

    /// Transfers in settlement order
    pub async fn list_transfers(&self) -> LedgerResult<Vec<Transfer>> {
        self.transfers.list().await
    }

    /// Transfers involving a specific account, in settlement order
    pub async fn get_account_transfers(&self, account_id: &str) -> LedgerResult<Vec<Transfer>> {
        self.accounts.get(account_id).await?;
        self.transfers.for_account(account_id).await
    }

    // Audit operations
    /// Sum of all balances, taken from one consistent snapshot
    pub async fn total_balance(&self) -> LedgerResult<i128> {
        Ok(self
            .accounts
            .list()
            .await?
            .iter()
            .map(|account| account.balance as i128)
            .sum())
    }

    /// Validate the integrity of the ledger
    pub async fn verify_integrity(&self) -> LedgerResult<LedgerIntegrityReport> {
        let accounts = self.accounts.list().await?;
        let transfers = self.transfers.list().await?;

        let mut issues = Vec::new();
        let known: HashSet<&str> = accounts.iter().map(|a| a.id.as_str()).collect();

        for account in &accounts {
            if account.balance < 0 {
                issues.push(format!(
                    "Account {} has negative balance {}",
                    account.id, account.balance
                ));
            }
        }

        for transfer in &transfers {
            for side in [&transfer.origin_account_id, &transfer.destination_account_id] {
                if !known.contains(side.as_str()) {
                    issues.push(format!(
                        "Transfer {} references unknown account {}",
                        transfer.id, side
                    ));
                }
            }
            if transfer.amount <= 0 {
                issues.push(format!(
                    "Transfer {} has non-positive amount {}",
                    transfer.id, transfer.amount
                ));
            }
        }

        Ok(LedgerIntegrityReport {
            is_valid: issues.is_empty(),
            issues,
            account_count: accounts.len(),
            transfer_count: transfers.len(),
            total_balance: accounts.iter().map(|a| a.balance as i128).sum(),
        })
    }
}

impl Ledger<MemoryStorage> {
    /// Ledger over fresh in-memory storage
    pub async fn in_memory(config: &LedgerConfig) -> LedgerResult<Self> {
        Self::bootstrap(MemoryStorage::new(), config).await
    }
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub account_count: usize,
    pub transfer_count: usize,
    pub total_balance: i128,
}
