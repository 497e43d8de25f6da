//! In-memory storage implementation
//!
//! Each account lives behind its own mutex so settlements touching disjoint
//! accounts run in parallel. Any operation that holds more than one account
//! lock acquires them in ascending id order, which rules out lock cycles.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::traits::*;
use crate::types::*;

type AccountCell = Arc<Mutex<Account>>;

#[derive(Debug, Default)]
struct AccountTable {
    /// Insertion order, used for listing
    order: Vec<String>,
    records: HashMap<String, AccountCell>,
}

impl AccountTable {
    fn cell(&self, account_id: &str) -> LedgerResult<AccountCell> {
        self.records
            .get(account_id)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }
}

#[derive(Debug, Default)]
struct TransferHistory {
    entries: Vec<Transfer>,
    index: HashMap<String, usize>,
}

impl TransferHistory {
    fn push(&mut self, transfer: Transfer) {
        self.index.insert(transfer.id.clone(), self.entries.len());
        self.entries.push(transfer);
    }
}

fn poisoned<T>(_: PoisonError<T>) -> LedgerError {
    LedgerError::Storage("lock poisoned".to_string())
}

/// In-memory storage for tests, demos and single-process deployments
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    accounts: Arc<RwLock<AccountTable>>,
    transfers: Arc<RwLock<TransferHistory>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        let mut transfers = self.transfers.write().map_err(poisoned)?;
        *accounts = AccountTable::default();
        *transfers = TransferHistory::default();
        Ok(())
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn insert_account(&self, account: Account) -> LedgerResult<()> {
        let mut table = self.accounts.write().map_err(poisoned)?;
        if table.records.contains_key(&account.id) {
            return Err(LedgerError::DuplicateAccount(account.id));
        }

        table.order.push(account.id.clone());
        table
            .records
            .insert(account.id.clone(), Arc::new(Mutex::new(account)));
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        let cell = {
            let table = self.accounts.read().map_err(poisoned)?;
            match table.records.get(account_id) {
                Some(cell) => cell.clone(),
                None => return Ok(None),
            }
        };
        let account = cell.lock().map_err(poisoned)?.clone();
        Ok(Some(account))
    }

    async fn account_exists(&self, account_id: &str) -> LedgerResult<bool> {
        let table = self.accounts.read().map_err(poisoned)?;
        Ok(table.records.contains_key(account_id))
    }

    async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        let table = self.accounts.read().map_err(poisoned)?;

        // Hold every record at once so the snapshot never straddles a settlement
        let mut ids: Vec<&String> = table.order.iter().collect();
        ids.sort();
        let mut guards: HashMap<&str, MutexGuard<'_, Account>> = HashMap::with_capacity(ids.len());
        for id in ids {
            let guard = table.records[id].lock().map_err(poisoned)?;
            guards.insert(id.as_str(), guard);
        }

        Ok(table
            .order
            .iter()
            .map(|id| (*guards[id.as_str()]).clone())
            .collect())
    }

    async fn update_account(
        &self,
        account_id: &str,
        changes: &AccountChanges,
    ) -> LedgerResult<Account> {
        let cell = self.accounts.read().map_err(poisoned)?.cell(account_id)?;
        let mut account = cell.lock().map_err(poisoned)?;
        account.apply_changes(changes);
        Ok(account.clone())
    }

    async fn debit_credit(&self, mut transfer: Transfer) -> LedgerResult<Transfer> {
        let origin_id = transfer.origin_account_id.as_str();
        let destination_id = transfer.destination_account_id.as_str();

        // Locking the same mutex twice would deadlock
        if origin_id == destination_id {
            return Err(LedgerError::SelfTransfer(origin_id.to_string()));
        }

        let (origin, destination) = {
            let table = self.accounts.read().map_err(poisoned)?;
            (table.cell(origin_id)?, table.cell(destination_id)?)
        };

        // Accounts first, history second
        let origin_first = origin_id < destination_id;
        let (first, second) = if origin_first {
            (&origin, &destination)
        } else {
            (&destination, &origin)
        };
        let mut first = first.lock().map_err(poisoned)?;
        let mut second = second.lock().map_err(poisoned)?;
        let mut history = self.transfers.write().map_err(poisoned)?;

        if history.index.contains_key(&transfer.id) {
            return Err(LedgerError::DuplicateTransfer(transfer.id));
        }

        if origin_first {
            first.transfer_to(&mut second, transfer.amount)?;
        } else {
            second.transfer_to(&mut first, transfer.amount)?;
        }

        transfer.created_at = Utc::now();
        history.push(transfer.clone());
        Ok(transfer)
    }

    async fn get_transfer(&self, transfer_id: &str) -> LedgerResult<Option<Transfer>> {
        let history = self.transfers.read().map_err(poisoned)?;
        Ok(history
            .index
            .get(transfer_id)
            .map(|&position| history.entries[position].clone()))
    }

    async fn list_transfers(&self) -> LedgerResult<Vec<Transfer>> {
        Ok(self.transfers.read().map_err(poisoned)?.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, balance: i64) -> Account {
        Account::new(id.to_string(), format!("Holder {id}"), 1, "hash".to_string(), balance)
    }

    fn transfer(id: &str, origin: &str, destination: &str, amount: i64) -> Transfer {
        Transfer::accepted(id.to_string(), &TransferRequest::new(origin, destination, amount))
    }

    async fn seeded() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.insert_account(account("x", 100)).await.unwrap();
        storage.insert_account(account("y", 50)).await.unwrap();
        storage
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let storage = seeded().await;

        let x = storage.get_account("x").await.unwrap().unwrap();
        assert_eq!(x.balance, 100);
        assert!(storage.get_account("missing").await.unwrap().is_none());
        assert!(storage.account_exists("y").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let storage = seeded().await;

        let err = storage.insert_account(account("x", 1)).await.unwrap_err();
        assert_eq!(err, LedgerError::DuplicateAccount("x".to_string()));
        assert_eq!(storage.get_account("x").await.unwrap().unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let storage = MemoryStorage::new();
        for id in ["m", "a", "z"] {
            storage.insert_account(account(id, 0)).await.unwrap();
        }

        let ids: Vec<String> = storage
            .list_accounts()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["m", "a", "z"]);
    }

    #[tokio::test]
    async fn test_debit_credit_both_directions() {
        let storage = seeded().await;

        storage.debit_credit(transfer("t1", "x", "y", 30)).await.unwrap();
        storage.debit_credit(transfer("t2", "y", "x", 10)).await.unwrap();

        assert_eq!(storage.get_account("x").await.unwrap().unwrap().balance, 80);
        assert_eq!(storage.get_account("y").await.unwrap().unwrap().balance, 70);
    }

    #[tokio::test]
    async fn test_debit_credit_missing_account_changes_nothing() {
        let storage = seeded().await;

        let err = storage
            .debit_credit(transfer("t1", "x", "nope", 10))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::AccountNotFound("nope".to_string()));
        assert_eq!(storage.get_account("x").await.unwrap().unwrap().balance, 100);
        assert!(storage.list_transfers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_debit_credit_same_account_rejected() {
        let storage = seeded().await;

        let err = storage
            .debit_credit(transfer("t1", "x", "x", 10))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::SelfTransfer("x".to_string()));
    }

    #[tokio::test]
    async fn test_insufficient_funds_records_nothing() {
        let storage = seeded().await;

        let err = storage
            .debit_credit(transfer("t1", "y", "x", 51))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert!(storage.list_transfers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_transfer_id_moves_no_funds() {
        let storage = seeded().await;
        storage.debit_credit(transfer("t1", "x", "y", 30)).await.unwrap();

        let err = storage
            .debit_credit(transfer("t1", "x", "y", 30))
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::DuplicateTransfer("t1".to_string()));
        assert_eq!(storage.get_account("x").await.unwrap().unwrap().balance, 70);
        assert_eq!(storage.get_account("y").await.unwrap().unwrap().balance, 80);
        assert_eq!(storage.list_transfers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_does_not_touch_balance() {
        let storage = seeded().await;
        let changes = AccountChanges {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };

        let updated = storage.update_account("x", &changes).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.balance, 100);

        let err = storage.update_account("nope", &changes).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_transfer_history_in_settlement_order() {
        let storage = seeded().await;
        let before = Utc::now();

        let first = storage.debit_credit(transfer("t1", "x", "y", 1)).await.unwrap();
        let second = storage.debit_credit(transfer("t2", "y", "x", 2)).await.unwrap();

        assert!(first.created_at >= before);
        assert!(first.created_at <= second.created_at);
        assert_eq!(storage.list_transfers().await.unwrap(), vec![first, second.clone()]);
        assert_eq!(storage.get_transfer("t2").await.unwrap(), Some(second));
        assert!(storage.get_transfer("t3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let storage = seeded().await;
        storage.clear().unwrap();
        assert!(storage.list_accounts().await.unwrap().is_empty());
    }
}
