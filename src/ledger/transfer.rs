//! Transfer validation, settlement and history

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ledger::AccountStore;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_positive_amount;

/// Per-key async mutexes serialising submissions that share an idempotency key
#[derive(Default)]
struct KeySlots {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeySlots {
    fn acquire(&self, key: &str) -> LedgerResult<SlotHandle<'_>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| LedgerError::Storage("idempotency slots poisoned".to_string()))?;
        let slot = slots.entry(key.to_string()).or_default().clone();
        Ok(SlotHandle {
            owner: self,
            key: key.to_string(),
            slot,
        })
    }
}

/// A claim on one key's slot; the slot is forgotten when the last claim drops
struct SlotHandle<'a> {
    owner: &'a KeySlots,
    key: String,
    slot: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for SlotHandle<'_> {
    fn drop(&mut self) {
        let Ok(mut slots) = self.owner.slots.lock() else {
            return;
        };
        // The map's handle plus ours
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}

/// Validates transfer requests and settles them against the account store
pub struct TransferLedger<S: LedgerStorage> {
    accounts: Arc<AccountStore<S>>,
    storage: S,
    key_slots: KeySlots,
}

impl<S: LedgerStorage> TransferLedger<S> {
    /// Create a transfer ledger over the given account store and history storage
    pub fn new(accounts: Arc<AccountStore<S>>, storage: S) -> Self {
        Self {
            accounts,
            storage,
            key_slots: KeySlots::default(),
        }
    }

    /// Validate and settle a transfer.
    ///
    /// Checks run in a fixed order and stop at the first failure: amount,
    /// self-transfer, destination, origin, funds. A rejected request leaves
    /// balances and history untouched.
    ///
    /// With an idempotency key, a repeat of an accepted transfer returns the
    /// original record without moving funds again.
    pub async fn submit(&self, request: TransferRequest) -> LedgerResult<Transfer> {
        let Some(key) = request.idempotency_key.clone() else {
            return self.settle(Uuid::new_v4().to_string(), &request).await;
        };

        let slot = self.key_slots.acquire(&key)?;
        let _held = slot.slot.lock().await;
        self.submit_keyed(&key, &request).await
    }

    async fn submit_keyed(&self, key: &str, request: &TransferRequest) -> LedgerResult<Transfer> {
        if let Some(existing) = self.storage.get_transfer(key).await? {
            if !request.matches(&existing) {
                warn!(idempotency_key = key, "idempotency key reused with different terms");
                return Err(LedgerError::IdempotencyConflict(key.to_string()));
            }
            debug!(transfer_id = key, "replaying settled transfer");
            return Ok(existing);
        }

        self.settle(key.to_string(), request).await
    }

    async fn settle(&self, transfer_id: String, request: &TransferRequest) -> LedgerResult<Transfer> {
        match self.validate_and_settle(transfer_id, request).await {
            Ok(transfer) => {
                info!(
                    transfer_id = %transfer.id,
                    origin = %transfer.origin_account_id,
                    destination = %transfer.destination_account_id,
                    amount = transfer.amount,
                    "transfer accepted"
                );
                Ok(transfer)
            }
            Err(err) => {
                warn!(
                    origin = %request.origin_account_id,
                    destination = %request.destination_account_id,
                    amount = request.amount,
                    code = err.code(),
                    "transfer rejected"
                );
                Err(err)
            }
        }
    }

    async fn validate_and_settle(
        &self,
        transfer_id: String,
        request: &TransferRequest,
    ) -> LedgerResult<Transfer> {
        validate_positive_amount(request.amount)?;

        if request.origin_account_id == request.destination_account_id {
            return Err(LedgerError::SelfTransfer(request.origin_account_id.clone()));
        }

        if !self.accounts.exists(&request.destination_account_id).await? {
            return Err(LedgerError::DestinationNotFound(
                request.destination_account_id.clone(),
            ));
        }

        if !self.accounts.exists(&request.origin_account_id).await? {
            return Err(LedgerError::OriginNotFound(request.origin_account_id.clone()));
        }

        self.accounts
            .atomic_debit_credit(Transfer::accepted(transfer_id, request))
            .await
    }

    /// Settled transfers in settlement order
    pub async fn list(&self) -> LedgerResult<Vec<Transfer>> {
        self.storage.list_transfers().await
    }

    /// Get a transfer by ID
    pub async fn get(&self, transfer_id: &str) -> LedgerResult<Transfer> {
        self.storage
            .get_transfer(transfer_id)
            .await?
            .ok_or_else(|| LedgerError::TransferNotFound(transfer_id.to_string()))
    }

    /// Transfers where the account appears on either side
    pub async fn for_account(&self, account_id: &str) -> LedgerResult<Vec<Transfer>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|transfer| transfer.touches(account_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashingConfig;
    use crate::credentials::Argon2Hasher;
    use crate::utils::MemoryStorage;

    struct Fixture {
        transfers: TransferLedger<MemoryStorage>,
        accounts: Arc<AccountStore<MemoryStorage>>,
        x: String,
        y: String,
    }

    async fn fixture() -> Fixture {
        let storage = MemoryStorage::new();
        let hasher = Argon2Hasher::new(&HashingConfig::fast()).unwrap();
        let accounts = Arc::new(AccountStore::new(storage.clone(), Arc::new(hasher)));
        let x = accounts
            .create(NewAccount::new("X", 1, "pw").with_opening_balance(100))
            .await
            .unwrap()
            .id;
        let y = accounts
            .create(NewAccount::new("Y", 2, "pw").with_opening_balance(50))
            .await
            .unwrap()
            .id;

        Fixture {
            transfers: TransferLedger::new(accounts.clone(), storage),
            accounts,
            x,
            y,
        }
    }

    #[tokio::test]
    async fn test_accepted_transfer_is_recorded() {
        let f = fixture().await;

        let transfer = f
            .transfers
            .submit(TransferRequest::new(&f.x, &f.y, 30))
            .await
            .unwrap();

        assert_eq!(transfer.status, TransferStatus::Accepted);
        assert_eq!(f.accounts.balance(&f.x).await.unwrap(), 70);
        assert_eq!(f.accounts.balance(&f.y).await.unwrap(), 80);
        assert_eq!(f.transfers.list().await.unwrap(), vec![transfer.clone()]);
        assert_eq!(f.transfers.get(&transfer.id).await.unwrap(), transfer);
    }

    #[tokio::test]
    async fn test_validation_order() {
        let f = fixture().await;

        let cases = [
            (TransferRequest::new("nope", "nope", 0), "invalid_amount"),
            (TransferRequest::new(&f.x, &f.x, 10_000), "self_transfer"),
            (TransferRequest::new("nope", "missing", 10_000), "destination_not_found"),
            (TransferRequest::new("nope", &f.y, 10_000), "origin_not_found"),
            (TransferRequest::new(&f.x, &f.y, 10_000), "insufficient_funds"),
        ];

        for (request, code) in cases {
            let err = f.transfers.submit(request).await.unwrap_err();
            assert_eq!(err.code(), code);
        }

        assert!(f.transfers.list().await.unwrap().is_empty());
        assert_eq!(f.accounts.balance(&f.x).await.unwrap(), 100);
        assert_eq!(f.accounts.balance(&f.y).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_idempotent_replay() {
        let f = fixture().await;
        let request = TransferRequest::new(&f.x, &f.y, 30).with_idempotency_key("order-17");

        let first = f.transfers.submit(request.clone()).await.unwrap();
        let replay = f.transfers.submit(request).await.unwrap();

        assert_eq!(first.id, "order-17");
        assert_eq!(first, replay);
        assert_eq!(f.accounts.balance(&f.x).await.unwrap(), 70);
        assert_eq!(f.transfers.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_idempotency_conflict() {
        let f = fixture().await;
        f.transfers
            .submit(TransferRequest::new(&f.x, &f.y, 30).with_idempotency_key("k"))
            .await
            .unwrap();

        let err = f
            .transfers
            .submit(TransferRequest::new(&f.x, &f.y, 31).with_idempotency_key("k"))
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::IdempotencyConflict("k".to_string()));
        assert_eq!(f.accounts.balance(&f.x).await.unwrap(), 70);
    }

    #[tokio::test]
    async fn test_rejected_key_can_be_retried() {
        let f = fixture().await;
        let request = TransferRequest::new(&f.x, &f.y, 150).with_idempotency_key("retry");

        assert!(f.transfers.submit(request.clone()).await.is_err());
        f.transfers
            .submit(TransferRequest::new(&f.y, &f.x, 50))
            .await
            .unwrap();
        let accepted = f.transfers.submit(request).await.unwrap();

        assert_eq!(accepted.id, "retry");
        assert_eq!(f.accounts.balance(&f.x).await.unwrap(), 0);
        assert_eq!(f.accounts.balance(&f.y).await.unwrap(), 150);
    }

    #[tokio::test]
    async fn test_for_account_filters_history() {
        let f = fixture().await;
        let z = f
            .accounts
            .create(NewAccount::new("Z", 3, "pw"))
            .await
            .unwrap()
            .id;

        f.transfers.submit(TransferRequest::new(&f.x, &f.y, 5)).await.unwrap();
        f.transfers.submit(TransferRequest::new(&f.x, &z, 5)).await.unwrap();

        assert_eq!(f.transfers.for_account(&z).await.unwrap().len(), 1);
        assert_eq!(f.transfers.for_account(&f.x).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_key_slots_are_released() {
        let f = fixture().await;
        f.transfers
            .submit(TransferRequest::new(&f.x, &f.y, 1).with_idempotency_key("k"))
            .await
            .unwrap();

        assert!(f.transfers.key_slots.slots.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_submission_releases_key_slot() {
        let f = fixture().await;
        let blocker = f.transfers.key_slots.acquire("k").unwrap();
        let held = blocker.slot.lock().await;

        let mut pending =
            Box::pin(f.transfers.submit(TransferRequest::new(&f.x, &f.y, 1).with_idempotency_key("k")));
        tokio::select! {
            biased;
            _ = &mut pending => panic!("submission should wait for the key"),
            _ = tokio::task::yield_now() => {}
        }
        drop(pending);
        drop(held);
        drop(blocker);

        assert!(f.transfers.key_slots.slots.lock().unwrap().is_empty());
        assert_eq!(f.accounts.balance(&f.x).await.unwrap(), 100);
    }

    /// Storage whose settlement step always fails
    #[derive(Clone)]
    struct FailingSettlement(MemoryStorage);

    #[async_trait::async_trait]
    impl LedgerStorage for FailingSettlement {
        async fn insert_account(&self, account: Account) -> LedgerResult<()> {
            self.0.insert_account(account).await
        }

        async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
            self.0.get_account(account_id).await
        }

        async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
            self.0.list_accounts().await
        }

        async fn update_account(
            &self,
            account_id: &str,
            changes: &AccountChanges,
        ) -> LedgerResult<Account> {
            self.0.update_account(account_id, changes).await
        }

        async fn debit_credit(&self, _transfer: Transfer) -> LedgerResult<Transfer> {
            Err(LedgerError::Storage("history unavailable".to_string()))
        }

        async fn get_transfer(&self, transfer_id: &str) -> LedgerResult<Option<Transfer>> {
            self.0.get_transfer(transfer_id).await
        }

        async fn list_transfers(&self) -> LedgerResult<Vec<Transfer>> {
            self.0.list_transfers().await
        }
    }

    #[tokio::test]
    async fn test_failed_settlement_moves_no_funds() {
        let storage = FailingSettlement(MemoryStorage::new());
        let hasher = Argon2Hasher::new(&HashingConfig::fast()).unwrap();
        let accounts = Arc::new(AccountStore::new(storage.clone(), Arc::new(hasher)));
        let x = accounts
            .create(NewAccount::new("X", 1, "pw").with_opening_balance(100))
            .await
            .unwrap()
            .id;
        let y = accounts.create(NewAccount::new("Y", 2, "pw")).await.unwrap().id;
        let transfers = TransferLedger::new(accounts.clone(), storage);

        let err = transfers
            .submit(TransferRequest::new(&x, &y, 30).with_idempotency_key("k"))
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::Storage("history unavailable".to_string()));
        assert_eq!(accounts.balance(&x).await.unwrap(), 100);
        assert_eq!(accounts.balance(&y).await.unwrap(), 0);
        assert!(transfers.list().await.unwrap().is_empty());
        assert!(transfers.get("k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_get_missing_transfer() {
        let f = fixture().await;
        assert_eq!(
            f.transfers.get("nope").await,
            Err(LedgerError::TransferNotFound("nope".to_string()))
        );
    }
}
