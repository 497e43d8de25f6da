//! Transport-agnostic request gateway
//!
//! Maps the HTTP-style operations onto the ledger and shapes the results for
//! the wire. Credential hashes never leave this layer. Routing, body parsing
//! and status lines belong to whatever server embeds it:
//!
//! | Route | Method |
//! |---|---|
//! | `GET /accounts` | [`Gateway::list_accounts`] |
//! | `GET /accounts/{id}` | [`Gateway::get_account`] |
//! | `GET /accounts/{id}/balance` | [`Gateway::get_balance`] |
//! | `POST /accounts` | [`Gateway::create_account`] |
//! | `PUT /accounts/{id}` | [`Gateway::update_account`] |
//! | `GET /transfers` | [`Gateway::list_transfers`] |
//! | `POST /transfers` | [`Gateway::create_transfer`] |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;
use crate::traits::LedgerStorage;
use crate::types::*;

/// Account as shown to clients, without the credential hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub name: String,
    pub tax_id: u64,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            tax_id: account.tax_id,
            balance: account.balance,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    pub id: String,
    pub balance: i64,
}

/// Body of `POST /accounts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    #[serde(alias = "cpf")]
    pub tax_id: u64,
    pub secret: String,
    #[serde(default)]
    pub balance: i64,
}

impl From<CreateAccountRequest> for NewAccount {
    fn from(request: CreateAccountRequest) -> Self {
        NewAccount::new(request.name, request.tax_id, request.secret)
            .with_opening_balance(request.balance)
    }
}

/// Body of `PUT /accounts/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "cpf")]
    pub tax_id: Option<u64>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl From<UpdateAccountRequest> for AccountUpdate {
    fn from(request: UpdateAccountRequest) -> Self {
        AccountUpdate {
            name: request.name,
            tax_id: request.tax_id,
            secret: request.secret,
        }
    }
}

/// Body of `POST /transfers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransferRequest {
    #[serde(alias = "account_origin_id")]
    pub origin_account_id: String,
    #[serde(alias = "account_destination_id")]
    pub destination_account_id: String,
    pub amount: i64,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl From<CreateTransferRequest> for TransferRequest {
    fn from(request: CreateTransferRequest) -> Self {
        TransferRequest {
            origin_account_id: request.origin_account_id,
            destination_account_id: request.destination_account_id,
            amount: request.amount,
            idempotency_key: request.idempotency_key,
        }
    }
}

/// Structured error returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&LedgerError> for ErrorBody {
    fn from(err: &LedgerError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Outcome of `POST /transfers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    pub status: TransferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<Transfer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl TransferResponse {
    fn accepted(transfer: Transfer) -> Self {
        Self {
            status: TransferStatus::Accepted,
            transfer: Some(transfer),
            error: None,
        }
    }

    fn rejected(err: &LedgerError) -> Self {
        Self {
            status: TransferStatus::Rejected,
            transfer: None,
            error: Some(err.into()),
        }
    }
}

/// HTTP status an embedding server should use for an error
pub fn http_status(err: &LedgerError) -> u16 {
    match err {
        LedgerError::AccountNotFound(_) | LedgerError::TransferNotFound(_) => 404,
        LedgerError::DuplicateAccount(_)
        | LedgerError::DuplicateTransfer(_)
        | LedgerError::IdempotencyConflict(_) => 409,
        LedgerError::InvalidAmount(_)
        | LedgerError::SelfTransfer(_)
        | LedgerError::DestinationNotFound(_)
        | LedgerError::OriginNotFound(_)
        | LedgerError::InsufficientFunds { .. }
        | LedgerError::BalanceOverflow(_)
        | LedgerError::Validation(_) => 422,
        LedgerError::CredentialHashing(_) | LedgerError::Storage(_) => 500,
    }
}

/// Request handlers over a shared ledger
pub struct Gateway<S: LedgerStorage> {
    ledger: Arc<Ledger<S>>,
}

impl<S: LedgerStorage> Clone for Gateway<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: LedgerStorage + Clone> Gateway<S> {
    pub fn new(ledger: Arc<Ledger<S>>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    /// `GET /accounts`
    pub async fn list_accounts(&self) -> LedgerResult<Vec<AccountView>> {
        Ok(self
            .ledger
            .list_accounts()
            .await?
            .into_iter()
            .map(AccountView::from)
            .collect())
    }

    /// `GET /accounts/{id}`
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<AccountView> {
        Ok(self.ledger.get_account(account_id).await?.into())
    }

    /// `GET /accounts/{id}/balance`
    pub async fn get_balance(&self, account_id: &str) -> LedgerResult<BalanceView> {
        let balance = self.ledger.get_balance(account_id).await?;
        Ok(BalanceView {
            id: account_id.to_string(),
            balance,
        })
    }

    /// `POST /accounts`
    pub async fn create_account(&self, request: CreateAccountRequest) -> LedgerResult<AccountView> {
        Ok(self.ledger.create_account(request.into()).await?.into())
    }

    /// `PUT /accounts/{id}`
    pub async fn update_account(
        &self,
        account_id: &str,
        request: UpdateAccountRequest,
    ) -> LedgerResult<AccountView> {
        Ok(self
            .ledger
            .update_account(account_id, request.into())
            .await?
            .into())
    }

    /// `GET /transfers`
    pub async fn list_transfers(&self) -> LedgerResult<Vec<Transfer>> {
        self.ledger.list_transfers().await
    }

    /// `POST /transfers`
    ///
    /// Business rejections come back as a `rejected` response carrying the
    /// error code; only infrastructure failures are returned as `Err`.
    pub async fn create_transfer(
        &self,
        request: CreateTransferRequest,
    ) -> LedgerResult<TransferResponse> {
        match self.ledger.submit_transfer(request.into()).await {
            Ok(transfer) => Ok(TransferResponse::accepted(transfer)),
            Err(err) if err.is_rejection() => Ok(TransferResponse::rejected(&err)),
            Err(err) => Err(err),
        }
    }
}
