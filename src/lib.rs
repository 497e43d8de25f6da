//! # Bank Ledger
//!
//! A single-process bank ledger: accounts with balances and credentials, and
//! transfers that move funds between them.
//!
//! ## Features
//!
//! - **Atomic settlement**: a transfer debits and credits both accounts or neither
//! - **Deadlock-free locking**: per-account locks always taken in id order
//! - **Idempotent submission**: a retried transfer key returns the original record
//! - **Salted credentials**: account secrets stored as argon2id hashes
//! - **Storage abstraction**: trait-based storage with an in-memory backend
//! - **Gateway DTOs**: redacted views and error codes for an HTTP layer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bank_ledger::{LedgerConfig, Ledger, NewAccount};
//!
//! # async fn run() -> bank_ledger::LedgerResult<()> {
//! let ledger = Ledger::in_memory(&LedgerConfig::default()).await?;
//! let x = ledger
//!     .create_account(NewAccount::new("X", 1, "pw").with_opening_balance(100))
//!     .await?;
//! let y = ledger.create_account(NewAccount::new("Y", 2, "pw")).await?;
//! ledger.transfer(&x.id, &y.id, 30).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod gateway;
pub mod ledger;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use credentials::Argon2Hasher;
pub use ledger::*;
pub use traits::*;
pub use types::*;
