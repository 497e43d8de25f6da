//! Ledger module containing the account store and transfer settlement

pub mod account;
pub mod core;
pub mod transfer;

pub use self::account::*;
pub use self::core::*;
pub use self::transfer::*;
