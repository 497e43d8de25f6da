//! Validation utilities

use crate::traits::*;
use crate::types::*;

/// Validate that a transfer amount is positive
pub fn validate_positive_amount(amount: i64) -> LedgerResult<()> {
    if amount <= 0 {
        Err(LedgerError::InvalidAmount(amount))
    } else {
        Ok(())
    }
}

/// Validate that an opening balance keeps the account non-negative
pub fn validate_opening_balance(balance: i64) -> LedgerResult<()> {
    if balance < 0 {
        return Err(LedgerError::Validation(format!(
            "Opening balance cannot be negative: {}",
            balance
        )));
    }

    Ok(())
}

/// Validate that an account ID is usable as a key
pub fn validate_account_id(account_id: &str) -> LedgerResult<()> {
    if account_id.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account ID cannot be empty".to_string(),
        ));
    }

    if account_id.len() > 64 {
        return Err(LedgerError::Validation(
            "Account ID cannot exceed 64 characters".to_string(),
        ));
    }

    if !account_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LedgerError::Validation(
            "Account ID can only contain alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > 100 {
        return Err(LedgerError::Validation(
            "Account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Account validator that also checks the id format and display name
pub struct EnhancedAccountValidator;

impl AccountValidator for EnhancedAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        DefaultAccountValidator.validate_account(account)?;
        validate_account_id(&account.id)?;
        validate_account_name(&account.name)?;
        Ok(())
    }
}
