use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountId, LedgerError};

const MUST_BE_POSITIVE: &str = "must be positive";

/// Credit an account from outside the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub id: AccountId,
    pub amount: Decimal,
}

/// Move money between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
}

impl TopUpRequest {
    pub fn new(id: AccountId, amount: Decimal) -> Self {
        Self { id, amount }
    }

    /// Checks `id` then `amount`; the first violation is returned.
    pub fn validate(&self) -> Result<(), LedgerError> {
        ensure_positive_id("id", self.id)?;
        ensure_positive_amount(self.amount)
    }
}

impl TransferRequest {
    pub fn new(from: AccountId, to: AccountId, amount: Decimal) -> Self {
        Self { from, to, amount }
    }

    /// Checks `from`, `to`, then `amount`; the first violation is returned.
    pub fn validate(&self) -> Result<(), LedgerError> {
        ensure_positive_id("from", self.from)?;
        ensure_positive_id("to", self.to)?;
        ensure_positive_amount(self.amount)
    }
}

fn ensure_positive_id(field: &'static str, id: AccountId) -> Result<(), LedgerError> {
    if id <= 0 {
        return Err(LedgerError::validation(field, MUST_BE_POSITIVE));
    }
    Ok(())
}

fn ensure_positive_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount", MUST_BE_POSITIVE));
    }
    Ok(())
}
