mod ledger;

pub use ledger::*;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Account, AccountId, LedgerError, UserId};

/// SQL migration for the accounts table
pub const MIGRATION_001_ACCOUNTS: &str = include_str!("migrations/001_accounts.sql");

/// Reverts [`MIGRATION_001_ACCOUNTS`]
pub const MIGRATION_001_ACCOUNTS_DOWN: &str = include_str!("migrations/001_accounts.down.sql");

/// Atomic primitives over persistent account rows.
///
/// Implementations are the only writers of account state. Amounts passed to
/// `credit` and `transfer` are already known to be strictly positive.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Open a zero-balance account for `owner`.
    async fn create(&self, owner: UserId) -> Result<Account, LedgerError>;

    async fn get(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Add `amount` to the balance of `id`.
    async fn credit(&self, id: AccountId, amount: Decimal) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to` as one unit of work. Either both
    /// balances change or neither does.
    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError>;
}
