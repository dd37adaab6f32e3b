use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Server-assigned account identifier (`BIGSERIAL`).
pub type AccountId = i64;

/// External user identifier, resolved from the caller's credentials.
pub type UserId = i64;

/// A monetary account. Each owner holds at most one.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Immutable after creation
    #[sqlx(rename = "owner_id")]
    pub owner: UserId,
    /// Never negative
    pub balance: Decimal,
}

impl Account {
    /// A freshly opened account: zero balance.
    pub fn opened(id: AccountId, owner: UserId) -> Self {
        Self {
            id,
            owner,
            balance: Decimal::ZERO,
        }
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }

    /// The shape handed back to callers. The owner is the caller itself,
    /// so it is left out.
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            balance: self.balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: AccountId,
    pub balance: Decimal,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        account.view()
    }
}
