use std::sync::Arc;

use tracing::warn;

use crate::config::DatabaseConfig;
use crate::domain::{Account, AccountId, LedgerError, TopUpRequest, TransferRequest, UserId};
use crate::storage::{AccountStore, LedgerStore};

/// Application service guarding the ledger: requests are validated first,
/// then the acting user's ownership is checked, and only then does the store
/// see the operation.
pub struct AccountService<S = LedgerStore> {
    store: Arc<S>,
}

impl<S> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl AccountService<LedgerStore> {
    /// Connect to the database and make sure the schema exists.
    pub async fn init(config: &DatabaseConfig) -> Result<Self, LedgerError> {
        let store = LedgerStore::init(config).await?;
        Ok(Self::new(store))
    }

    /// Connect to an existing database.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, LedgerError> {
        let store = LedgerStore::connect(config).await?;
        Ok(Self::new(store))
    }
}

impl<S: AccountStore> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open an account for `user`.
    pub async fn create(&self, user: UserId) -> Result<Account, LedgerError> {
        self.store.create(user).await
    }

    /// Fetch an account the acting user owns.
    pub async fn get(&self, id: AccountId, user: UserId) -> Result<Account, LedgerError> {
        self.owned_account(id, user).await
    }

    /// Credit an account the acting user owns.
    pub async fn top_up(&self, request: &TopUpRequest, user: UserId) -> Result<(), LedgerError> {
        request.validate()?;
        self.owned_account(request.id, user).await?;
        self.store.credit(request.id, request.amount).await
    }

    /// Move money out of an account the acting user owns.
    ///
    /// Only the source is looked up here; a missing recipient is reported by
    /// the store from inside the transfer.
    pub async fn transfer(
        &self,
        request: &TransferRequest,
        user: UserId,
    ) -> Result<(), LedgerError> {
        request.validate()?;
        self.owned_account(request.from, user).await?;
        self.store
            .transfer(request.from, request.to, request.amount)
            .await
    }

    async fn owned_account(&self, id: AccountId, user: UserId) -> Result<Account, LedgerError> {
        let account = self.store.get(id).await?;
        if !account.is_owned_by(user) {
            warn!(account_id = id, user_id = user, "Forbidden account access");
            return Err(LedgerError::ForbiddenAccess { account: id, user });
        }
        Ok(account)
    }
}
