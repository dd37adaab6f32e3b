// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Mutex, Once};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgConnectOptions;
use tally::config::DatabaseConfig;
use tally::{Account, AccountId, AccountStore, LedgerError, LedgerStore, UserId};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,tally=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Shorthand for whole-unit amounts.
pub fn amount(units: i64) -> Decimal {
    Decimal::from(units)
}

// ========================
// In-memory store
// ========================

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    next_id: AccountId,
    calls: Vec<&'static str>,
}

/// Fake store with the same observable semantics as the Postgres one.
/// Records which primitives were called so tests can assert that rejected
/// requests never reached it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn balance(&self, id: AccountId) -> Option<Decimal> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(&id)
            .map(|account| account.balance)
    }

    /// Seed an account directly, bypassing the call log.
    pub fn seed(&self, owner: UserId, balance: Decimal) -> AccountId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        let mut account = Account::opened(id, owner);
        account.balance = balance;
        state.accounts.insert(id, account);
        id
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create(&self, owner: UserId) -> Result<Account, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create");
        if state.accounts.values().any(|account| account.owner == owner) {
            return Err(LedgerError::DuplicateAccount(owner));
        }
        state.next_id += 1;
        let account = Account::opened(state.next_id, owner);
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("get");
        state
            .accounts
            .get(&id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn credit(&self, id: AccountId, amount: Decimal) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("credit");
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound(id))?;
        account.balance += amount;
        Ok(())
    }

    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("transfer");
        let source_balance = state
            .accounts
            .get(&from)
            .map(|account| account.balance)
            .ok_or(LedgerError::AccountNotFound(from))?;
        if source_balance < amount {
            return Err(LedgerError::InsufficientBalance(from));
        }
        if !state.accounts.contains_key(&to) {
            return Err(LedgerError::AccountNotFound(to));
        }
        if let Some(account) = state.accounts.get_mut(&from) {
            account.balance -= amount;
        }
        if let Some(account) = state.accounts.get_mut(&to) {
            account.balance += amount;
        }
        Ok(())
    }
}

// ========================
// PostgreSQL
// ========================

/// A store bound to a throwaway schema.
pub struct TestLedger {
    pub store: LedgerStore,
    url: String,
    schema: String,
}

impl TestLedger {
    /// Configuration pointing at this ledger's schema, for code that opens
    /// its own pool.
    pub fn database_config(&self) -> DatabaseConfig {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        DatabaseConfig {
            max_connections: 2,
            ..DatabaseConfig::new(format!(
                "{}{}options[search_path]={}",
                self.url, separator, self.schema
            ))
        }
    }

    /// Sum of every balance in the schema.
    pub async fn total_balance(&self) -> Result<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar("SELECT SUM(balance) FROM accounts")
            .fetch_one(self.store.pool())
            .await
            .context("Failed to sum balances")?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }

    pub async fn balance(&self, id: AccountId) -> Result<Decimal> {
        Ok(self.store.get(id).await?.balance)
    }

    /// Drop the schema and drain the pool.
    pub async fn teardown(self) -> Result<()> {
        sqlx::query(&format!("DROP SCHEMA \"{}\" CASCADE", self.schema))
            .execute(self.store.pool())
            .await
            .context("Failed to drop test schema")?;
        self.store.close().await;
        Ok(())
    }
}

/// Connect to `TEST_DATABASE_URL` inside a fresh schema with the accounts
/// table migrated.
pub async fn test_ledger() -> Result<TestLedger> {
    init_tracing();

    let url = std::env::var("TEST_DATABASE_URL")
        .context("TEST_DATABASE_URL must be set to run PostgreSQL tests")?;

    let schema = format!("tally_test_{}", uuid::Uuid::new_v4().simple());
    let config = DatabaseConfig {
        max_connections: 4,
        ..DatabaseConfig::new(url.clone())
    };

    let admin = LedgerStore::connect(&config).await?;
    sqlx::query(&format!("CREATE SCHEMA \"{}\"", schema))
        .execute(admin.pool())
        .await
        .context("Failed to create test schema")?;
    admin.close().await;

    let options = PgConnectOptions::from_str(&url)
        .context("Invalid TEST_DATABASE_URL")?
        .options([("search_path", schema.as_str())]);
    let store = LedgerStore::connect_with(options, &config).await?;
    store.migrate().await?;

    Ok(TestLedger { store, url, schema })
}
