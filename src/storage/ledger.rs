use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgExecutor, PgPool, PgPoolOptions};
use tracing::{error, info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::domain::{Account, AccountId, LedgerError, UserId};

use super::{AccountStore, MIGRATION_001_ACCOUNTS, MIGRATION_001_ACCOUNTS_DOWN};

/// PostgreSQL-backed account store.
///
/// Cloning is cheap and shares the underlying pool.
#[derive(Clone)]
pub struct LedgerStore {
    pool: PgPool,
}

impl LedgerStore {
    /// Create a new store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.url).context("Invalid database URL")?;
        Self::connect_with(options, config).await
    }

    /// Connect with explicit connection options, sizing the pool from `config`.
    #[instrument(skip_all, fields(max_connections = config.max_connections))]
    pub async fn connect_with(options: PgConnectOptions, config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        info!("PostgreSQL connection pool established");
        Ok(Self::new(pool))
    }

    /// Create the schema if it is missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_ACCOUNTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Drop the schema, discarding every account.
    pub async fn reset(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_ACCOUNTS_DOWN)
            .execute(&self.pool)
            .await
            .context("Failed to revert migration 001")?;
        warn!("Accounts table dropped");
        Ok(())
    }

    /// Connect and make sure the schema is ready.
    pub async fn init(config: &DatabaseConfig) -> Result<Self> {
        let store = Self::connect(config).await?;
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Wait for checked-out connections to return, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL connection pool closed");
    }

    async fn fetch_account<'e, E>(executor: E, id: AccountId) -> Result<Account, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Account>("SELECT id, owner_id, balance FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
            .context("Failed to fetch account")?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Body of the transfer unit of work. Any error leaves the caller
    /// responsible for discarding the writes made on `conn`.
    async fn apply_transfer(
        conn: &mut PgConnection,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        Self::fetch_account(&mut *conn, from).await?;

        // The sufficiency check and the write are one statement; Postgres
        // re-evaluates the predicate against the latest row version after
        // waiting on a concurrent writer's lock.
        let debited = sqlx::query(
            "UPDATE accounts SET balance = balance - $2 WHERE id = $1 AND balance >= $2",
        )
        .bind(from)
        .bind(amount)
        .execute(&mut *conn)
        .await
        .context("Failed to debit account")?;

        if debited.rows_affected() == 0 {
            return Err(LedgerError::InsufficientBalance(from));
        }

        let credited = sqlx::query("UPDATE accounts SET balance = balance + $2 WHERE id = $1")
            .bind(to)
            .bind(amount)
            .execute(&mut *conn)
            .await
            .context("Failed to credit account")?;

        if credited.rows_affected() == 0 {
            return Err(LedgerError::AccountNotFound(to));
        }

        Ok(())
    }
}

#[async_trait]
impl AccountStore for LedgerStore {
    #[instrument(skip(self))]
    async fn create(&self, owner: UserId) -> Result<Account, LedgerError> {
        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (owner_id) VALUES ($1) RETURNING id, owner_id, balance",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                LedgerError::DuplicateAccount(owner)
            }
            other => {
                LedgerError::StoreFailure(anyhow::Error::new(other).context("Failed to create account"))
            }
        })?;

        info!(account_id = account.id, "Account created");
        Ok(account)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        Self::fetch_account(&self.pool, id).await
    }

    #[instrument(skip(self))]
    async fn credit(&self, id: AccountId, amount: Decimal) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE accounts SET balance = balance + $2 WHERE id = $1")
            .bind(id)
            .bind(amount)
            .execute(&self.pool)
            .await
            .context("Failed to credit account")?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::AccountNotFound(id));
        }

        info!("Account credited");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        // Dropping `tx` on an early return rolls it back; the explicit
        // rollback below exists so a failing rollback is reported.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transfer")?;

        let outcome = Self::apply_transfer(&mut tx, from, to, amount).await;
        let finished = match outcome {
            Ok(()) => tx.commit().await,
            Err(_) => tx.rollback().await,
        };
        settle_transfer(outcome, finished)
    }
}

/// Combine a transfer's outcome with the result of committing it (on success)
/// or rolling it back (on failure). A failure to finish the database
/// transaction replaces the outcome with `StoreFailure`.
fn settle_transfer(
    outcome: Result<(), LedgerError>,
    finished: Result<(), sqlx::Error>,
) -> Result<(), LedgerError> {
    match (outcome, finished) {
        (Ok(()), Ok(())) => {
            info!("Transfer committed");
            Ok(())
        }
        (Ok(()), Err(commit_err)) => Err(LedgerError::StoreFailure(
            anyhow::Error::new(commit_err).context("Failed to commit transfer"),
        )),
        (Err(err), Ok(())) => {
            warn!(error = %err, "Transfer rolled back");
            Err(err)
        }
        (Err(err), Err(rollback_err)) => {
            error!(error = %rollback_err, cause = %err, "Transfer rollback failed");
            Err(LedgerError::StoreFailure(
                anyhow::Error::new(rollback_err).context("Failed to roll back transfer"),
            ))
        }
    }
}
