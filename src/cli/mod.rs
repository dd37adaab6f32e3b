use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::error;

use crate::application::{AccountService, AuthError, Authenticator, StaticTokenAuthenticator};
use crate::config::AppConfig;
use crate::domain::{AccountId, ErrorKind, LedgerError, TopUpRequest, TransferRequest, UserId};
use crate::storage::LedgerStore;
use crate::telemetry;

/// Tally - per-user accounts with atomic transfers
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Per-user monetary accounts with atomic top-ups and transfers")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./tally.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Database URL, overrides the configuration
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Bearer token identifying the acting user
    #[arg(short, long, global = true, env = "TALLY_TOKEN")]
    pub token: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the accounts table if it does not exist
    Init,

    /// Drop the accounts table and every balance in it
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Credit one of your accounts
    TopUp {
        /// Account to credit
        #[arg(allow_hyphen_values = true)]
        account: AccountId,

        /// Amount to add (e.g., "50.00" or "50")
        #[arg(allow_hyphen_values = true)]
        amount: Decimal,
    },

    /// Move money from one of your accounts to another account
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        #[arg(allow_hyphen_values = true)]
        amount: Decimal,

        /// Source account (must be yours)
        #[arg(long, allow_hyphen_values = true)]
        from: AccountId,

        /// Destination account
        #[arg(long, allow_hyphen_values = true)]
        to: AccountId,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open your account
    Create,

    /// Show one of your accounts
    Show {
        /// Account ID
        id: AccountId,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config =
            AppConfig::load(self.config.as_deref()).context("Failed to load configuration")?;
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if self.verbose {
            config.log.level = "debug".to_string();
        }
        telemetry::init(&config.log);

        match self.command {
            Commands::Init => {
                let service = AccountService::init(&config.database).await?;
                service.store().close().await;
                println!("Database initialized");
            }

            Commands::Reset { yes } => {
                if !yes {
                    bail!("Refusing to drop every account without --yes");
                }
                let store = LedgerStore::connect(&config.database).await?;
                let result = store.reset().await;
                store.close().await;
                result?;
                println!("Database reset");
            }

            command => {
                let user = acting_user(&StaticTokenAuthenticator::stub(), self.token.as_deref())?;
                let service = AccountService::connect(&config.database).await?;
                let result = run_account_command(&service, command, user, self.json).await;
                service.store().close().await;
                result?;
            }
        }

        Ok(())
    }
}

fn acting_user(auth: &impl Authenticator, token: Option<&str>) -> Result<UserId, AuthError> {
    auth.authenticate(token.unwrap_or_default())
}

async fn run_account_command(
    service: &AccountService,
    command: Commands,
    user: UserId,
    json: bool,
) -> Result<()> {
    match command {
        Commands::Account(AccountCommands::Create) => {
            let account = service.create(user).await?;
            if json {
                println!("{}", serde_json::to_string(&account.view())?);
            } else {
                println!("Created account {}", account.id);
            }
        }

        Commands::Account(AccountCommands::Show { id }) => {
            let account = service.get(id, user).await?;
            if json {
                println!("{}", serde_json::to_string(&account.view())?);
            } else {
                println!("Account: {}", account.id);
                println!("  Balance: {}", account.balance);
            }
        }

        Commands::TopUp { account, amount } => {
            service
                .top_up(&TopUpRequest::new(account, amount), user)
                .await?;
            if json {
                println!("{{}}");
            } else {
                println!("Topped up account {} with {}", account, amount);
            }
        }

        Commands::Transfer { amount, from, to } => {
            service
                .transfer(&TransferRequest::new(from, to, amount), user)
                .await?;
            if json {
                println!("{{}}");
            } else {
                println!("Transferred {} from account {} to account {}", amount, from, to);
            }
        }

        Commands::Init | Commands::Reset { .. } => bail!("Command does not act on an account"),
    }
    Ok(())
}

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(ledger_err) = err.downcast_ref::<LedgerError>() {
        return match ledger_err.kind() {
            ErrorKind::Validation => 10,
            ErrorKind::AccountNotFound => 11,
            ErrorKind::DuplicateAccount => 12,
            ErrorKind::InsufficientBalance => 13,
            ErrorKind::ForbiddenAccess => 14,
            ErrorKind::StoreFailure => 20,
        };
    }
    if err.downcast_ref::<AuthError>().is_some() {
        return 15;
    }
    1
}

/// Print a failed command's error to stderr. Store internals only reach the log.
pub fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<LedgerError>() {
        Some(ledger_err) => {
            if ledger_err.kind() == ErrorKind::StoreFailure {
                error!(error = %ledger_err, "Store failure");
            }
            eprintln!(
                "Error [{}]: {}",
                ledger_err.kind(),
                ledger_err.public_message()
            );
        }
        None => eprintln!("Error: {:#}", err),
    }
}
