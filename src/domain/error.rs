use thiserror::Error;

use super::{AccountId, UserId};

/// Every way a ledger operation can fail.
///
/// The set is closed: callers translating failures into a transport status
/// match on [`LedgerError::kind`] exhaustively.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid field '{field}': {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("The account {0} does not exist")]
    AccountNotFound(AccountId),

    #[error("The user {0} already has an account")]
    DuplicateAccount(UserId),

    #[error("The account {0} does not have enough money")]
    InsufficientBalance(AccountId),

    #[error("The user {user} cannot access the account {account}")]
    ForbiddenAccess { account: AccountId, user: UserId },

    #[error("Store failure: {0:#}")]
    StoreFailure(#[from] anyhow::Error),
}

/// Fieldless discriminant of [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    AccountNotFound,
    DuplicateAccount,
    InsufficientBalance,
    ForbiddenAccess,
    StoreFailure,
}

impl LedgerError {
    pub fn validation(field: &'static str, message: &'static str) -> Self {
        LedgerError::Validation { field, message }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation { .. } => ErrorKind::Validation,
            LedgerError::AccountNotFound(_) => ErrorKind::AccountNotFound,
            LedgerError::DuplicateAccount(_) => ErrorKind::DuplicateAccount,
            LedgerError::InsufficientBalance(_) => ErrorKind::InsufficientBalance,
            LedgerError::ForbiddenAccess { .. } => ErrorKind::ForbiddenAccess,
            LedgerError::StoreFailure(_) => ErrorKind::StoreFailure,
        }
    }

    /// Message safe to show to a caller. Store internals are not leaked.
    pub fn public_message(&self) -> String {
        match self {
            LedgerError::StoreFailure(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::AccountNotFound => "account_not_found",
            ErrorKind::DuplicateAccount => "duplicate_account",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::ForbiddenAccess => "forbidden_access",
            ErrorKind::StoreFailure => "store_failure",
        }
    }

    /// Conventional HTTP status for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::InsufficientBalance => 400,
            ErrorKind::ForbiddenAccess => 403,
            ErrorKind::AccountNotFound => 404,
            ErrorKind::DuplicateAccount => 409,
            ErrorKind::StoreFailure => 500,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
