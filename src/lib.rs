pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod storage;
pub mod telemetry;

pub use application::AccountService;
pub use domain::*;
pub use storage::{AccountStore, LedgerStore};
