// Application layer - authorization and orchestration over the ledger store.

pub mod auth;
pub mod service;

pub use auth::*;
pub use service::*;
