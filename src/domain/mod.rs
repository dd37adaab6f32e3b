mod account;
mod error;
mod request;

pub use account::*;
pub use error::*;
pub use request::*;
