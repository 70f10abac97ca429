pub mod core;
pub mod backend;
pub mod service;
pub mod export;
pub mod server;

pub use crate::core::{Amount, Contribution, Goal, Ledger, LedgerError};
pub use crate::service::LedgerService;
