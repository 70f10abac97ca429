pub mod auth;
pub mod contribution;
pub mod error;
pub mod goal;
pub mod ledger;

pub use auth::{Authenticator, FixedCredentials};
pub use contribution::{Amount, Contribution};
pub use error::{LedgerError, LedgerResult};
pub use goal::Goal;
pub use ledger::Ledger;
