use serde::{Deserialize, Serialize};

/// Something that can tell whether a username/password pair is acceptable.
///
/// This is a boundary check for the front end's login screen and nothing
/// more. None of the ledger operations consult it.
pub trait Authenticator: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Compares against one fixed pair of credentials taken from configuration.
/// Provides no real security: the credentials live in plain text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedCredentials {
    username: String,
    password: String
}

impl FixedCredentials {
    pub fn new(username: &str, password: &str) -> FixedCredentials {
        FixedCredentials { username: username.to_owned(), password: password.to_owned() }
    }
}

impl Default for FixedCredentials {
    fn default() -> Self {
        FixedCredentials::new("admin", "1234")
    }
}

impl Authenticator for FixedCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl std::fmt::Display for FixedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fixed credentials for {}", self.username)
    }
}
