// ── Authenticated session ──

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Identity of a signed-in user. Two sessions are "the same session"
/// exactly when their user ids are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The current authenticated session, as handed over by the auth layer.
///
/// The bearer token is carried along because both the REST calls and the
/// push connection authenticate with it; it never takes part in identity
/// comparisons.
#[derive(Debug, Clone)]
pub struct Session {
    user_id: UserId,
    token: SecretString,
    authenticated: bool,
}

impl Session {
    /// An authenticated session for `user_id`.
    pub fn new(user_id: impl Into<UserId>, token: SecretString) -> Self {
        Self {
            user_id: user_id.into(),
            token,
            authenticated: true,
        }
    }

    /// A session that exists but has not (or no longer) authenticated.
    /// Observers treat it the same as no session at all.
    pub fn unauthenticated(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            token: SecretString::from(String::new()),
            authenticated: false,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
