//! Authentication and CSRF collaborators
//!
//! The identity provider's session mechanics live outside this crate; the
//! client consumes them through these traits. The client only ever reads
//! tokens, invokes refresh, or fires the failure callback — it never touches
//! provider-internal state.

use async_trait::async_trait;

use crate::error::Result;

/// Access to the current authenticated session
///
/// `refresh` returning `Ok(None)` means the session could not be renewed;
/// the dispatch layer treats that the same as a refresh error.
#[async_trait]
pub trait AuthSession: Send + Sync {
    /// Current access token, or `None` when no session is active
    async fn access_token(&self) -> Result<Option<String>>;

    /// Attempt to refresh the session, yielding the new access token
    async fn refresh(&self) -> Result<Option<String>>;

    /// Fire-and-forget notification that authentication has failed.
    /// `context` names the endpoint that observed the failure.
    fn on_auth_failure(&self, context: &str);
}

/// Supplies the token attached to mutating requests as `X-CSRF-Token`
pub trait CsrfTokenProvider: Send + Sync {
    fn token(&self) -> String;
}

/// CSRF provider backed by a fixed token, e.g. one issued at page load
#[derive(Debug, Clone)]
pub struct StaticCsrfToken {
    token: String,
}

impl StaticCsrfToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl CsrfTokenProvider for StaticCsrfToken {
    fn token(&self) -> String {
        self.token.clone()
    }
}
