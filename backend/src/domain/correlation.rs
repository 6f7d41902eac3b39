//! Request-scoped correlation identifier for provisioning logs.
//!
//! Provisioning clients send a correlation identifier with each request so
//! operators can match client and server logs. The protocol adapter scopes
//! the identifier around a call with [`CorrelationId::scope`]; service log
//! events pick it up via [`CorrelationId::current`] without threading it
//! through every signature.
//!
//! Tokio task-local variables are not inherited across spawned tasks. Wrap
//! spawned work in [`CorrelationId::scope`] again when it should stay
//! correlated.

use std::fmt;
use std::future::Future;

use tokio::task_local;

task_local! {
    static CORRELATION_ID: CorrelationId;
}

/// Errors returned by [`CorrelationId::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("correlation identifier must not be blank")]
pub struct BlankCorrelationId;

/// Client-supplied identifier tying log events to one request.
///
/// # Examples
/// ```
/// use scim_backend::domain::CorrelationId;
///
/// # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
/// let id = CorrelationId::new("req-42").expect("non-blank");
/// let seen = CorrelationId::scope(id.clone(), async { CorrelationId::current() }).await;
/// assert_eq!(seen, Some(id));
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Validate a client-supplied identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, BlankCorrelationId> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(BlankCorrelationId);
        }
        Ok(Self(id))
    }

    /// Generate an identifier for requests that arrive without one.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier in scope, if any.
    pub fn current() -> Option<Self> {
        CORRELATION_ID.try_with(Clone::clone).ok()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Execute `fut` with `id` in scope.
    pub async fn scope<Fut>(id: Self, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        CORRELATION_ID.scope(id, fut).await
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation identifier in scope, rendered for log fields.
pub(crate) fn current_for_logs() -> String {
    CorrelationId::current().map_or_else(|| "-".to_owned(), |id| id.0)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[tokio::test]
    async fn current_reflects_scope() {
        let expected = CorrelationId::generate();
        let observed =
            CorrelationId::scope(expected.clone(), async { CorrelationId::current() }).await;
        assert_eq!(observed, Some(expected));
    }

    #[tokio::test]
    async fn current_is_none_out_of_scope() {
        assert!(CorrelationId::current().is_none());
        assert_eq!(current_for_logs(), "-");
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        assert_eq!(CorrelationId::new(" \t"), Err(BlankCorrelationId));
    }
}
