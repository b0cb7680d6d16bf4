//! Identity gating for persistence calls.
//!
//! # Responsibility
//! - Resolve an opaque user-scoped namespace through an external provider.
//! - Retry resolution under its own policy before reporting unavailability.
//!
//! # Invariants
//! - A resolved token is cached for the session; failures are never cached.
//! - Blank tokens count as unresolved.

use crate::sync::retry::{RetryPolicy, Sleeper};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque user-scoped namespace.
pub type IdentityToken = String;

/// Namespace used by anonymous sessions.
pub const ANONYMOUS_NAMESPACE: &str = "anonymous";

/// Identity not yet resolvable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError {
    pub message: String,
}

impl IdentityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "identity unavailable: {}", self.message)
    }
}

impl Error for IdentityError {}

/// External identity collaborator (anonymous or real authentication).
pub trait IdentityProvider {
    fn resolve(&self) -> Result<IdentityToken, IdentityError>;
}

/// Provider yielding a fixed namespace.
#[derive(Debug, Clone)]
pub struct AnonymousIdentity {
    namespace: String,
}

impl AnonymousIdentity {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl Default for AnonymousIdentity {
    fn default() -> Self {
        Self::new(ANONYMOUS_NAMESPACE)
    }
}

impl IdentityProvider for AnonymousIdentity {
    fn resolve(&self) -> Result<IdentityToken, IdentityError> {
        Ok(self.namespace.clone())
    }
}

/// Lazily resolves and caches the identity token.
pub struct IdentityGate {
    provider: Box<dyn IdentityProvider>,
    policy: RetryPolicy,
    token: Option<IdentityToken>,
}

impl IdentityGate {
    pub fn new(provider: Box<dyn IdentityProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            token: None,
        }
    }

    /// Cached token, if resolution already succeeded.
    pub fn cached(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the token, resolving it first when needed.
    pub fn token(&mut self, sleeper: &dyn Sleeper) -> Result<IdentityToken, IdentityError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }

        let provider = self.provider.as_ref();
        let resolved = self.policy.run(
            sleeper,
            "identity",
            |_| match provider.resolve() {
                Ok(token) if !token.trim().is_empty() => Ok(token),
                Ok(_) => Err(IdentityError::new("provider returned a blank token")),
                Err(err) => Err(err),
            },
            |_| true,
        );

        match resolved {
            Ok(token) => {
                info!("event=identity_resolve module=sync status=ok");
                self.token = Some(token.clone());
                Ok(token)
            }
            Err(err) => {
                warn!(
                    "event=identity_resolve module=sync status=error attempts={}",
                    err.attempts()
                );
                Err(err.into_inner())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IdentityError, IdentityGate, IdentityProvider, IdentityToken};
    use crate::sync::retry::{RetryPolicy, Sleeper};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    struct FlakyIdentity {
        calls: Rc<Cell<u32>>,
        ready_after: u32,
    }

    impl IdentityProvider for FlakyIdentity {
        fn resolve(&self) -> Result<IdentityToken, IdentityError> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() > self.ready_after {
                Ok("user-42".to_string())
            } else {
                Err(IdentityError::new("auth pending"))
            }
        }
    }

    #[test]
    fn failure_is_not_cached_and_later_call_resolves() {
        let calls = Rc::new(Cell::new(0));
        let mut gate = IdentityGate::new(
            Box::new(FlakyIdentity {
                calls: Rc::clone(&calls),
                ready_after: 2,
            }),
            RetryPolicy::new(2, Duration::ZERO),
        );

        assert!(gate.token(&NoSleep).is_err());
        assert!(gate.cached().is_none());

        assert_eq!(gate.token(&NoSleep).expect("resolves"), "user-42");
        assert_eq!(gate.token(&NoSleep).expect("cached"), "user-42");
        assert_eq!(calls.get(), 3);
    }
}
