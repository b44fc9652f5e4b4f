//! Resolving the caller's identity from the request credential.

use std::sync::Arc;

use launchpad_core::{Credential, Email, User};
use tracing::debug;

use crate::datasources::{DataSourceError, UserStore};

/// The authenticated caller of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: Email,
    pub user: User,
}

/// Turns an `Authorization` header value into an [`Identity`].
#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserStore>,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Resolve `header`, the raw `Authorization` value.
    ///
    /// A missing or undecodable credential is an anonymous request, not an
    /// error. An optional `Bearer ` prefix is accepted. A valid credential
    /// finds or creates its user.
    ///
    /// # Errors
    ///
    /// Returns an error only if the user store fails.
    pub async fn resolve(&self, header: Option<&str>) -> Result<Option<Identity>, DataSourceError> {
        let Some(raw) = header.map(str::trim).filter(|h| !h.is_empty()) else {
            return Ok(None);
        };
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw);

        let email = match Credential::new(token).claimed_email() {
            Ok(email) => email,
            Err(e) => {
                debug!(error = %e, "ignoring unusable credential");
                return Ok(None);
            }
        };

        let user = self.users.find_or_create(&email).await?;
        Ok(Some(Identity { email, user }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::datasources::InMemoryUserStore;

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(Arc::new(InMemoryUserStore::new()))
    }

    #[tokio::test]
    async fn test_valid_credential_resolves_email() {
        let identity = resolver()
            .resolve(Some("dGVzdEBleGFtcGxlLmNvbQ=="))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.email.as_str(), "test@example.com");
        assert_eq!(identity.user.email, identity.email);
    }

    #[tokio::test]
    async fn test_bearer_prefix_is_accepted() {
        let identity = resolver()
            .resolve(Some("Bearer dGVzdEBleGFtcGxlLmNvbQ=="))
            .await
            .unwrap();
        assert!(identity.is_some());
    }

    #[tokio::test]
    async fn test_non_email_credential_is_anonymous() {
        assert_eq!(resolver().resolve(Some("bm90LWFuLWVtYWls")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_and_missing_are_anonymous() {
        let resolver = resolver();
        assert_eq!(resolver.resolve(Some("%%%")).await.unwrap(), None);
        assert_eq!(resolver.resolve(Some("")).await.unwrap(), None);
        assert_eq!(resolver.resolve(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_same_credential_same_user() {
        let resolver = resolver();
        let a = resolver.resolve(Some("dGVzdEBleGFtcGxlLmNvbQ==")).await.unwrap().unwrap();
        let b = resolver.resolve(Some("dGVzdEBleGFtcGxlLmNvbQ==")).await.unwrap().unwrap();
        assert_eq!(a.user.id, b.user.id);
    }
}
