//! Session credential type.
//!
//! The credential is the opaque token handed out by the `login` mutation and
//! sent back on every request in the `Authorization` header. Its content is the
//! base64 encoding of the login email; only the server decodes it.

use core::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use secrecy::{ExposeSecret, SecretString};

use super::email::{Email, EmailError};

/// Errors that can occur when decoding a [`Credential`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The token is not valid base64.
    #[error("credential is not valid base64")]
    Encoding,
    /// The decoded bytes are not UTF-8.
    #[error("credential does not decode to text")]
    NotText,
    /// The decoded text is not an email address.
    #[error("credential does not carry an email: {0}")]
    Email(#[from] EmailError),
}

/// An opaque session credential.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Wrap a raw token as received from the wire or from storage.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Issue the credential for a logged-in email.
    #[must_use]
    pub fn issue(email: &Email) -> Self {
        Self::new(STANDARD.encode(email.as_str()))
    }

    /// Decode the email the credential claims.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] if the token is not base64, not UTF-8,
    /// or not a syntactically valid email.
    pub fn claimed_email(&self) -> Result<Email, CredentialError> {
        let bytes = STANDARD
            .decode(self.expose().trim())
            .map_err(|_| CredentialError::Encoding)?;
        let text = String::from_utf8(bytes).map_err(|_| CredentialError::NotText)?;
        Ok(Email::parse(&text)?)
    }

    /// The raw token, for headers and persistence.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Returns true if the token is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}
