//! The shared admin secret and constant-time password checks against it.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Historical fallback that shipped in source; never accepted.
pub(crate) const INSECURE_DEFAULT_SECRET: &str = "suasenha123";

// Domain separation between password checks and cookie signatures.
const PASSWORD_CONTEXT: &[u8] = b"ipe-admin/password:";
const COOKIE_CONTEXT: &[u8] = b"ipe-admin/cookie:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("admin secret must not be empty")]
    Empty,
    #[error("admin secret must not be the insecure default")]
    InsecureDefault,
}

/// Single shared secret gating all admin access.
#[derive(Clone)]
pub struct AdminSecret(SecretString);

impl AdminSecret {
    /// Validate and wrap the configured secret.
    ///
    /// # Errors
    /// Returns an error for blank secrets and for the legacy default.
    pub fn new(secret: SecretString) -> Result<Self, SecretError> {
        let exposed = secret.expose_secret();
        if exposed.trim().is_empty() {
            return Err(SecretError::Empty);
        }
        if exposed == INSECURE_DEFAULT_SECRET {
            return Err(SecretError::InsecureDefault);
        }
        Ok(Self(secret))
    }

    fn keyed(&self, context: &[u8]) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.0.expose_secret().as_bytes()).ok()?;
        mac.update(context);
        Some(mac)
    }

    /// Compare a submitted password with the secret without leaking timing.
    ///
    /// Both sides are reduced to equal-length MACs first, so the comparison
    /// does not depend on where the inputs differ or on their lengths.
    pub(crate) fn matches(&self, candidate: &str) -> bool {
        let (Some(mut expected), Some(mut submitted)) =
            (self.keyed(PASSWORD_CONTEXT), self.keyed(PASSWORD_CONTEXT))
        else {
            return false;
        };
        expected.update(self.0.expose_secret().as_bytes());
        submitted.update(candidate.as_bytes());
        let expected = expected.finalize().into_bytes();
        submitted.verify_slice(&expected).is_ok()
    }

    /// Sign a cookie payload.
    pub(crate) fn sign(&self, payload: &[u8]) -> Option<Vec<u8>> {
        let mut mac = self.keyed(COOKIE_CONTEXT)?;
        mac.update(payload);
        Some(mac.finalize().into_bytes().to_vec())
    }

    /// Verify a cookie payload signature in constant time.
    pub(crate) fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        let Some(mut mac) = self.keyed(COOKIE_CONTEXT) else {
            return false;
        };
        mac.update(payload);
        mac.verify_slice(signature).is_ok()
    }
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminSecret(***)")
    }
}
