use sha2::{Digest, Sha256};

use crate::error::AdminAuthError;

/// Single shared-credential gate in front of the admin page.
///
/// Only a digest of the secret is kept. With no secret configured every
/// attempt is refused.
#[derive(Clone)]
pub struct AdminGate {
    digest: Option<[u8; 32]>,
}

impl AdminGate {
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            digest: secret.map(digest),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self { digest: None }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.digest.is_some()
    }

    /// Check `attempt` against the configured secret.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::Disabled` if no secret is configured, or
    /// `AdminAuthError::InvalidCredential` on mismatch.
    pub fn verify(&self, attempt: &str) -> Result<(), AdminAuthError> {
        let expected = self.digest.as_ref().ok_or(AdminAuthError::Disabled)?;
        if constant_time_eq(expected, &digest(attempt)) {
            Ok(())
        } else {
            tracing::warn!("rejected admin login attempt");
            Err(AdminAuthError::InvalidCredential)
        }
    }
}

impl std::fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn digest(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
