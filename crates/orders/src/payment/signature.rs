//! HMAC-SHA256 verification of payment processor callbacks.
//!
//! The processor signs its checkout callback as
//! `HMAC-SHA256(secret, external_order_id + "|" + external_payment_id)`,
//! hex-encoded. We recompute the signature and compare in constant time.
//!
//! # Security Properties
//!
//! - The signing secret is wrapped in `SecretString` to prevent accidental logging
//! - Signature comparison uses the `subtle` crate for constant-time equality
//! - A mismatch reports nothing about which part of the payload was wrong

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Constant-time HMAC validator for payment callbacks.
#[derive(Clone)]
pub struct SignatureValidator {
    secret: SecretString,
}

impl SignatureValidator {
    /// Creates a new validator with the shared signing secret.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Compute the expected hex signature for a callback payload.
    ///
    /// Exposed so tests (and only tests) can forge valid signatures; the
    /// production flow is verify-only.
    #[must_use]
    pub fn sign(&self, external_order_id: &str, external_payment_id: &str) -> String {
        hex::encode(self.compute(external_order_id, external_payment_id))
    }

    /// Verify a provided hex signature against the recomputed one.
    ///
    /// Returns `false` for malformed hex as well as for a mismatch; callers
    /// must not distinguish the two.
    #[must_use]
    pub fn verify(
        &self,
        external_order_id: &str,
        external_payment_id: &str,
        provided_signature: &str,
    ) -> bool {
        let Ok(provided) = hex::decode(provided_signature) else {
            return false;
        };

        let computed = self.compute(external_order_id, external_payment_id);
        computed.ct_eq(&provided).into()
    }

    fn compute(&self, external_order_id: &str, external_payment_id: &str) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts keys of any size");

        mac.update(external_order_id.as_bytes());
        mac.update(b"|");
        mac.update(external_payment_id.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for SignatureValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureValidator")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
