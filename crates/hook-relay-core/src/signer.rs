//! HMAC-SHA1 signing and verification for webhook payloads.
//!
//! Providers sign each delivery as `sha1=<hex-digest>` in the
//! `X-Hub-Signature` header, where the digest is the HMAC-SHA1 of the raw
//! body bytes keyed by the shared secret. [`Signer`] computes that value and
//! verifies incoming signatures against it.
//!
//! Verification compares digests with a constant-time length-and-content
//! comparison (`subtle`), never a short-circuiting string equality, to avoid
//! leaking match-prefix length through timing.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type HmacSha1 = Hmac<Sha1>;

/// Prefix carried by every signature value on the wire.
pub const SIGNATURE_PREFIX: &str = "sha1=";

// ============================================================================
// Signer
// ============================================================================

/// Computes and verifies `sha1=<hex>` HMAC signatures for a single secret.
///
/// Owns the shared secret for the lifetime of the server; the secret is
/// zeroized when the signer is dropped and never appears in `Debug` output.
///
/// # Examples
///
/// ```rust
/// use hook_relay_core::Signer;
///
/// let signer = Signer::new("my-secret");
/// let signature = signer.sign(b"{\"ref\":\"refs/heads/main\"}");
/// assert!(signature.starts_with("sha1="));
/// assert!(signer.verify(&signature, b"{\"ref\":\"refs/heads/main\"}"));
/// assert!(!signer.verify(&signature, b"{\"ref\":\"refs/heads/other\"}"));
/// ```
pub struct Signer {
    secret: Zeroizing<Vec<u8>>,
}

impl Signer {
    /// Construct a signer for the given shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into().into_bytes()),
        }
    }

    /// Compute the `sha1=<hex>` signature of `data` under the secret.
    ///
    /// Deterministic; a pure function of `(secret, data)`.
    pub fn sign(&self, data: &[u8]) -> String {
        format!("{}{}", SIGNATURE_PREFIX, hex::encode(self.digest(data)))
    }

    /// Verify a `sha1=<hex>` signature against the exact raw bytes received.
    ///
    /// The `sha1=` prefix is stripped before comparison if present. Returns
    /// `false` on any mismatch, including a digest of the wrong length or a
    /// value that is not valid hex. Never panics.
    pub fn verify(&self, signature: &str, data: &[u8]) -> bool {
        let hex_part = signature
            .strip_prefix(SIGNATURE_PREFIX)
            .unwrap_or(signature);

        let provided = match hex::decode(hex_part) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        // ct_eq over slices resolves to false on length mismatch without
        // revealing where the contents diverge.
        let computed = self.digest(data);
        provided.ct_eq(computed.as_slice()).into()
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length; new_from_slice cannot fail here.
        let mut mac = HmacSha1::new_from_slice(&self.secret)
            .expect("HMAC-SHA1 accepts keys of any length");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "signer_tests.rs"]
mod tests;
