//! Webhook authenticity verification.
//!
//! The platform signs every direct webhook with an HMAC-SHA256 over the raw
//! request body, keyed by the app's shared secret and sent base64-encoded in
//! the `X-Shopify-Hmac-Sha256` header. Verification must run against the
//! exact bytes received — re-parsing and re-serializing the JSON first
//! invalidates the signature.
//!
//! Relayed-envelope requests never reach this module; their authenticity is
//! established by the relay infrastructure upstream.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::instrument;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// SigningSecret
// ============================================================================

/// The process-wide shared signing secret.
///
/// Wrapped so the raw value is zeroed on drop and never appears in `Debug`
/// output or log lines.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret(String);

impl SigningSecret {
    /// Wrap a raw secret value
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SigningSecret").field(&"<REDACTED>").finish()
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Verification failures; all collapse to an authorization-denied response
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature header is absent")]
    MissingHeader,

    #[error("Secret cannot be used as an HMAC key")]
    InvalidKey,

    #[error("Computed signature does not match received header")]
    Mismatch { computed: String, received: String },
}

// ============================================================================
// Core Operations
// ============================================================================

/// Interface for webhook signature verification
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Verify a claimed signature header against the raw body bytes.
    ///
    /// Success carries no payload — the signature only establishes that the
    /// request originated from the platform.
    async fn verify(&self, body: &[u8], header: Option<&str>) -> Result<(), SignatureError>;
}

/// HMAC-SHA256 verifier keyed by the shared app secret.
///
/// Computes the keyed hash over the raw body, encodes it base64 (the same
/// textual encoding the platform puts in the header), and compares in
/// constant time via [`Mac::verify_slice`]. A header that is not valid
/// base64 can never match and is reported as a mismatch.
pub struct HmacSignatureVerifier {
    secret: SigningSecret,
}

impl HmacSignatureVerifier {
    /// Construct a verifier from the shared signing secret
    pub fn new(secret: SigningSecret) -> Self {
        Self { secret }
    }
}

impl std::fmt::Debug for HmacSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSignatureVerifier")
            .field("secret", &self.secret)
            .finish()
    }
}

#[async_trait]
impl SignatureVerifier for HmacSignatureVerifier {
    #[instrument(skip(self, body), fields(body_len = body.len()))]
    async fn verify(&self, body: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        let received = header.ok_or(SignatureError::MissingHeader)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureError::InvalidKey)?;
        mac.update(body);

        // The computed value is needed for the mismatch report, so finalize
        // a clone and keep the original for the constant-time comparison.
        let computed = BASE64.encode(mac.clone().finalize().into_bytes());

        let mismatch = || SignatureError::Mismatch {
            computed: computed.clone(),
            received: received.to_string(),
        };

        let received_bytes = BASE64.decode(received.trim()).map_err(|_| mismatch())?;
        mac.verify_slice(&received_bytes).map_err(|_| mismatch())
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
