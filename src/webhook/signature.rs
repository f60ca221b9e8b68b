//! `X-Hub-Signature-256` verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("webhook request has no signature")]
    Missing,
    #[error("webhook signature is not a sha256 hex digest")]
    Malformed,
    #[error("webhook signature does not match the payload")]
    Mismatch,
}

/// `sha256=<hex>` HMAC of `body` under `secret`.
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Check `header` against the HMAC-SHA256 of the raw `body`.
///
/// Without a configured secret every request is accepted and a warning is
/// logged. With a secret, a missing or wrong signature is rejected. The
/// digest comparison is constant time.
pub fn verify(secret: Option<&str>, header: Option<&str>, body: &[u8]) -> Result<(), SignatureError> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        warn!("Webhook accepted without signature check: no webhook secret configured");
        return Ok(());
    };

    let header = header.map(str::trim).filter(|h| !h.is_empty()).ok_or_else(|| {
        warn!("Webhook request without signature");
        SignatureError::Missing
    })?;

    let digest = header
        .strip_prefix(SIGNATURE_PREFIX)
        .and_then(|hex_digest| hex::decode(hex_digest).ok())
        .ok_or(SignatureError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(body);
    mac.verify_slice(&digest).map_err(|_| {
        warn!(
            received = %header.get(..20).unwrap_or(header),
            "Webhook signature verification failed"
        );
        SignatureError::Mismatch
    })
}
