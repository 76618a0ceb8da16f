//! X-Hub-Signature generation and verification.
//!
//! Pushed payloads carry `X-Hub-Signature: sha1=<hex hmac>` computed over
//! the raw request body with the feed's shared secret. SHA-1 is what the
//! push protocol mandates; `sha256=` is accepted from peers that upgraded.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::AppError;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Compute the `X-Hub-Signature` header value for a payload.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify an `X-Hub-Signature` header against a raw payload.
///
/// The whole payload stands or falls together: a missing header, an
/// unknown algorithm prefix, a bad hex digest, or a mismatched MAC all
/// yield `InvalidSignature`.
///
/// # Arguments
/// * `header` - Header value as received, if any
/// * `body` - Raw request body, unmodified
/// * `secret` - The feed's shared hub secret
pub fn verify(header: Option<&str>, body: &[u8], secret: &str) -> Result<(), AppError> {
    let header = header.ok_or(AppError::InvalidSignature)?;

    let (algorithm, digest_hex) = header
        .trim()
        .split_once('=')
        .ok_or(AppError::InvalidSignature)?;

    let digest = hex::decode(digest_hex).map_err(|_| AppError::InvalidSignature)?;

    match algorithm.to_ascii_lowercase().as_str() {
        "sha1" => {
            let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
                .expect("HMAC accepts any key length");
            mac.update(body);
            mac.verify_slice(&digest)
                .map_err(|_| AppError::InvalidSignature)
        }
        "sha256" => {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .expect("HMAC accepts any key length");
            mac.update(body);
            mac.verify_slice(&digest)
                .map_err(|_| AppError::InvalidSignature)
        }
        _ => Err(AppError::InvalidSignature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "feed-shared-secret";

    #[test]
    fn sign_then_verify_round_trips() {
        let body = b"<feed><entry><id>tag:1</id></entry></feed>";
        let header = sign(body, SECRET);
        assert!(header.starts_with("sha1="));
        assert!(verify(Some(&header), body, SECRET).is_ok());
    }

    #[test]
    fn verify_rejects_missing_header() {
        let err = verify(None, b"payload", SECRET).unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));
    }

    #[test]
    fn verify_rejects_tampered_body() {
        let header = sign(b"original payload", SECRET);
        let err = verify(Some(&header), b"tampered payload", SECRET).unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let header = sign(b"payload", SECRET);
        let err = verify(Some(&header), b"payload", "other-secret").unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));
    }

    #[test]
    fn verify_rejects_unknown_algorithm() {
        let err = verify(Some("md5=abcdef"), b"payload", SECRET).unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));
    }

    #[test]
    fn verify_rejects_bad_hex() {
        let err = verify(Some("sha1=not-hex!"), b"payload", SECRET).unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));
    }

    #[test]
    fn verify_accepts_sha256_digests() {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let body = b"payload";
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        let header = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        assert!(verify(Some(&header), body, SECRET).is_ok());
    }
}
