//! HMAC-signed object URLs for backends without native presigning.
//!
//! Signature = base64url(HMAC-SHA256(secret, "METHOD\nkey\nexpires")), where
//! `expires` is a unix timestamp in seconds. A signature authorizes exactly
//! one verb on exactly one key until it expires.

use base64::Engine;
use depot_core::models::PresignMethod;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Signed URL has expired")]
    Expired,

    #[error("Signed URL signature is invalid")]
    Invalid,
}

#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner").finish_non_exhaustive()
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, method: PresignMethod, key: &str, expires: u64) -> Hmac<Sha256> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(method.as_str().as_bytes());
        mac.update(b"\n");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    /// Expiry timestamp for a URL issued now.
    pub fn expires_at(expires_in: Duration) -> u64 {
        unix_now().saturating_add(expires_in.as_secs())
    }

    pub fn sign(&self, method: PresignMethod, key: &str, expires: u64) -> String {
        let tag = self.mac(method, key, expires).finalize().into_bytes();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(tag)
    }

    /// Verify a signature against the current time.
    pub fn verify(
        &self,
        method: PresignMethod,
        key: &str,
        expires: u64,
        signature: &str,
    ) -> Result<(), SignatureError> {
        self.verify_at(method, key, expires, signature, unix_now())
    }

    pub fn verify_at(
        &self,
        method: PresignMethod,
        key: &str,
        expires: u64,
        signature: &str,
        now: u64,
    ) -> Result<(), SignatureError> {
        let tag = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SignatureError::Invalid)?;
        self.mac(method, key, expires)
            .verify_slice(&tag)
            .map_err(|_| SignatureError::Invalid)?;
        // Checked after the MAC so a tampered expiry reports Invalid
        if now > expires {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "images/g1/1700000000000-demo.png";

    #[test]
    fn test_sign_and_verify() {
        let signer = UrlSigner::new("test-secret");
        let expires = 2_000_000_000;
        let signature = signer.sign(PresignMethod::Put, KEY, expires);
        assert!(signer
            .verify_at(PresignMethod::Put, KEY, expires, &signature, expires - 10)
            .is_ok());
    }

    #[test]
    fn test_signature_is_scoped_to_method_and_key() {
        let signer = UrlSigner::new("test-secret");
        let expires = 2_000_000_000;
        let signature = signer.sign(PresignMethod::Put, KEY, expires);

        assert_eq!(
            signer.verify_at(PresignMethod::Get, KEY, expires, &signature, 0),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            signer.verify_at(PresignMethod::Put, "images/g1/2-other.png", expires, &signature, 0),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            signer.verify_at(PresignMethod::Put, KEY, expires + 3600, &signature, 0),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_expired_signature() {
        let signer = UrlSigner::new("test-secret");
        let signature = signer.sign(PresignMethod::Get, KEY, 100);
        assert_eq!(
            signer.verify_at(PresignMethod::Get, KEY, 100, &signature, 101),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn test_other_secret_rejected() {
        let signature = UrlSigner::new("a").sign(PresignMethod::Get, KEY, 100);
        assert_eq!(
            UrlSigner::new("b").verify_at(PresignMethod::Get, KEY, 100, &signature, 0),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            UrlSigner::new("a").verify_at(PresignMethod::Get, KEY, 100, "not base64!", 0),
            Err(SignatureError::Invalid)
        );
    }
}
