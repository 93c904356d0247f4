//! Bearer token formatting, parsing, and signature verification.
//!
//! Tokens are stateless: the claims travel inside the token and are verified
//! against a server-side HMAC key, so no session row is consulted before the
//! user lookup.

use std::{fmt, str::FromStr};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use jiff::Timestamp;
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroize;

use crate::auth::models::Role;

/// Bearer token identifier prefix.
pub const TOKEN_PREFIX: &str = "sk";

/// Number of bytes in the signing key.
pub const AUTH_KEY_BYTES: usize = 32;

const AUTH_KEY_HEX_CHARS: usize = AUTH_KEY_BYTES * 2;
const SIGNATURE_BYTES: usize = 32;
const SIGNATURE_HEX_CHARS: usize = SIGNATURE_BYTES * 2;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenVersion {
    V1,
}

impl TokenVersion {
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::V1 => "v1",
        }
    }
}

impl FromStr for TokenVersion {
    type Err = TokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "v1" => Ok(Self::V1),
            _ => Err(TokenError::UnsupportedVersion),
        }
    }
}

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user.
    pub sub: Uuid,

    /// Role at issuance time; the user row remains authoritative.
    pub role: Role,

    /// Issued-at, Unix seconds.
    pub iat: i64,

    /// Expiry, Unix seconds.
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.exp <= now.as_second()
    }
}

/// Server-side HMAC signing key.
#[derive(Clone)]
pub struct AuthKey {
    bytes: [u8; AUTH_KEY_BYTES],
}

impl AuthKey {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; AUTH_KEY_BYTES]) -> Self {
        Self { bytes }
    }

    /// Parse a key from its hex form (e.g. the `AUTH_KEY` environment
    /// variable).
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidKeyEncoding`] when the input is not
    /// exactly 64 hex characters.
    pub fn from_hex(key_hex: &str) -> Result<Self, TokenError> {
        if key_hex.len() != AUTH_KEY_HEX_CHARS {
            return Err(TokenError::InvalidKeyEncoding);
        }

        let mut bytes = [0_u8; AUTH_KEY_BYTES];

        decode_hex(key_hex, &mut bytes).ok_or(TokenError::InvalidKeyEncoding)?;

        Ok(Self { bytes })
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; AUTH_KEY_BYTES] {
        &self.bytes
    }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthKey(**redacted**)")?;
        Ok(())
    }
}

impl Drop for AuthKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token format is invalid")]
    InvalidFormat,

    #[error("token uses an unsupported version")]
    UnsupportedVersion,

    #[error("token signature does not verify")]
    InvalidSignature,

    #[error("token claims are malformed")]
    InvalidClaims,

    #[error("token has expired")]
    Expired,

    #[error("signing key encoding is invalid")]
    InvalidKeyEncoding,
}

/// Generate a fresh random signing key.
#[must_use]
pub fn generate_auth_key() -> AuthKey {
    let mut bytes = [0_u8; AUTH_KEY_BYTES];

    OsRng.fill_bytes(&mut bytes);

    AuthKey::from_bytes(bytes)
}

/// Render signed claims as a bearer token: `sk_v1_<claims>.<signature>`.
#[must_use]
pub fn format_token(claims: &Claims, version: TokenVersion, key: &AuthKey) -> String {
    let claims_segment = URL_SAFE_NO_PAD.encode(claims_json(claims));
    let signature = sign(version, &claims_segment, key);

    format!(
        "{TOKEN_PREFIX}_{}_{claims_segment}.{}",
        version.segment(),
        encode_hex(&signature)
    )
}

/// Parse a bearer token and verify its signature and expiry.
///
/// # Errors
///
/// Returns the specific [`TokenError`] for a malformed, tampered, or expired
/// token.
pub fn parse_and_verify(token: &str, key: &AuthKey, now: Timestamp) -> Result<Claims, TokenError> {
    let (prefix_and_claims, signature_hex) =
        token.split_once('.').ok_or(TokenError::InvalidFormat)?;

    let mut segments = prefix_and_claims.splitn(3, '_');

    let prefix = segments.next().ok_or(TokenError::InvalidFormat)?;
    let version_segment = segments.next().ok_or(TokenError::InvalidFormat)?;
    let claims_segment = segments.next().ok_or(TokenError::InvalidFormat)?;

    if prefix != TOKEN_PREFIX {
        return Err(TokenError::InvalidFormat);
    }

    let version = TokenVersion::from_str(version_segment)?;

    if signature_hex.len() != SIGNATURE_HEX_CHARS {
        return Err(TokenError::InvalidSignature);
    }

    let mut presented = [0_u8; SIGNATURE_BYTES];

    decode_hex(signature_hex, &mut presented).ok_or(TokenError::InvalidSignature)?;

    let expected = sign(version, claims_segment, key);

    if !constant_time_eq(&presented, &expected) {
        return Err(TokenError::InvalidSignature);
    }

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(claims_segment)
        .map_err(|_| TokenError::InvalidClaims)?;

    let claims: Claims =
        serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::InvalidClaims)?;

    if claims.is_expired_at(now) {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

fn claims_json(claims: &Claims) -> Vec<u8> {
    // Claims contain only plain fields; serialization cannot fail.
    serde_json::to_vec(claims).unwrap_or_default()
}

/// HMAC input binds the version segment so a token cannot be replayed under a
/// different format version.
fn sign(version: TokenVersion, claims_segment: &str, key: &AuthKey) -> [u8; SIGNATURE_BYTES] {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .expect("HMAC accepts keys of any length");

    mac.update(TOKEN_PREFIX.as_bytes());
    mac.update(b":");
    mac.update(version.segment().as_bytes());
    mac.update(b":");
    mac.update(claims_segment.as_bytes());

    mac.finalize().into_bytes().into()
}

fn encode_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut encoded = String::with_capacity(bytes.len() * 2);

    for byte in bytes {
        encoded.push(HEX[(byte >> 4) as usize] as char);
        encoded.push(HEX[(byte & 0x0f) as usize] as char);
    }

    encoded
}

fn decode_hex(input: &str, out: &mut [u8]) -> Option<()> {
    if input.len() != out.len() * 2 {
        return None;
    }

    let input = input.as_bytes();

    for (index, byte) in out.iter_mut().enumerate() {
        let hi = decode_hex_nibble(*input.get(index * 2)?)?;
        let lo = decode_hex_nibble(*input.get((index * 2) + 1)?)?;

        *byte = (hi << 4) | lo;
    }

    Some(())
}

fn decode_hex_nibble(value: u8) -> Option<u8> {
    match value {
        b'0'..=b'9' => Some(value - b'0'),
        b'a'..=b'f' => Some(value - b'a' + 10),
        b'A'..=b'F' => Some(value - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn test_key() -> AuthKey {
        AuthKey::from_bytes([0xA5; AUTH_KEY_BYTES])
    }

    fn test_claims(now: Timestamp) -> Claims {
        Claims {
            sub: Uuid::nil(),
            role: Role::Customer,
            iat: now.as_second(),
            exp: now.as_second() + 3600,
        }
    }

    #[test]
    fn format_and_verify_round_trip() -> TestResult {
        let now = Timestamp::UNIX_EPOCH;
        let claims = test_claims(now);
        let token = format_token(&claims, TokenVersion::V1, &test_key());

        let verified = parse_and_verify(&token, &test_key(), now)?;

        assert_eq!(verified, claims);

        Ok(())
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let now = Timestamp::UNIX_EPOCH;
        let mut claims = test_claims(now);
        let token = format_token(&claims, TokenVersion::V1, &test_key());

        claims.role = Role::Admin;
        let forged_segment = URL_SAFE_NO_PAD.encode(claims_json(&claims));

        let signature = token.split_once('.').map(|x| x.1).unwrap_or_default();
        let forged = format!("{TOKEN_PREFIX}_v1_{forged_segment}.{signature}");

        assert_eq!(
            parse_and_verify(&forged, &test_key(), now),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn wrong_key_is_rejected() {
        let now = Timestamp::UNIX_EPOCH;
        let token = format_token(&test_claims(now), TokenVersion::V1, &test_key());
        let other_key = AuthKey::from_bytes([0x5A; AUTH_KEY_BYTES]);

        assert_eq!(
            parse_and_verify(&token, &other_key, now),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Timestamp::UNIX_EPOCH;
        let token = format_token(&test_claims(now), TokenVersion::V1, &test_key());
        let later = Timestamp::new(now.as_second() + 7200, 0).expect("valid timestamp");

        assert_eq!(
            parse_and_verify(&token, &test_key(), later),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn parse_rejects_invalid_prefix() {
        let now = Timestamp::UNIX_EPOCH;
        let token = format_token(&test_claims(now), TokenVersion::V1, &test_key());
        let forged = token.replacen(TOKEN_PREFIX, "nope", 1);

        assert_eq!(
            parse_and_verify(&forged, &test_key(), now),
            Err(TokenError::InvalidFormat)
        );
    }

    #[test]
    fn parse_rejects_unknown_version() {
        assert_eq!(
            parse_and_verify("sk_v9_abc.00", &test_key(), Timestamp::UNIX_EPOCH),
            Err(TokenError::UnsupportedVersion)
        );
    }

    #[test]
    fn key_hex_round_trip() -> TestResult {
        let key_hex = encode_hex(test_key().as_bytes());
        let parsed = AuthKey::from_hex(&key_hex)?;

        assert_eq!(parsed.as_bytes(), test_key().as_bytes());

        Ok(())
    }

    #[test]
    fn short_key_hex_is_rejected() {
        assert_eq!(
            AuthKey::from_hex("abcd").unwrap_err(),
            TokenError::InvalidKeyEncoding
        );
    }
}
