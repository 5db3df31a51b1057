use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
}

/// Fields covered by the token signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    /// Issued at, Unix seconds.
    pub iat: i64,
    /// Expires at, Unix seconds.
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies stateless HMAC-SHA256 bearer tokens.
///
/// A token is `base64url(claims JSON) + "." + base64url(signature)`.
/// base64url never produces '.', so the split is unambiguous. The
/// signature covers the exact payload bytes, which means `iat` and
/// `exp` can be trusted once the MAC checks out; nothing is recomputed
/// from the verification-time clock.
pub struct TokenIssuer {
    key: Vec<u8>,
    ttl: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC can accept any key length")
    }

    /// Issue a token for `subject`, valid from now until now + TTL.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken> {
        let iat = Utc::now().timestamp();
        let exp = iat + self.ttl.num_seconds();

        let claims = Claims {
            sub: subject.to_string(),
            iat,
            exp,
        };

        let payload = serde_json::to_vec(&claims).context("Failed to serialize token claims")?;

        let mut mac = self.mac();
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        let token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        );

        let expires_at = DateTime::from_timestamp(exp, 0).context("Token expiry out of range")?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is checked before any carried field is trusted;
    /// only then is the expiry compared against the clock. Every
    /// structural defect collapses to `Invalid` so callers cannot
    /// learn anything about why a forged token failed.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload_b64, signature_b64) = token.split_once('.').ok_or(TokenError::Invalid)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Invalid)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Invalid)?;

        let mut mac = self.mac();
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Invalid)?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Invalid)?;

        if Utc::now().timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Generate a random 256-bit signing secret as a hex string.
#[must_use]
pub fn generate_secret() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
