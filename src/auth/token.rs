//! HS256 JSON web tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use time::OffsetDateTime;

use crate::store::Role;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: String, role: Role, now: OffsetDateTime, ttl: time::Duration) -> Self {
        Self {
            sub,
            role,
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

fn mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length")
}

pub fn issue(claims: &Claims, secret: &str) -> Result<String, serde_json::Error> {
    let header = URL_SAFE_NO_PAD.encode(HEADER);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header}.{payload}");

    let mut mac = mac(secret);
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

pub fn verify(token: &str, secret: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| TokenError::Malformed)?;
    let mut mac = mac(secret);
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).map_err(|_| TokenError::BadSignature)?;

    let payload = URL_SAFE_NO_PAD.decode(payload).map_err(|_| TokenError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

    if claims.exp <= now.unix_timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(now: OffsetDateTime) -> Claims {
        Claims::new("u1".into(), Role::Startup, now, time::Duration::hours(1))
    }

    #[test]
    fn issued_tokens_verify() {
        let now = OffsetDateTime::now_utc();
        let token = issue(&claims(now), "secret").unwrap();

        assert_eq!(verify(&token, "secret", now), Ok(claims(now)));
    }

    #[test]
    fn wrong_secret_is_a_bad_signature() {
        let now = OffsetDateTime::now_utc();
        let token = issue(&claims(now), "secret").unwrap();

        assert_eq!(verify(&token, "other", now), Err(TokenError::BadSignature));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let token = issue(&claims(now), "secret").unwrap();
        let forged = Claims { role: Role::Investor, ..claims(now) };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());

        let parts: Vec<&str> = token.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(verify(&tampered, "secret", now), Err(TokenError::BadSignature));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let then = OffsetDateTime::now_utc() - time::Duration::hours(2);
        let token = issue(&claims(then), "secret").unwrap();

        assert_eq!(
            verify(&token, "secret", OffsetDateTime::now_utc()),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn junk_is_malformed() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(verify("abc", "secret", now), Err(TokenError::Malformed));
        assert_eq!(verify("a.b.c.d", "secret", now), Err(TokenError::Malformed));
    }
}
