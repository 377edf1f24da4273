//! HMAC-signed session tokens.
//!
//! Token layout: `base64url(json claims) "." hex(HMAC-SHA256(secret, json claims))`.
//! Claims are `{"user":{"id":<int>},"expires":"<RFC 3339>"}`.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::MIN_SECRET_LEN;
use crate::error::AuthError;
use crate::model::UserId;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
}

/// Signed session payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user: SessionUser,
    pub expires: DateTime<Utc>,
}

/// Signing key plus session lifetime.
#[derive(Clone)]
pub struct SessionKeys {
    secret: Vec<u8>,
    ttl: Duration,
    secure_cookies: bool,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

impl SessionKeys {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::ShortSecret {
                len: secret.len(),
                min: MIN_SECRET_LEN,
            });
        }
        Ok(Self {
            secret,
            ttl,
            secure_cookies: false,
        })
    }

    /// Add the `Secure` attribute to issued cookies.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user_id`, valid for the TTL from `now` (naive UTC).
    pub fn issue(&self, user_id: UserId, now: NaiveDateTime) -> String {
        let claims = SessionClaims {
            user: SessionUser { id: user_id },
            expires: Utc.from_utc_datetime(&now) + self.ttl,
        };
        self.sign(&claims)
    }

    /// Encode and sign arbitrary claims.
    pub fn sign(&self, claims: &SessionClaims) -> String {
        // Serializing a struct of an integer and a timestamp cannot fail.
        let payload = serde_json::to_vec(claims).unwrap_or_default();
        let signature = hex::encode(self.mac(&payload));
        format!("{}.{signature}", URL_SAFE_NO_PAD.encode(&payload))
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str, now: NaiveDateTime) -> Result<SessionClaims, AuthError> {
        let (encoded, signature) = token.split_once('.').ok_or(AuthError::MalformedToken)?;
        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| AuthError::MalformedToken)?;
        let signature = hex::decode(signature).map_err(|_| AuthError::MalformedToken)?;

        let expected = self.mac(&payload);
        if signature.len() != expected.len()
            || !bool::from(expected.as_slice().ct_eq(signature.as_slice()))
        {
            return Err(AuthError::BadSignature);
        }

        let claims: SessionClaims =
            serde_json::from_slice(&payload).map_err(|_| AuthError::MalformedToken)?;
        if claims.expires < Utc.from_utc_datetime(&now) {
            return Err(AuthError::Expired {
                expires: claims.expires.to_rfc3339(),
            });
        }
        Ok(claims)
    }

    /// `Set-Cookie` value carrying `token`.
    pub fn cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.ttl.num_seconds()
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that deletes the session cookie.
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn mac(&self, payload: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length; `new` already enforced a minimum.
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return Vec::new(),
        };
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Pull the session token out of a `Cookie` header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .map(str::trim)
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
