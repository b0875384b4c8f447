
//! Stateless admin sessions.
//!
//! A token is `base64url(json{email, exp}) + "." + hex(hmac_sha256(payload))`
//! and travels in the `admin_session` cookie. Nothing is kept server side,
//! so a token stays valid until `exp`.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurposeConfig, DecodePaddingMode, GeneralPurpose},
    Engine,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{config::AuthConfig, routes::ApiError};

pub const COOKIE_NAME: &str = "admin_session";
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

// unpadded on encode, padding optional on decode
const PAYLOAD_ENCODING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    email: String,
    /// seconds since the epoch
    exp: i64,
}

#[derive(Debug, thiserror::Error)]
enum TokenError {
    #[error("token is not payload.signature")]
    Malformed,
    #[error("payload is not base64url")]
    PayloadEncoding,
    #[error("signature is not hex")]
    SignatureEncoding,
    #[error("signature mismatch")]
    Signature,
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("expired at {0}")]
    Expired(i64),
}

#[derive(Clone)]
pub struct SessionCodec {
    secret: Arc<[u8]>,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

impl SessionCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self { secret: Arc::from(secret.as_ref()) }
    }

    fn mac(&self) -> Hmac<Sha256> {
        <Hmac<Sha256> as Mac>::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("hmac accepts any key length"))
    }

    pub fn issue(&self, email: &str) -> String {
        self.issue_at(email, Utc::now())
    }

    pub fn issue_at(&self, email: &str, now: DateTime<Utc>) -> String {
        let claims = Claims {
            email: email.to_string(),
            exp: now.timestamp() + SESSION_MAX_AGE_SECS,
        };
        // a struct of a string and an integer always serializes
        let payload = serde_json::to_vec(&claims).unwrap_or_default();

        let mut mac = self.mac();
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        format!("{}.{}", PAYLOAD_ENCODING.encode(&payload), hex::encode(signature))
    }

    /// `None` for anything but a well formed, correctly signed and unexpired
    /// token. The reason is only logged.
    pub fn verify(&self, token: &str) -> Option<Session> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        match self.check(token, now) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::debug!("rejected session token: {err}");
                None
            },
        }
    }

    fn check(&self, token: &str, now: DateTime<Utc>) -> Result<Session, TokenError> {
        let (payload, signature) = token.split_once('.')
            .filter(|(p, s)| !p.is_empty() && !s.is_empty())
            .ok_or(TokenError::Malformed)?;

        let payload = PAYLOAD_ENCODING.decode(payload)
            .map_err(|_| TokenError::PayloadEncoding)?;
        let signature = hex::decode(signature)
            .map_err(|_| TokenError::SignatureEncoding)?;

        let mut mac = self.mac();
        mac.update(&payload);
        let expected = mac.finalize().into_bytes();

        if !signatures_match(&expected, &signature) {
            return Err(TokenError::Signature);
        }

        let claims: Claims = serde_json::from_slice(&payload)?;

        let expired = claims.exp.checked_mul(1000)
            .map_or(true, |exp_ms| exp_ms < now.timestamp_millis());
        if expired {
            return Err(TokenError::Expired(claims.exp));
        }

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or(TokenError::Expired(claims.exp))?;
        Ok(Session { email: claims.email, expires_at })
    }
}

/// Length check first, then a comparison that always looks at every byte.
fn signatures_match(expected: &[u8], given: &[u8]) -> bool {
    expected.len() == given.len() && bool::from(expected.ct_eq(given))
}

/// Both fields are always compared, so timing says nothing about which one
/// was wrong.
#[derive(Clone)]
pub struct AdminCredentials {
    email: Arc<str>,
    password: Arc<str>,
}

impl AdminCredentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self { email: Arc::from(email), password: Arc::from(password) }
    }

    pub fn matches(&self, email: &str, password: &str) -> bool {
        if self.email.is_empty() || self.password.is_empty() {
            return false;
        }
        let email = self.email.as_bytes().ct_eq(email.as_bytes());
        let password = self.password.as_bytes().ct_eq(password.as_bytes());
        bool::from(email & password)
    }
}

/// Attributes of the session cookie. Setting and clearing share
/// [`CookiePolicy::base`], a removal with a different path or domain
/// would leave the original cookie in place.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    domain: Option<String>,
    secure: bool,
}

impl CookiePolicy {
    pub fn new(domain: Option<String>, secure: bool) -> Self {
        Self { domain, secure }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(auth.cookie_domain(), auth.production)
    }

    fn base(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::build((COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
        .build();

        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let max_age = time::Duration::seconds(SESSION_MAX_AGE_SECS);
        let mut cookie = self.base(token);
        cookie.set_max_age(max_age);
        cookie.set_expires(time::OffsetDateTime::now_utc() + max_age);
        cookie
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.base(String::new());
        cookie.make_removal();
        cookie
    }
}

/// A request made with a valid session cookie. Rejects with 401.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    SessionCodec: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = SessionCodec::from_ref(state);
        CookieJar::from_headers(&parts.headers)
            .get(COOKIE_NAME)
            .and_then(|c| codec.verify(c.value()))
            .map(AdminSession)
        .ok_or(ApiError::Unauthorized)
    }
}
