//! Session resolution: JWT session tokens and trusted proxy headers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    config::{AuthConfig, ProxyHeaderAuthConfig, SessionConfig},
    errors::{Error, Result},
    types::AccountId,
};

/// The authenticated caller of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub account_id: AccountId,
    pub email: Option<String>,
}

/// "Get the current session for this request."
///
/// `Ok(None)` means no usable credentials were presented, which callers turn
/// into [`Error::Unauthenticated`]. `Err` is reserved for failures of the
/// provider itself.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self, headers: &HeaderMap) -> Result<Option<Session>>;
}

/// Build the provider chain from configuration, in priority order.
pub fn create_session_provider(config: &AuthConfig) -> Result<Arc<dyn SessionProvider>> {
    let mut providers: Vec<Arc<dyn SessionProvider>> = Vec::new();

    if config.session.enabled {
        providers.push(Arc::new(JwtSessionProvider::new(&config.session)?));
    }
    if config.proxy_header.enabled {
        providers.push(Arc::new(ProxyHeaderSessionProvider::new(&config.proxy_header)));
    }

    Ok(Arc::new(ChainSessionProvider::new(providers)))
}

/// JWT session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: AccountId, // Subject (account ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64, // Expiration time
    pub iat: i64, // Issued at
}

/// Verifies HS256 session tokens from the session cookie or a bearer header.
pub struct JwtSessionProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    cookie_name: String,
    timeout: std::time::Duration,
}

impl JwtSessionProvider {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let secret_key = config.secret_key.as_deref().filter(|s| !s.is_empty()).ok_or_else(|| Error::Internal {
            operation: "JWT sessions: secret_key is required".to_string(),
        })?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
            cookie_name: config.cookie_name.clone(),
            timeout: config.timeout,
        })
    }

    /// Mint a token for an account. The identity provider normally does this;
    /// it is exposed for tooling and tests.
    pub fn issue(&self, account_id: AccountId, email: Option<&str>) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: account_id,
            email: email.map(str::to_string),
            exp: (now + self.timeout).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| Error::Internal {
            operation: format!("create JWT: {e}"),
        })
    }

    /// Verify and decode a session token
    pub fn verify(&self, token: &str) -> Result<Session> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &Validation::default()).map_err(|e| match e.kind() {
            // Client errors (401) - malformed tokens, invalid claims, expired tokens
            jsonwebtoken::errors::ErrorKind::InvalidToken
            | jsonwebtoken::errors::ErrorKind::InvalidSignature
            | jsonwebtoken::errors::ErrorKind::ExpiredSignature
            | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
            | jsonwebtoken::errors::ErrorKind::InvalidSubject
            | jsonwebtoken::errors::ErrorKind::ImmatureSignature
            | jsonwebtoken::errors::ErrorKind::Base64(_)
            | jsonwebtoken::errors::ErrorKind::Json(_)
            | jsonwebtoken::errors::ErrorKind::Utf8(_)
            | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthenticated { message: None },

            // Key issues and anything newer are server errors
            _ => Error::Internal {
                operation: format!("JWT verification: {e}"),
            },
        })?;

        Ok(Session {
            account_id: token_data.claims.sub,
            email: token_data.claims.email,
        })
    }

    fn token_from_cookie<'h>(&self, headers: &'h HeaderMap) -> Option<&'h str> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|cookie| cookie.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)
    }

    fn token_from_bearer(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn current_session(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        for token in [self.token_from_cookie(headers), Self::token_from_bearer(headers)].into_iter().flatten() {
            match self.verify(token) {
                Ok(session) => return Ok(Some(session)),
                // Expired and malformed tokens are expected; try the next source
                Err(Error::Unauthenticated { .. }) => trace!("Rejected session token"),
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

/// Trusts an account id set by an upstream SSO proxy.
pub struct ProxyHeaderSessionProvider {
    header_name: String,
    email_header_name: String,
}

impl ProxyHeaderSessionProvider {
    pub fn new(config: &ProxyHeaderAuthConfig) -> Self {
        Self {
            header_name: config.header_name.clone(),
            email_header_name: config.email_header_name.clone(),
        }
    }
}

#[async_trait]
impl SessionProvider for ProxyHeaderSessionProvider {
    async fn current_session(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        let Some(raw) = headers.get(&self.header_name).and_then(|h| h.to_str().ok()) else {
            return Ok(None);
        };

        let Ok(account_id) = raw.trim().parse::<AccountId>() else {
            debug!("Proxy header {} is not a valid account id", self.header_name);
            return Ok(None);
        };

        let email = headers
            .get(&self.email_header_name)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        Ok(Some(Session { account_id, email }))
    }
}

/// Tries each provider in order and returns the first session found.
pub struct ChainSessionProvider {
    providers: Vec<Arc<dyn SessionProvider>>,
}

impl ChainSessionProvider {
    pub fn new(providers: Vec<Arc<dyn SessionProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl SessionProvider for ChainSessionProvider {
    async fn current_session(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        for provider in &self.providers {
            if let Some(session) = provider.current_session(headers).await? {
                return Ok(Some(session));
            }
        }
        Ok(None)
    }
}
