//! Authenticators the HTTP transport can apply to outgoing requests.
//!
//! The request builder never sees credentials; they are attached by the
//! transport after the descriptor is built.

use std::fmt;

use reqwest::RequestBuilder;

#[derive(Clone, PartialEq, Eq, Default)]
pub enum Authenticator {
    #[default]
    NoAuth,
    BearerToken(String),
    Basic {
        username: String,
        password: String,
    },
    /// A static key sent in a caller-chosen header.
    ApiKey {
        header: String,
        key: String,
    },
}

impl Authenticator {
    pub fn bearer(token: impl Into<String>) -> Self {
        Authenticator::BearerToken(token.into())
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Authenticator::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn api_key(header: impl Into<String>, key: impl Into<String>) -> Self {
        Authenticator::ApiKey {
            header: header.into(),
            key: key.into(),
        }
    }

    /// Short name used in logs and configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Authenticator::NoAuth => "noauth",
            Authenticator::BearerToken(_) => "bearertoken",
            Authenticator::Basic { .. } => "basic",
            Authenticator::ApiKey { .. } => "apikey",
        }
    }

    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Authenticator::NoAuth => request,
            Authenticator::BearerToken(token) => request.bearer_auth(token),
            Authenticator::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Authenticator::ApiKey { header, key } => request.header(header.as_str(), key.as_str()),
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authenticator::NoAuth => f.write_str("NoAuth"),
            Authenticator::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
            Authenticator::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Authenticator::ApiKey { header, .. } => f
                .debug_struct("ApiKey")
                .field("header", header)
                .field("key", &"<redacted>")
                .finish(),
        }
    }
}
