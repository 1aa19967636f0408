//! Service configuration.
//!
//! # Design
//! `ServiceOptions` is plain data consumed by `HttpTransport::new`. It can be
//! filled from environment variables named `<SERVICE_NAME>_<KEY>`, e.g.
//! `PARTNER_CENTER_SELL_URL`. Reading goes through a lookup closure so tests
//! never touch the process environment.

use std::time::Duration;

use crate::auth::Authenticator;
use crate::error::ConfigError;
use crate::transport::RetryPolicy;

pub const DEFAULT_SERVICE_URL: &str = "https://product-lifecycle.api.cloud.ibm.com/openapi/v1";
pub const DEFAULT_SERVICE_NAME: &str = "partner_center_sell";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOptions {
    pub service_name: String,
    /// Base URL without a trailing slash.
    pub service_url: String,
    pub authenticator: Authenticator,
    pub timeout: Duration,
    pub disable_ssl_verification: bool,
    /// `None` means retries are disabled.
    pub retry: Option<RetryPolicy>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_url: DEFAULT_SERVICE_URL.to_string(),
            authenticator: Authenticator::NoAuth,
            timeout: DEFAULT_TIMEOUT,
            disable_ssl_verification: false,
            retry: None,
        }
    }
}

impl ServiceOptions {
    pub fn new(service_url: &str) -> Self {
        Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Read options from the process environment.
    pub fn from_env(service_name: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Read options through `lookup`, which receives fully prefixed variable
    /// names. Unset and blank variables keep their defaults.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = service_name.to_uppercase().replace('-', "_");
        let var = |key: &str| {
            let name = format!("{prefix}_{key}");
            lookup(&name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        };

        let mut options = Self {
            service_name: service_name.to_string(),
            ..Self::default()
        };

        if let Some((_, url)) = var("URL") {
            options.service_url = url.trim_end_matches('/').to_string();
        }

        options.authenticator = match var("AUTH_TYPE") {
            None => Authenticator::NoAuth,
            Some((_, kind)) => match kind.to_lowercase().as_str() {
                "noauth" => Authenticator::NoAuth,
                "bearertoken" => {
                    let (_, token) = var("BEARER_TOKEN").ok_or_else(|| missing(&prefix, "BEARER_TOKEN", &kind))?;
                    Authenticator::BearerToken(token)
                }
                "basic" => {
                    let (_, username) = var("USERNAME").ok_or_else(|| missing(&prefix, "USERNAME", &kind))?;
                    let (_, password) = var("PASSWORD").ok_or_else(|| missing(&prefix, "PASSWORD", &kind))?;
                    Authenticator::Basic { username, password }
                }
                "apikey" => {
                    let (_, key) = var("APIKEY").ok_or_else(|| missing(&prefix, "APIKEY", &kind))?;
                    let header = var("APIKEY_HEADER")
                        .map(|(_, h)| h)
                        .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string());
                    Authenticator::ApiKey { header, key }
                }
                _ => return Err(ConfigError::UnsupportedAuthType(kind)),
            },
        };

        if let Some((name, value)) = var("DISABLE_SSL") {
            options.disable_ssl_verification = parse_bool(&name, &value)?;
        }

        if let Some((name, value)) = var("TIMEOUT") {
            let secs = parse_u64(&name, &value)?;
            if secs == 0 {
                return Err(invalid(&name, &value));
            }
            options.timeout = Duration::from_secs(secs);
        }

        let enabled = match var("ENABLE_RETRIES") {
            Some((name, value)) => parse_bool(&name, &value)?,
            None => false,
        };
        if enabled {
            let mut policy = RetryPolicy::default();
            if let Some((name, value)) = var("MAX_RETRIES") {
                let max = parse_u64(&name, &value)?;
                policy.max_retries = u32::try_from(max).map_err(|_| invalid(&name, &value))?;
            }
            if let Some((name, value)) = var("RETRY_INTERVAL") {
                policy.max_interval = Duration::from_secs(parse_u64(&name, &value)?);
            }
            options.retry = Some(policy);
        }

        Ok(options)
    }
}

fn missing(prefix: &str, key: &str, auth_type: &str) -> ConfigError {
    ConfigError::MissingCredential {
        key: format!("{prefix}_{key}"),
        auth_type: auth_type.to_string(),
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: name.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn parse_u64(name: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| invalid(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let options = ServiceOptions::from_lookup(DEFAULT_SERVICE_NAME, lookup(&[])).unwrap();
        assert_eq!(options, ServiceOptions::default());
    }

    #[test]
    fn reads_url_and_strips_trailing_slash() {
        let options = ServiceOptions::from_lookup(
            "partner_center_sell",
            lookup(&[("PARTNER_CENTER_SELL_URL", "https://example.com/v1/")]),
        )
        .unwrap();
        assert_eq!(options.service_url, "https://example.com/v1");
        assert_eq!(options.service_name, "partner_center_sell");
    }

    #[test]
    fn custom_service_name_changes_prefix() {
        let options = ServiceOptions::from_lookup(
            "my-service",
            lookup(&[("MY_SERVICE_URL", "custom.com"), ("PARTNER_CENTER_SELL_URL", "ignored")]),
        )
        .unwrap();
        assert_eq!(options.service_url, "custom.com");
    }

    #[test]
    fn bearer_token_auth() {
        let options = ServiceOptions::from_lookup(
            DEFAULT_SERVICE_NAME,
            lookup(&[
                ("PARTNER_CENTER_SELL_AUTH_TYPE", "bearerToken"),
                ("PARTNER_CENTER_SELL_BEARER_TOKEN", "tok"),
            ]),
        )
        .unwrap();
        assert_eq!(options.authenticator, Authenticator::bearer("tok"));
    }

    #[test]
    fn bearer_token_auth_requires_token() {
        let err = ServiceOptions::from_lookup(
            DEFAULT_SERVICE_NAME,
            lookup(&[("PARTNER_CENTER_SELL_AUTH_TYPE", "bearertoken")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { ref key, .. } if key == "PARTNER_CENTER_SELL_BEARER_TOKEN"));
    }

    #[test]
    fn basic_and_api_key_auth() {
        let options = ServiceOptions::from_lookup(
            DEFAULT_SERVICE_NAME,
            lookup(&[
                ("PARTNER_CENTER_SELL_AUTH_TYPE", "basic"),
                ("PARTNER_CENTER_SELL_USERNAME", "alice"),
                ("PARTNER_CENTER_SELL_PASSWORD", "pw"),
            ]),
        )
        .unwrap();
        assert_eq!(options.authenticator, Authenticator::basic("alice", "pw"));

        let options = ServiceOptions::from_lookup(
            DEFAULT_SERVICE_NAME,
            lookup(&[
                ("PARTNER_CENTER_SELL_AUTH_TYPE", "apikey"),
                ("PARTNER_CENTER_SELL_APIKEY", "k"),
            ]),
        )
        .unwrap();
        assert_eq!(
            options.authenticator,
            Authenticator::api_key(DEFAULT_API_KEY_HEADER, "k")
        );
    }

    #[test]
    fn unsupported_auth_type() {
        let err = ServiceOptions::from_lookup(
            DEFAULT_SERVICE_NAME,
            lookup(&[("PARTNER_CENTER_SELL_AUTH_TYPE", "iam")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedAuthType(ref t) if t == "iam"));
    }

    #[test]
    fn retries_and_timeouts() {
        let options = ServiceOptions::from_lookup(
            DEFAULT_SERVICE_NAME,
            lookup(&[
                ("PARTNER_CENTER_SELL_ENABLE_RETRIES", "true"),
                ("PARTNER_CENTER_SELL_MAX_RETRIES", "2"),
                ("PARTNER_CENTER_SELL_RETRY_INTERVAL", "10"),
                ("PARTNER_CENTER_SELL_TIMEOUT", "5"),
                ("PARTNER_CENTER_SELL_DISABLE_SSL", "TRUE"),
            ]),
        )
        .unwrap();
        let retry = options.retry.unwrap();
        assert_eq!(retry.max_retries, 2);
        assert_eq!(retry.max_interval, Duration::from_secs(10));
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(options.disable_ssl_verification);
    }

    #[test]
    fn retry_settings_ignored_unless_enabled() {
        let options = ServiceOptions::from_lookup(
            DEFAULT_SERVICE_NAME,
            lookup(&[("PARTNER_CENTER_SELL_MAX_RETRIES", "2")]),
        )
        .unwrap();
        assert!(options.retry.is_none());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = ServiceOptions::from_lookup(
            DEFAULT_SERVICE_NAME,
            lookup(&[("PARTNER_CENTER_SELL_TIMEOUT", "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PARTNER_CENTER_SELL_TIMEOUT"));

        let err = ServiceOptions::from_lookup(
            DEFAULT_SERVICE_NAME,
            lookup(&[("PARTNER_CENTER_SELL_DISABLE_SSL", "maybe")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ServiceOptions::from_lookup(
            DEFAULT_SERVICE_NAME,
            lookup(&[("PARTNER_CENTER_SELL_TIMEOUT", "0")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, ref value }
                if key == "PARTNER_CENTER_SELL_TIMEOUT" && value == "0"
        ));
    }

    #[test]
    fn builder_methods() {
        let options = ServiceOptions::new("http://localhost:3000/")
            .with_authenticator(Authenticator::bearer("t"))
            .with_timeout(Duration::from_secs(1))
            .with_retries(RetryPolicy::default());
        assert_eq!(options.service_url, "http://localhost:3000");
        assert_eq!(options.timeout, Duration::from_secs(1));
        assert!(options.retry.is_some());
    }
}
