use std::env;
use std::fmt;
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::error::ServiceError;

pub const DEFAULT_SEARCH_BASE_URL: &str = "https://intranetsearch.cdc.gov/srch/intranet";
pub const DEFAULT_PAGE_BASE_URL: &str = "https://intranet.cdc.gov/";
pub const DEFAULT_RESULT_LIMIT: u32 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Outbound credentials, resolved once at startup and immutable afterwards.
#[derive(Clone)]
pub enum Credentials {
    /// Explicit service account from SERVICE_USERNAME / SERVICE_PASSWORD,
    /// with an optional SERVICE_DOMAIN prefix.
    Service {
        username: String,
        password: String,
        domain: Option<String>,
    },
    /// No explicit account configured; rely on the ambient identity of the
    /// host (the intranet gateway authenticates the machine).
    CurrentUser,
}

impl Credentials {
    /// Resolve from the three credential variables. Empty or whitespace-only
    /// values count as unset. A partial pair is a configuration error, caught
    /// here so it can never surface at call time.
    pub fn resolve(
        username: Option<String>,
        password: Option<String>,
        domain: Option<String>,
    ) -> Result<Self, ServiceError> {
        let username = username.filter(|v| !v.trim().is_empty());
        let password = password.filter(|v| !v.trim().is_empty());
        let domain = domain.filter(|v| !v.trim().is_empty());

        match (username, password) {
            (Some(username), Some(password)) => {
                info!("Using service account: {}", username);
                Ok(Credentials::Service {
                    username,
                    password,
                    domain,
                })
            }
            (None, None) => {
                if domain.is_some() {
                    return Err(ServiceError::InvalidConfiguration(
                        "SERVICE_DOMAIN is set but SERVICE_USERNAME/SERVICE_PASSWORD are not"
                            .into(),
                    ));
                }
                warn!(
                    "Service account credentials not configured; falling back to current user"
                );
                Ok(Credentials::CurrentUser)
            }
            (Some(_), None) => Err(ServiceError::InvalidConfiguration(
                "SERVICE_USERNAME is set without SERVICE_PASSWORD".into(),
            )),
            (None, Some(_)) => Err(ServiceError::InvalidConfiguration(
                "SERVICE_PASSWORD is set without SERVICE_USERNAME".into(),
            )),
        }
    }

    /// Apply these credentials to an outbound request.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credentials::Service {
                username,
                password,
                domain,
            } => {
                let account = match domain {
                    Some(domain) => format!("{domain}\\{username}"),
                    None => username.clone(),
                };
                request.basic_auth(account, Some(password))
            }
            Credentials::CurrentUser => request,
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Service {
                username, domain, ..
            } => f
                .debug_struct("Service")
                .field("username", username)
                .field("domain", domain)
                .finish_non_exhaustive(),
            Credentials::CurrentUser => write!(f, "CurrentUser"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub search_base_url: String,
    pub page_base_url: Url,
    pub credentials: Credentials,
    pub result_limit: u32,
    pub request_timeout: Duration,
    pub max_text_length: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source so resolution is testable
    /// without mutating process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ServiceError> {
        let credentials = Credentials::resolve(
            get("SERVICE_USERNAME"),
            get("SERVICE_PASSWORD"),
            get("SERVICE_DOMAIN"),
        )?;

        let search_base_url = get("SEARCH_BASE_URL")
            .unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let page_base = get("PAGE_BASE_URL").unwrap_or_else(|| DEFAULT_PAGE_BASE_URL.to_string());
        let page_base_url = Url::parse(&page_base).map_err(|e| {
            ServiceError::InvalidConfiguration(format!("PAGE_BASE_URL is not a valid URL: {e}"))
        })?;

        let result_limit = parse_var(&get, "RESULT_LIMIT", DEFAULT_RESULT_LIMIT)?;
        if result_limit == 0 {
            return Err(ServiceError::InvalidConfiguration(
                "RESULT_LIMIT must be at least 1".into(),
            ));
        }

        let timeout_secs: u64 = parse_var(&get, "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let max_text_length = match get("MAX_TEXT_LENGTH") {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                ServiceError::InvalidConfiguration(format!(
                    "MAX_TEXT_LENGTH must be a non-negative integer, got '{raw}'"
                ))
            })?),
            None => None,
        };

        Ok(Config {
            search_base_url,
            page_base_url,
            credentials,
            result_limit,
            request_timeout: Duration::from_secs(timeout_secs),
            max_text_length,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ServiceError> {
    match get(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ServiceError::InvalidConfiguration(format!("{key} must be numeric, got '{raw}'"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn defaults_resolve_to_current_user() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(matches!(config.credentials, Credentials::CurrentUser));
        assert_eq!(config.search_base_url, DEFAULT_SEARCH_BASE_URL);
        assert_eq!(config.result_limit, DEFAULT_RESULT_LIMIT);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_text_length, None);
    }

    #[test]
    fn full_service_account_resolves() {
        let config = Config::from_lookup(lookup(&[
            ("SERVICE_USERNAME", "svc-search"),
            ("SERVICE_PASSWORD", "hunter2"),
            ("SERVICE_DOMAIN", "CDC"),
        ]))
        .unwrap();
        match config.credentials {
            Credentials::Service {
                username, domain, ..
            } => {
                assert_eq!(username, "svc-search");
                assert_eq!(domain.as_deref(), Some("CDC"));
            }
            Credentials::CurrentUser => panic!("expected service credentials"),
        }
    }

    #[test]
    fn partial_credentials_fail_at_startup() {
        let err = Config::from_lookup(lookup(&[("SERVICE_USERNAME", "svc-search")])).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidConfiguration(_)));

        let err = Config::from_lookup(lookup(&[("SERVICE_PASSWORD", "hunter2")])).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidConfiguration(_)));
    }

    #[test]
    fn domain_without_account_fails() {
        let err = Config::from_lookup(lookup(&[("SERVICE_DOMAIN", "CDC")])).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidConfiguration(_)));
    }

    #[test]
    fn whitespace_credentials_count_as_unset() {
        let config = Config::from_lookup(lookup(&[
            ("SERVICE_USERNAME", "   "),
            ("SERVICE_PASSWORD", ""),
        ]))
        .unwrap();
        assert!(matches!(config.credentials, Credentials::CurrentUser));
    }

    #[test]
    fn malformed_numerics_fail_at_startup() {
        let err = Config::from_lookup(lookup(&[("RESULT_LIMIT", "ten")])).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidConfiguration(_)));

        let err = Config::from_lookup(lookup(&[("RESULT_LIMIT", "0")])).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidConfiguration(_)));

        let err = Config::from_lookup(lookup(&[("MAX_TEXT_LENGTH", "-5")])).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidConfiguration(_)));
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("SEARCH_BASE_URL", "https://search.example.gov/srch/intranet/"),
            ("RESULT_LIMIT", "25"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("MAX_TEXT_LENGTH", "4096"),
        ]))
        .unwrap();
        // Trailing slash is normalized away so path joins stay predictable.
        assert_eq!(
            config.search_base_url,
            "https://search.example.gov/srch/intranet"
        );
        assert_eq!(config.result_limit, 25);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_text_length, Some(4096));
    }

    #[test]
    fn debug_never_prints_the_password() {
        let credentials = Credentials::resolve(
            Some("svc-search".into()),
            Some("hunter2".into()),
            Some("CDC".into()),
        )
        .unwrap();
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("svc-search"));
        assert!(!rendered.contains("hunter2"));
    }
}
