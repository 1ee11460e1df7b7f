//! Session: the explicit context handed to every connector call.
//!
//! Owns the shared blocking HTTP client, the service endpoints and any API keys
//! supplied for this run. Created once in `main` and dropped at exit.
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::connectors::{Failure, FailureKind};

pub const DEFAULT_USER_AGENT: &str = concat!("breachwatch/", env!("CARGO_PKG_VERSION"));

/// Base URLs of the remote services. Overridable so tests can point the
/// connectors at a local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub xposedornot: String,
    pub xposedornot_passwords: String,
    pub hudson_rock: String,
    pub hibp: String,
    pub dehashed: String,
    pub rdap: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            xposedornot: "https://api.xposedornot.com/v1".to_string(),
            xposedornot_passwords: "https://passwords.xposedornot.com/v1".to_string(),
            hudson_rock:
                "https://cavalier.hudsonrock.com/api/json/v2/osint-tools/search-by-email"
                    .to_string(),
            hibp: "https://haveibeenpwned.com/api/v3".to_string(),
            dehashed: "https://api.dehashed.com".to_string(),
            rdap: "https://rdap.org".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every HTTP service at one base URL (e.g. a mock server). Each
    /// service keeps a distinct path prefix so routes never overlap.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            xposedornot: format!("{base}/xon/v1"),
            xposedornot_passwords: format!("{base}/xon-pass/v1"),
            hudson_rock: format!("{base}/hudson/search-by-email"),
            hibp: format!("{base}/hibp/api/v3"),
            dehashed: format!("{base}/dehashed"),
            rdap: format!("{base}/rdap"),
        }
    }
}

/// Optional credentials. A connector whose service needs a missing key reports
/// an authentication-required failure without touching the network.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub hibp: Option<String>,
    pub dehashed: Option<String>,
    pub xposedornot: Option<String>,
}

impl ApiKeys {
    fn non_empty(v: Option<String>) -> Option<String> {
        v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }

    pub fn new(hibp: Option<String>, dehashed: Option<String>, xposedornot: Option<String>) -> Self {
        Self {
            hibp: Self::non_empty(hibp),
            dehashed: Self::non_empty(dehashed),
            xposedornot: Self::non_empty(xposedornot),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoints: Endpoints,
    pub keys: ApiKeys,
    /// Replaces every connector's own timeout when set.
    pub timeout_override: Option<Duration>,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            keys: ApiKeys::default(),
            timeout_override: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

pub struct Session {
    client: Client,
    endpoints: Endpoints,
    keys: ApiKeys,
    timeout_override: Option<Duration>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            endpoints: config.endpoints,
            keys: config.keys,
            timeout_override: config.timeout_override,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn keys(&self) -> &ApiKeys {
        &self.keys
    }

    pub fn timeout_for(&self, connector_default: Duration) -> Duration {
        self.timeout_override.unwrap_or(connector_default)
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send one request bounded by `timeout` and classify the response.
    ///
    /// `Ok(None)` means the service answered 404: a valid absence of data.
    pub fn fetch_json<T: DeserializeOwned>(
        &self,
        source: &str,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<Option<T>, Failure> {
        let request = request
            .timeout(timeout)
            .build()
            .map_err(|e| Failure::new(source, FailureKind::Connection(e.to_string())))?;
        debug!(
            "{}: {} {} (timeout {:?})",
            source,
            request.method(),
            request.url().path(),
            timeout
        );
        let response = self
            .client
            .execute(request)
            .map_err(|e| Failure::new(source, classify_transport(&e)))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!("{}: not found", source);
            return Ok(None);
        }
        if let Some(kind) = classify_status(status) {
            warn!("{}: {}", source, kind);
            return Err(Failure::new(source, kind));
        }
        let body = response
            .text()
            .map_err(|e| Failure::new(source, classify_transport(&e)))?;
        let parsed = serde_json::from_str::<T>(&body)
            .map_err(|e| Failure::new(source, FailureKind::MalformedPayload(e.to_string())))?;
        info!("{}: {} OK", source, status.as_u16());
        Ok(Some(parsed))
    }
}

/// `None` for statuses that carry a payload worth parsing.
pub fn classify_status(status: StatusCode) -> Option<FailureKind> {
    match status.as_u16() {
        200..=299 => None,
        429 => Some(FailureKind::RateLimited),
        401 | 403 => Some(FailureKind::AuthRequired(format!(
            "service answered HTTP {}",
            status.as_u16()
        ))),
        code => Some(FailureKind::UnexpectedStatus(code)),
    }
}

fn classify_transport(e: &reqwest::Error) -> FailureKind {
    if e.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Connection(e.to_string())
    }
}
