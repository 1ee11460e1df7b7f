//! Have I Been Pwned breached-account lookup. Requires an API key.
use std::time::Duration;

use serde::Deserialize;

use super::{Connector, Failure, FailureKind, Payload, Summary, Table, Tone, encode_path_segment};
use crate::session::Session;
use crate::target::Target;

#[derive(Debug, Deserialize)]
struct BreachRaw {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "BreachDate")]
    breach_date: Option<String>,
    #[serde(rename = "Domain")]
    domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwnedBreach {
    pub name: String,
    pub breach_date: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PwnedAccount {
    pub breaches: Vec<PwnedBreach>,
}

impl PwnedAccount {
    fn from_response(raw: Vec<BreachRaw>) -> Self {
        let breaches = raw
            .into_iter()
            .map(|b| PwnedBreach {
                name: b.name.unwrap_or_else(|| "Unknown".to_string()),
                breach_date: b.breach_date.unwrap_or_else(|| "Unknown date".to_string()),
                domain: b.domain.filter(|d| !d.is_empty()).unwrap_or_else(|| "N/A".to_string()),
            })
            .collect();
        Self { breaches }
    }

    pub fn summarize(&self) -> Summary {
        if self.breaches.is_empty() {
            let mut s = Summary::new(Tone::Clean, "Status: no breaches found");
            s.line("No breaches found in the Have I Been Pwned database.");
            return s;
        }
        let mut s = Summary::new(
            Tone::Alert,
            format!("Status: found in {} breaches", self.breaches.len()),
        );
        let mut t = Table::new(["Breach", "Date", "Domain"]);
        for b in &self.breaches {
            t.push_row([b.name.clone(), b.breach_date.clone(), b.domain.clone()]);
        }
        s.table(t);
        s
    }
}

pub struct HaveIBeenPwned;

impl Connector for HaveIBeenPwned {
    fn name(&self) -> &'static str {
        "haveibeenpwned"
    }

    fn title(&self) -> &'static str {
        "Have I Been Pwned"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure> {
        let email = target
            .as_email()
            .ok_or_else(|| Failure::unsupported(self.name(), target))?;
        let Some(key) = &session.keys().hibp else {
            return Err(Failure::new(
                self.name(),
                FailureKind::AuthRequired("HIBP API key required".to_string()),
            ));
        };
        let url = format!(
            "{}/breachedaccount/{}",
            session.endpoints().hibp,
            encode_path_segment(email)
        );
        let req = session
            .get(&url)
            .query(&[("truncateResponse", "false")])
            .header("hibp-api-key", key);
        let resp: Option<Vec<BreachRaw>> =
            session.fetch_json(self.name(), req, session.timeout_for(self.default_timeout()))?;
        Ok(Payload::PwnedAccount(
            resp.map(PwnedAccount::from_response).unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::ConnectorResult;
    use crate::session::{ApiKeys, Endpoints, SessionConfig};
    use httpmock::prelude::*;
    use serde_json::json;

    fn session(server: &MockServer, key: Option<&str>) -> Session {
        Session::new(SessionConfig {
            endpoints: Endpoints::all_at(&server.base_url()),
            keys: ApiKeys::new(key.map(str::to_string), None, None),
            ..SessionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn missing_key_fails_without_request() {
        let server = MockServer::start();
        let r = HaveIBeenPwned.query(
            &session(&server, None),
            &Target::email("user@example.com").unwrap(),
        );
        assert!(matches!(
            r,
            ConnectorResult::Failure(Failure {
                kind: FailureKind::AuthRequired(_),
                ..
            })
        ));
    }

    #[test]
    fn lists_breaches_with_key_header() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/hibp/api/v3/breachedaccount/user@example.com")
                .header("hibp-api-key", "k1");
            then.status(200).json_body(json!([
                {"Name": "Adobe", "BreachDate": "2013-10-04", "Domain": "adobe.com"},
                {"Name": "Collection1"}
            ]));
        });
        let ConnectorResult::Success(Payload::PwnedAccount(acct)) = HaveIBeenPwned.query(
            &session(&server, Some("k1")),
            &Target::email("user@example.com").unwrap(),
        ) else {
            panic!("expected pwned account");
        };
        assert_eq!(acct.breaches.len(), 2);
        assert_eq!(acct.breaches[1].breach_date, "Unknown date");
        assert_eq!(acct.breaches[1].domain, "N/A");
    }

    #[test]
    fn not_found_means_no_breaches() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.path_includes("/breachedaccount/");
            then.status(404);
        });
        let r = HaveIBeenPwned.query(
            &session(&server, Some("k1")),
            &Target::email("user@example.com").unwrap(),
        );
        assert_eq!(
            r,
            ConnectorResult::Success(Payload::PwnedAccount(PwnedAccount::default()))
        );
    }
}
