//! Hudson Rock info-stealer intelligence lookup by email.
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::{Connector, Failure, Payload, Summary, Tone, count_value};
use crate::session::Session;
use crate::target::Target;

#[derive(Debug, Deserialize)]
struct StealerRaw {
    date_compromised: Option<String>,
    ip: Option<String>,
    computer_name: Option<String>,
    operating_system: Option<String>,
    #[serde(default)]
    top_logins: Vec<String>,
    #[serde(default)]
    top_passwords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    stealers: Vec<StealerRaw>,
    total_corporate_services: Option<Value>,
    total_user_services: Option<Value>,
}

/// One infected machine the address was harvested from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealerRecord {
    pub date_compromised: String,
    pub ip: String,
    pub computer_name: String,
    pub operating_system: String,
    pub top_logins: Vec<String>,
    pub top_passwords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StealerLogs {
    pub stealers: Vec<StealerRecord>,
    pub corporate_services: u64,
    pub user_services: u64,
}

fn or_unknown(v: Option<String>) -> String {
    v.filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

impl StealerLogs {
    fn from_response(resp: SearchResponse) -> Self {
        let stealers = resp
            .stealers
            .into_iter()
            .map(|s| StealerRecord {
                date_compromised: or_unknown(s.date_compromised),
                ip: or_unknown(s.ip),
                computer_name: or_unknown(s.computer_name),
                operating_system: or_unknown(s.operating_system),
                top_logins: s.top_logins,
                top_passwords: s.top_passwords,
            })
            .collect();
        Self {
            stealers,
            corporate_services: resp
                .total_corporate_services
                .as_ref()
                .and_then(count_value)
                .unwrap_or(0),
            user_services: resp
                .total_user_services
                .as_ref()
                .and_then(count_value)
                .unwrap_or(0),
        }
    }

    pub fn summarize(&self) -> Summary {
        if self.stealers.is_empty() {
            let mut s = Summary::new(Tone::Clean, "Status: no compromises found");
            s.line("No info-stealer infections recorded for this address.");
            return s;
        }
        let mut s = Summary::new(Tone::Alert, "Status: COMPROMISED");
        s.line(format!("Total infections: {}", self.stealers.len()));
        s.line(format!("Corporate services: {}", self.corporate_services));
        s.line(format!("User services: {}", self.user_services));
        for (i, st) in self.stealers.iter().enumerate() {
            s.line(format!("Infection #{}:", i + 1));
            s.line(format!("  Date: {}", st.date_compromised));
            s.line(format!("  IP: {}", st.ip));
            s.line(format!("  Computer: {}", st.computer_name));
            s.line(format!("  OS: {}", st.operating_system));
            s.line(format!("  Top Logins: {}", st.top_logins.join(", ")));
            s.line(format!("  Top Passwords: {}", st.top_passwords.join(", ")));
        }
        s
    }
}

pub struct HudsonRock;

impl Connector for HudsonRock {
    fn name(&self) -> &'static str {
        "hudson-rock"
    }

    fn title(&self) -> &'static str {
        "Hudson Rock Stealer Intelligence"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure> {
        let email = target
            .as_email()
            .ok_or_else(|| Failure::unsupported(self.name(), target))?;
        let req = session
            .get(&session.endpoints().hudson_rock)
            .query(&[("email", email)]);
        let resp: Option<SearchResponse> =
            session.fetch_json(self.name(), req, session.timeout_for(self.default_timeout()))?;
        Ok(Payload::StealerLogs(
            resp.map(StealerLogs::from_response).unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::ConnectorResult;
    use crate::session::{Endpoints, SessionConfig};
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn parses_stealer_records_with_defaults() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/hudson/search-by-email")
                .query_param("email", "user@example.com");
            then.status(200).json_body(json!({
                "message": "This email address is associated with a computer that was infected",
                "stealers": [{
                    "date_compromised": "2023-05-01T10:00:00.000Z",
                    "computer_name": "DESKTOP-1",
                    "top_logins": ["u***@example.com"],
                    "top_passwords": ["p*******"]
                }],
                "total_corporate_services": 2,
                "total_user_services": "7"
            }));
        });
        let session = Session::new(SessionConfig {
            endpoints: Endpoints::all_at(&server.base_url()),
            ..SessionConfig::default()
        })
        .unwrap();
        let ConnectorResult::Success(Payload::StealerLogs(logs)) =
            HudsonRock.query(&session, &Target::email("user@example.com").unwrap())
        else {
            panic!("expected stealer logs");
        };
        assert_eq!(logs.stealers.len(), 1);
        assert_eq!(logs.stealers[0].ip, "Unknown");
        assert_eq!(logs.corporate_services, 2);
        assert_eq!(logs.user_services, 7);
        let summary = logs.summarize();
        assert_eq!(summary.tone, Tone::Alert);
        assert!(summary.blocks.contains(&crate::connectors::Block::Line(
            "  Computer: DESKTOP-1".to_string()
        )));
    }

    #[test]
    fn empty_stealer_list_is_clean() {
        let logs = StealerLogs::default();
        assert_eq!(logs.summarize().tone, Tone::Clean);
    }
}
