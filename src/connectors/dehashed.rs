//! Dehashed leaked-record search. Requires an API key, sent as a Basic
//! authorization credential exactly as supplied.
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::{Connector, Failure, FailureKind, Payload, Summary, Table, Tone, count_value};
use crate::session::Session;
use crate::target::Target;

/// Entries listed in the report.
pub const DEHASHED_DISPLAY_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
struct EntryRaw {
    email: Option<String>,
    password: Option<String>,
    #[serde(rename = "database_name", alias = "source")]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    entries: Option<Vec<EntryRaw>>,
    total: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DehashedEntry {
    pub email: String,
    /// Leaked password, masked before it is stored.
    pub password: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DehashedResults {
    pub total: u64,
    pub entries: Vec<DehashedEntry>,
}

/// Keep the first and last character of a secret, star out the rest.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => "N/A".to_string(),
        1 | 2 => "*".repeat(chars.len()),
        n => format!("{}{}{}", chars[0], "*".repeat(n - 2), chars[n - 1]),
    }
}

impl DehashedResults {
    fn from_response(resp: SearchResponse) -> Self {
        let entries: Vec<DehashedEntry> = resp
            .entries
            .unwrap_or_default()
            .into_iter()
            .map(|e| DehashedEntry {
                email: e.email.unwrap_or_else(|| "N/A".to_string()),
                password: mask_secret(e.password.as_deref().unwrap_or_default()),
                source: e.source.unwrap_or_else(|| "Unknown source".to_string()),
            })
            .collect();
        let total = resp
            .total
            .as_ref()
            .and_then(count_value)
            .unwrap_or(entries.len() as u64);
        Self { total, entries }
    }

    pub fn summarize(&self) -> Summary {
        if self.entries.is_empty() {
            let mut s = Summary::new(Tone::Clean, "Status: no data found");
            s.line("No entries found in the Dehashed database.");
            return s;
        }
        let mut s = Summary::new(Tone::Alert, format!("Status: found {} entries", self.total));
        let mut t = Table::new(["Email", "Password", "Source"]);
        for e in self.entries.iter().take(DEHASHED_DISPLAY_LIMIT) {
            t.push_row([e.email.clone(), e.password.clone(), e.source.clone()]);
        }
        s.table(t);
        s
    }
}

pub struct Dehashed;

impl Connector for Dehashed {
    fn name(&self) -> &'static str {
        "dehashed"
    }

    fn title(&self) -> &'static str {
        "Dehashed"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure> {
        let email = target
            .as_email()
            .ok_or_else(|| Failure::unsupported(self.name(), target))?;
        let Some(key) = &session.keys().dehashed else {
            return Err(Failure::new(
                self.name(),
                FailureKind::AuthRequired("Dehashed API key required".to_string()),
            ));
        };
        let url = format!("{}/search", session.endpoints().dehashed);
        let req = session
            .get(&url)
            .query(&[("query", format!("email:{email}"))])
            .header("Accept", "application/json")
            .header("Authorization", format!("Basic {key}"));
        let resp: Option<SearchResponse> =
            session.fetch_json(self.name(), req, session.timeout_for(self.default_timeout()))?;
        Ok(Payload::Dehashed(
            resp.map(DehashedResults::from_response).unwrap_or_default(),
        ))
    }
}
