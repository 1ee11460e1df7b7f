//! Source connectors: one per external lookup.
//!
//! Every connector performs its network work through the shared [`Session`]
//! with a bounded timeout and returns a [`ConnectorResult`]. Failures are
//! captured as typed values, never propagated as process errors. Successful
//! payloads are explicit per-source schemas that know how to summarize
//! themselves using only their own fields.
use std::time::Duration;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::session::Session;
use crate::target::Target;

pub mod dehashed;
pub mod dns;
pub mod hibp;
pub mod hudson_rock;
pub mod whois;
pub mod xposedornot;

pub use dehashed::{Dehashed, DehashedResults};
pub use dns::{Dns, DnsBackend, DnsRecords, LookupError, RecordKind};
pub use hibp::{HaveIBeenPwned, PwnedAccount};
pub use hudson_rock::{HudsonRock, StealerLogs};
pub use whois::{Whois, WhoisRecord};
pub use xposedornot::{
    BreachAnalytics, BreachCatalog, DomainBreaches, EmailBreaches, PasswordExposure,
    XonBreachAnalytics, XonBreachCatalog, XonDomainBreaches, XonEmailBreaches,
    XonPasswordExposure,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("rate limited by the service")]
    RateLimited,
    #[error("authentication required: {0}")]
    AuthRequired(String),
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
    #[error("malformed response: {0}")]
    MalformedPayload(String),
    #[error("not applicable to {0}")]
    UnsupportedTarget(String),
}

impl FailureKind {
    /// Timeouts and connection errors, as opposed to answers the service gave.
    pub fn is_transport(&self) -> bool {
        matches!(self, FailureKind::Timeout | FailureKind::Connection(_))
    }

    /// Short taxonomy label used in report notes.
    pub fn category(&self) -> &'static str {
        match self {
            FailureKind::RateLimited => "rate limited",
            FailureKind::AuthRequired(_) => "authentication required",
            FailureKind::Timeout | FailureKind::Connection(_) => "transport failure",
            FailureKind::UnexpectedStatus(_) | FailureKind::MalformedPayload(_) => {
                "unexpected response"
            }
            FailureKind::UnsupportedTarget(_) => "not applicable",
        }
    }
}

/// Why one source produced no data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source_name}: {kind}")]
pub struct Failure {
    pub source_name: String,
    pub kind: FailureKind,
}

impl Failure {
    pub fn new(source: &str, kind: FailureKind) -> Self {
        Self {
            source_name: source.to_string(),
            kind,
        }
    }

    pub(crate) fn unsupported(source: &str, target: &Target) -> Self {
        Self::new(source, FailureKind::UnsupportedTarget(target.label()))
    }
}

/// Structured data returned by a successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    EmailBreaches(EmailBreaches),
    BreachAnalytics(BreachAnalytics),
    PasswordExposure(PasswordExposure),
    DomainBreaches(DomainBreaches),
    BreachCatalog(BreachCatalog),
    StealerLogs(StealerLogs),
    PwnedAccount(PwnedAccount),
    Dehashed(DehashedResults),
    Whois(WhoisRecord),
    Dns(DnsRecords),
}

impl Payload {
    pub fn summarize(&self) -> Summary {
        match self {
            Payload::EmailBreaches(p) => p.summarize(),
            Payload::BreachAnalytics(p) => p.summarize(),
            Payload::PasswordExposure(p) => p.summarize(),
            Payload::DomainBreaches(p) => p.summarize(),
            Payload::BreachCatalog(p) => p.summarize(),
            Payload::StealerLogs(p) => p.summarize(),
            Payload::PwnedAccount(p) => p.summarize(),
            Payload::Dehashed(p) => p.summarize(),
            Payload::Whois(p) => p.summarize(),
            Payload::Dns(p) => p.summarize(),
        }
    }
}

/// Outcome of a single connector call. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorResult {
    Success(Payload),
    Failure(Failure),
}

impl ConnectorResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConnectorResult::Success(_))
    }
}

impl From<Result<Payload, Failure>> for ConnectorResult {
    fn from(r: Result<Payload, Failure>) -> Self {
        match r {
            Ok(p) => ConnectorResult::Success(p),
            Err(f) => ConnectorResult::Failure(f),
        }
    }
}

/// How a summary should be emphasised on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Clean,
    /// Elevated but not critical.
    Warning,
    Alert,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Line(String),
    Table(Table),
}

/// Rendered view of one payload: a headline plus ordered lines and tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub headline: String,
    pub tone: Tone,
    pub blocks: Vec<Block>,
}

impl Summary {
    pub fn new(tone: Tone, headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            tone,
            blocks: Vec::new(),
        }
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Line(line.into()));
        self
    }

    pub fn table(&mut self, table: Table) -> &mut Self {
        if !table.rows.is_empty() {
            self.blocks.push(Block::Table(table));
        }
        self
    }

    /// Number of table rows across all blocks.
    pub fn row_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| match b {
                Block::Table(t) => t.rows.len(),
                Block::Line(_) => 0,
            })
            .sum()
    }
}

pub trait Connector {
    /// Stable source name used in failure notes and logs.
    fn name(&self) -> &'static str;

    /// Section title in the report.
    fn title(&self) -> &'static str;

    fn default_timeout(&self) -> Duration;

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure>;

    fn query(&self, session: &Session, target: &Target) -> ConnectorResult {
        self.fetch(session, target).into()
    }
}

/// Format an integer with `,` thousands separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Read a count that services send either as a JSON number or a numeric string.
pub(crate) fn count_value(v: &serde_json::Value) -> Option<u64> {
    match v {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Display form of a record count: grouped digits when numeric, verbatim
/// text otherwise, `N/A` when absent.
pub(crate) fn display_count(v: Option<&serde_json::Value>) -> String {
    match v {
        None | Some(serde_json::Value::Null) => "N/A".to_string(),
        Some(v) => match count_value(v) {
            Some(n) => group_thousands(n),
            None => match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        },
    }
}

/// Characters escaped when an identity is placed in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'+')
    .add(b'/')
    .add(b'?');

pub(crate) fn encode_path_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(152445165), "152,445,165");
    }

    #[test]
    fn counts_from_numbers_and_strings() {
        assert_eq!(count_value(&json!(12)), Some(12));
        assert_eq!(count_value(&json!(" 34 ")), Some(34));
        assert_eq!(count_value(&json!("many")), None);
        assert_eq!(display_count(Some(&json!("1234567"))), "1,234,567");
        assert_eq!(display_count(Some(&json!("unknown"))), "unknown");
        assert_eq!(display_count(None), "N/A");
    }

    #[test]
    fn path_segments_keep_email_readable() {
        assert_eq!(encode_path_segment("user@example.com"), "user@example.com");
        assert_eq!(encode_path_segment("a+b/c"), "a%2Bb%2Fc");
    }

    #[test]
    fn transport_failures_are_grouped() {
        assert!(FailureKind::Timeout.is_transport());
        assert!(FailureKind::Connection("refused".into()).is_transport());
        assert!(!FailureKind::RateLimited.is_transport());
        assert!(!FailureKind::UnexpectedStatus(500).is_transport());
    }

    #[test]
    fn empty_tables_are_not_added() {
        let mut s = Summary::new(Tone::Info, "x");
        s.table(Table::new(["a"]));
        assert!(s.blocks.is_empty());
        let mut t = Table::new(["a"]);
        t.push_row(["1"]);
        t.push_row(["2"]);
        s.table(t);
        assert_eq!(s.row_count(), 2);
    }
}
