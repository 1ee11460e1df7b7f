//! DNS record lookup for a domain (A, AAAA, MX, NS, TXT, CNAME).
//!
//! Lookups go through a [`DnsBackend`] so the connector can be exercised
//! without a network; the default backend is the system resolver.
use std::fmt;
use std::time::Duration;

use log::debug;
use trust_dns_resolver::Resolver;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::proto::rr::RecordType;

use super::{Connector, Failure, FailureKind, Payload, Summary, Tone};
use crate::session::Session;
use crate::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    A,
    Aaaa,
    Mx,
    Ns,
    Txt,
    Cname,
}

impl RecordKind {
    /// Query order used in reports.
    pub const ALL: [RecordKind; 6] = [
        RecordKind::A,
        RecordKind::Aaaa,
        RecordKind::Mx,
        RecordKind::Ns,
        RecordKind::Txt,
        RecordKind::Cname,
    ];

    fn record_type(self) -> RecordType {
        match self {
            RecordKind::A => RecordType::A,
            RecordKind::Aaaa => RecordType::AAAA,
            RecordKind::Mx => RecordType::MX,
            RecordKind::Ns => RecordType::NS,
            RecordKind::Txt => RecordType::TXT,
            RecordKind::Cname => RecordType::CNAME,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Mx => "MX",
            RecordKind::Ns => "NS",
            RecordKind::Txt => "TXT",
            RecordKind::Cname => "CNAME",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("no records")]
    NoRecords,
    #[error("lookup timed out")]
    Timeout,
    #[error("{0}")]
    Failed(String),
}

pub trait DnsBackend {
    fn lookup(&self, domain: &str, kind: RecordKind) -> Result<Vec<String>, LookupError>;
}

/// Blocking resolver built from the host's resolver configuration.
pub struct SystemResolver {
    inner: Resolver,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> std::io::Result<Self> {
        let (config, mut opts) = trust_dns_resolver::system_conf::read_system_conf()
            .unwrap_or_else(|_| (ResolverConfig::default(), ResolverOpts::default()));
        opts.timeout = timeout;
        opts.attempts = 1;
        Ok(Self {
            inner: Resolver::new(config, opts)?,
        })
    }
}

impl DnsBackend for SystemResolver {
    fn lookup(&self, domain: &str, kind: RecordKind) -> Result<Vec<String>, LookupError> {
        match self.inner.lookup(domain, kind.record_type()) {
            Ok(answer) => Ok(answer.iter().map(|r| r.to_string()).collect()),
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Err(LookupError::NoRecords),
                ResolveErrorKind::Timeout => Err(LookupError::Timeout),
                _ => Err(LookupError::Failed(e.to_string())),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsAnswer {
    Records(Vec<String>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecords {
    pub domain: String,
    pub answers: Vec<(RecordKind, DnsAnswer)>,
}

impl DnsRecords {
    pub fn summarize(&self) -> Summary {
        let mut s = Summary::new(Tone::Info, format!("DNS records for {}", self.domain));
        for (kind, answer) in &self.answers {
            match answer {
                DnsAnswer::Records(r) if r.is_empty() => {}
                DnsAnswer::Records(r) => {
                    s.line(format!("{}: {}", kind, r.join(", ")));
                }
                DnsAnswer::Error(e) => {
                    s.line(format!("{}: error: {}", kind, e));
                }
            }
        }
        if s.blocks.is_empty() {
            s.line("No DNS records found.");
        }
        s
    }
}

/// Resolve every record kind; per-kind errors are kept, and the connector only
/// fails when no kind could be resolved at all.
pub fn resolve_all(
    backend: &dyn DnsBackend,
    source: &str,
    domain: &str,
) -> Result<DnsRecords, Failure> {
    let mut answers = Vec::with_capacity(RecordKind::ALL.len());
    let mut first_error: Option<LookupError> = None;
    let mut resolved_any = false;
    for kind in RecordKind::ALL {
        let answer = match backend.lookup(domain, kind) {
            Ok(records) => {
                resolved_any = true;
                DnsAnswer::Records(records)
            }
            Err(LookupError::NoRecords) => {
                resolved_any = true;
                DnsAnswer::Records(Vec::new())
            }
            Err(e) => {
                debug!("{}: {} lookup for {} failed: {}", source, kind, domain, e);
                let msg = e.to_string();
                first_error.get_or_insert(e);
                DnsAnswer::Error(msg)
            }
        };
        answers.push((kind, answer));
    }
    if !resolved_any {
        let kind = match first_error {
            Some(LookupError::Timeout) => FailureKind::Timeout,
            Some(e) => FailureKind::Connection(e.to_string()),
            None => FailureKind::Connection("no answers".to_string()),
        };
        return Err(Failure::new(source, kind));
    }
    Ok(DnsRecords {
        domain: domain.to_string(),
        answers,
    })
}

#[derive(Default)]
pub struct Dns {
    backend: Option<Box<dyn DnsBackend>>,
}

impl Dns {
    /// Use the host resolver, built per query with the session timeout.
    pub fn system() -> Self {
        Self { backend: None }
    }

    pub fn with_backend(backend: Box<dyn DnsBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }
}

impl Connector for Dns {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn title(&self) -> &'static str {
        "DNS Records"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure> {
        let domain = target
            .lookup_domain()
            .ok_or_else(|| Failure::unsupported(self.name(), target))?;
        let records = match &self.backend {
            Some(b) => resolve_all(b.as_ref(), self.name(), domain)?,
            None => {
                // Per-kind timeout, so six lookups stay within the overall budget.
                let per_kind = session.timeout_for(self.default_timeout()) / RecordKind::ALL.len() as u32;
                let resolver = SystemResolver::new(per_kind).map_err(|e| {
                    Failure::new(self.name(), FailureKind::Connection(e.to_string()))
                })?;
                resolve_all(&resolver, self.name(), domain)?
            }
        };
        Ok(Payload::Dns(records))
    }
}
