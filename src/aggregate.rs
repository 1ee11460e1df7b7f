//! Aggregator: merges independent connector outcomes into one report.
//!
//! Connectors run strictly in sequence in a fixed priority order per report
//! kind. Each outcome becomes exactly one section; a failed source degrades to
//! an "unavailable" note and never aborts the report.
//!
//! ```no_run
//! use breachwatch::aggregate::{ReportKind, run_report};
//! use breachwatch::session::{Session, SessionConfig};
//! use breachwatch::target::Target;
//! # fn main() -> anyhow::Result<()> {
//! let session = Session::new(SessionConfig::default())?;
//! let target = Target::email("user@example.com")?;
//! let report = run_report(&session, ReportKind::EmailBreaches, &target, chrono::Local::now());
//! println!("{}", breachwatch::render::render_text(&report));
//! # Ok(())
//! # }
//! ```
use chrono::{DateTime, Local};
use log::{info, warn};

use crate::connectors::{
    Connector, ConnectorResult, Dehashed, Dns, Failure, HaveIBeenPwned, HudsonRock, Summary,
    Whois, XonBreachAnalytics, XonBreachCatalog, XonDomainBreaches, XonEmailBreaches,
    XonPasswordExposure,
};
use crate::session::Session;
use crate::target::Target;

/// Categories offered by the interactive menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    EmailBreaches,
    BreachAnalytics,
    PasswordExposure,
    DomainIntel,
    BreachCatalog,
    OsintProfile,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::EmailBreaches,
        ReportKind::BreachAnalytics,
        ReportKind::PasswordExposure,
        ReportKind::DomainIntel,
        ReportKind::BreachCatalog,
        ReportKind::OsintProfile,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::EmailBreaches => "Email Breach Report",
            ReportKind::BreachAnalytics => "Breach Analytics Report",
            ReportKind::PasswordExposure => "Password Exposure Report",
            ReportKind::DomainIntel => "Domain Intelligence Report",
            ReportKind::BreachCatalog => "Breach Catalog Report",
            ReportKind::OsintProfile => "Comprehensive OSINT Report",
        }
    }

    /// Connectors in priority order.
    pub fn connectors(self) -> Vec<Box<dyn Connector>> {
        match self {
            ReportKind::EmailBreaches => vec![Box::new(XonEmailBreaches)],
            ReportKind::BreachAnalytics => vec![Box::new(XonBreachAnalytics)],
            ReportKind::PasswordExposure => vec![Box::new(XonPasswordExposure)],
            ReportKind::DomainIntel => vec![
                Box::new(XonDomainBreaches),
                Box::new(XonBreachCatalog),
                Box::new(Whois),
                Box::new(Dns::system()),
            ],
            ReportKind::BreachCatalog => vec![Box::new(XonBreachCatalog)],
            ReportKind::OsintProfile => vec![
                Box::new(HudsonRock),
                Box::new(HaveIBeenPwned),
                Box::new(Dehashed),
                Box::new(Whois),
                Box::new(Dns::system()),
            ],
        }
    }

    /// Closing advice printed after all sections.
    pub fn recommendations(self) -> &'static [&'static str] {
        match self {
            ReportKind::OsintProfile => &[
                "Immediately change all passwords for compromised accounts",
                "Enable two-factor authentication on all critical accounts",
                "Scan all devices for malware and info-stealers",
                "Monitor financial accounts for suspicious activity",
                "Use a password manager to generate strong, unique passwords",
                "Consider identity theft protection services",
                "Check for additional exposure at: https://haveibeenpwned.com/",
            ],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Summary(Summary),
    Unavailable(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub source: String,
    pub title: String,
    pub body: SectionBody,
}

impl Section {
    pub fn is_available(&self) -> bool {
        matches!(self.body, SectionBody::Summary(_))
    }
}

/// One invocation's report. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedReport {
    kind: ReportKind,
    target: Target,
    generated_at: DateTime<Local>,
    sections: Vec<Section>,
}

impl AggregatedReport {
    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn generated_at(&self) -> DateTime<Local> {
        self.generated_at
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn failed_sections(&self) -> usize {
        self.sections.iter().filter(|s| !s.is_available()).count()
    }
}

/// Outcome of one connector with the naming needed to file it in a report.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutcome {
    pub source: String,
    pub title: String,
    pub result: ConnectorResult,
}

/// Merge outcomes into a report: one section per outcome, in order.
pub fn aggregate(
    kind: ReportKind,
    target: Target,
    generated_at: DateTime<Local>,
    outcomes: Vec<SourceOutcome>,
) -> AggregatedReport {
    let sections = outcomes
        .into_iter()
        .map(|o| Section {
            source: o.source,
            title: o.title,
            body: match o.result {
                ConnectorResult::Success(payload) => SectionBody::Summary(payload.summarize()),
                ConnectorResult::Failure(f) => SectionBody::Unavailable(f),
            },
        })
        .collect();
    AggregatedReport {
        kind,
        target,
        generated_at,
        sections,
    }
}

/// Query every connector in `connectors` sequentially for `target`.
pub fn collect(
    session: &Session,
    connectors: &[Box<dyn Connector>],
    target: &Target,
) -> Vec<SourceOutcome> {
    connectors
        .iter()
        .map(|c| {
            info!("querying {} for {}", c.name(), target.label());
            let result = c.query(session, target);
            if let ConnectorResult::Failure(f) = &result {
                warn!("{}", f);
            }
            SourceOutcome {
                source: c.name().to_string(),
                title: c.title().to_string(),
                result,
            }
        })
        .collect()
}

pub fn run_report(
    session: &Session,
    kind: ReportKind,
    target: &Target,
    generated_at: DateTime<Local>,
) -> AggregatedReport {
    let outcomes = collect(session, &kind.connectors(), target);
    aggregate(kind, target.clone(), generated_at, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{
        DnsBackend, EmailBreaches, FailureKind, LookupError, Payload, RecordKind, Tone,
    };
    use crate::session::{Endpoints, SessionConfig};
    use chrono::TimeZone;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()
    }

    fn ok(source: &str) -> SourceOutcome {
        SourceOutcome {
            source: source.to_string(),
            title: source.to_uppercase(),
            result: ConnectorResult::Success(Payload::EmailBreaches(EmailBreaches {
                breaches: vec!["SiteA".into()],
            })),
        }
    }

    fn failed(source: &str, kind: FailureKind) -> SourceOutcome {
        SourceOutcome {
            source: source.to_string(),
            title: source.to_uppercase(),
            result: ConnectorResult::Failure(Failure::new(source, kind)),
        }
    }

    #[test]
    fn one_section_per_outcome_for_any_mix() {
        let kinds = [
            FailureKind::Timeout,
            FailureKind::RateLimited,
            FailureKind::AuthRequired("key".into()),
            FailureKind::UnexpectedStatus(500),
        ];
        // Every success/failure combination over four sources.
        for mask in 0u8..16 {
            let outcomes: Vec<_> = (0..4)
                .map(|i| {
                    let name = format!("s{i}");
                    if mask & (1 << i) != 0 {
                        ok(&name)
                    } else {
                        failed(&name, kinds[i].clone())
                    }
                })
                .collect();
            let report = aggregate(
                ReportKind::DomainIntel,
                Target::Catalog,
                at(),
                outcomes,
            );
            assert_eq!(report.sections().len(), 4);
            assert_eq!(report.failed_sections(), 4 - mask.count_ones() as usize);
            let order: Vec<_> = report.sections().iter().map(|s| s.source.as_str()).collect();
            assert_eq!(order, vec!["s0", "s1", "s2", "s3"]);
        }
    }

    #[test]
    fn all_failing_still_produces_report() {
        let report = aggregate(
            ReportKind::OsintProfile,
            Target::email("user@example.com").unwrap(),
            at(),
            vec![
                failed("a", FailureKind::Timeout),
                failed("b", FailureKind::Connection("refused".into())),
            ],
        );
        assert_eq!(report.sections().len(), 2);
        assert_eq!(report.failed_sections(), 2);
    }

    #[test]
    fn connector_lists_follow_priority_order() {
        let names = |k: ReportKind| -> Vec<&'static str> {
            k.connectors().iter().map(|c| c.name()).collect()
        };
        assert_eq!(
            names(ReportKind::DomainIntel),
            vec!["xposedornot-domain", "xposedornot-catalog", "whois", "dns"]
        );
        assert_eq!(
            names(ReportKind::OsintProfile),
            vec!["hudson-rock", "haveibeenpwned", "dehashed", "whois", "dns"]
        );
        for k in ReportKind::ALL {
            assert!(!k.connectors().is_empty());
        }
    }

    struct StaticDns;

    impl DnsBackend for StaticDns {
        fn lookup(&self, _domain: &str, kind: RecordKind) -> Result<Vec<String>, LookupError> {
            match kind {
                RecordKind::A => Ok(vec!["192.0.2.10".to_string()]),
                _ => Err(LookupError::NoRecords),
            }
        }
    }

    #[test]
    fn domain_breach_timeout_leaves_other_sections_populated() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/xon/v1/domain-breaches");
            then.status(200)
                .json_body(json!({"metrics": {"Breaches_Details": []}}))
                .delay(Duration::from_millis(1500));
        });
        server.mock(|when, then| {
            when.method(GET).path("/xon/v1/breaches");
            then.status(200).json_body(json!({"exposedBreaches": [
                {"breachID": "Acme", "domain": "example.com", "breachedDate": "2020-01-01T00:00:00Z"}
            ]}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/rdap/domain/example.com");
            then.status(200).json_body(json!({"events": []}));
        });
        let session = Session::new(SessionConfig {
            endpoints: Endpoints::all_at(&server.base_url()),
            timeout_override: Some(Duration::from_millis(300)),
            ..SessionConfig::default()
        })
        .unwrap();
        let connectors: Vec<Box<dyn Connector>> = vec![
            Box::new(XonDomainBreaches),
            Box::new(XonBreachCatalog),
            Box::new(Whois),
            Box::new(Dns::with_backend(Box::new(StaticDns))),
        ];
        let target = Target::domain("example.com").unwrap();
        let outcomes = collect(&session, &connectors, &target);
        let report = aggregate(ReportKind::DomainIntel, target, at(), outcomes);

        assert_eq!(report.sections().len(), 4);
        let first = &report.sections()[0];
        assert_eq!(first.source, "xposedornot-domain");
        match &first.body {
            SectionBody::Unavailable(f) => assert!(f.kind.is_transport()),
            other => panic!("expected transport failure, got {other:?}"),
        }
        for s in &report.sections()[1..] {
            assert!(s.is_available(), "{} should be populated", s.source);
        }
        let SectionBody::Summary(catalog) = &report.sections()[1].body else {
            unreachable!()
        };
        assert_eq!(catalog.row_count(), 1);
    }

    #[test]
    fn summaries_come_from_each_payload() {
        let report = aggregate(
            ReportKind::EmailBreaches,
            Target::email("user@example.com").unwrap(),
            at(),
            vec![ok("xposedornot-email")],
        );
        let SectionBody::Summary(s) = &report.sections()[0].body else {
            panic!("expected summary");
        };
        assert_eq!(s.tone, Tone::Alert);
        assert_eq!(s.row_count(), 1);
    }

    #[test]
    fn osint_recommendations_end_with_hibp_pointer() {
        let recs = ReportKind::OsintProfile.recommendations();
        assert_eq!(recs.len(), 7);
        assert!(recs[6].contains("https://haveibeenpwned.com/"));
        assert!(ReportKind::EmailBreaches.recommendations().is_empty());
    }
}
