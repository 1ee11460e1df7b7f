//! XposedOrNot connectors: email breach check, breach analytics, anonymous
//! password exposure, domain breaches and the public breach catalog.
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{
    Connector, Failure, Payload, Summary, Table, Tone, count_value, display_count,
    encode_path_segment,
};
use crate::session::Session;
use crate::target::Target;

/// Rows shown in the domain breach table.
pub const DOMAIN_BREACH_DISPLAY_LIMIT: usize = 25;
/// Rows shown in the breach catalog table.
pub const CATALOG_DISPLAY_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// Email breach check
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NameOrGroup {
    Name(String),
    Group(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct CheckEmailResponse {
    #[serde(default)]
    breaches: Vec<NameOrGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmailBreaches {
    pub breaches: Vec<String>,
}

impl EmailBreaches {
    fn from_response(resp: CheckEmailResponse) -> Self {
        let mut breaches = Vec::new();
        for item in resp.breaches {
            match item {
                NameOrGroup::Name(n) => breaches.push(n),
                NameOrGroup::Group(g) => breaches.extend(g),
            }
        }
        breaches.retain(|b| !b.trim().is_empty());
        Self { breaches }
    }

    pub fn summarize(&self) -> Summary {
        if self.breaches.is_empty() {
            let mut s = Summary::new(Tone::Clean, "Security status: CLEAN");
            s.line("No breaches found for this email address.");
            return s;
        }
        let mut s = Summary::new(
            Tone::Alert,
            format!(
                "Security alert: email found in {} breach(es)",
                self.breaches.len()
            ),
        );
        let mut t = Table::new(["#", "Breach Name", "Status"]);
        for (i, b) in self.breaches.iter().enumerate() {
            t.push_row([(i + 1).to_string(), b.clone(), "BREACHED".to_string()]);
        }
        s.table(t);
        s.line("Recommendation: change passwords for these services immediately.");
        s
    }
}

pub struct XonEmailBreaches;

impl Connector for XonEmailBreaches {
    fn name(&self) -> &'static str {
        "xposedornot-email"
    }

    fn title(&self) -> &'static str {
        "Email Breach Scan"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure> {
        let email = target
            .as_email()
            .ok_or_else(|| Failure::unsupported(self.name(), target))?;
        let url = format!(
            "{}/check-email/{}",
            session.endpoints().xposedornot,
            encode_path_segment(email)
        );
        let resp: Option<CheckEmailResponse> = session.fetch_json(
            self.name(),
            session.get(&url),
            session.timeout_for(self.default_timeout()),
        )?;
        Ok(Payload::EmailBreaches(
            resp.map(EmailBreaches::from_response).unwrap_or_default(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Breach analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct RiskRaw {
    risk_label: Option<String>,
    risk_score: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
struct PasswordStrengthRaw {
    #[serde(rename = "PlainText")]
    plain_text: Option<Value>,
    #[serde(rename = "EasyToCrack")]
    easy_to_crack: Option<Value>,
    #[serde(rename = "StrongHash")]
    strong_hash: Option<Value>,
    #[serde(rename = "Unknown")]
    unknown: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
struct BreachMetricsRaw {
    #[serde(default)]
    risk: Vec<RiskRaw>,
    #[serde(default)]
    industry: Vec<Vec<(String, Value)>>,
    #[serde(default)]
    passwords_strength: Vec<PasswordStrengthRaw>,
}

#[derive(Debug, Deserialize)]
struct AnalyticsResponse {
    #[serde(rename = "BreachMetrics", default)]
    metrics: Option<BreachMetricsRaw>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasswordStrength {
    pub plain_text: u64,
    pub easy_to_crack: u64,
    pub strong_hash: u64,
    pub unknown: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreachAnalytics {
    /// False when the service holds no analytics for the address.
    pub found: bool,
    pub risk_label: String,
    pub risk_score: u64,
    /// Industries with a non-zero breach count.
    pub industries: Vec<(String, u64)>,
    pub password_strength: PasswordStrength,
}

impl Default for BreachAnalytics {
    fn default() -> Self {
        Self {
            found: false,
            risk_label: "Unknown".to_string(),
            risk_score: 0,
            industries: Vec::new(),
            password_strength: PasswordStrength::default(),
        }
    }
}

fn count_or_zero(v: &Option<Value>) -> u64 {
    v.as_ref().and_then(count_value).unwrap_or(0)
}

/// Visual bar for an industry count: one block per five breaches, at most 20.
pub fn industry_bar(count: u64) -> String {
    "█".repeat(((count / 5) as usize).min(20))
}

impl BreachAnalytics {
    fn from_response(resp: AnalyticsResponse) -> Self {
        let Some(m) = resp.metrics else {
            return Self::default();
        };
        let risk = m.risk.into_iter().next().unwrap_or_default();
        let industries = m
            .industry
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, c)| {
                let c = count_value(&c).unwrap_or(0);
                (c > 0).then_some((name, c))
            })
            .collect();
        let ps = m.passwords_strength.into_iter().next().unwrap_or_default();
        Self {
            found: true,
            risk_label: risk.risk_label.unwrap_or_else(|| "Unknown".to_string()),
            risk_score: count_or_zero(&risk.risk_score),
            industries,
            password_strength: PasswordStrength {
                plain_text: count_or_zero(&ps.plain_text),
                easy_to_crack: count_or_zero(&ps.easy_to_crack),
                strong_hash: count_or_zero(&ps.strong_hash),
                unknown: count_or_zero(&ps.unknown),
            },
        }
    }

    pub fn summarize(&self) -> Summary {
        if !self.found {
            let mut s = Summary::new(Tone::Info, "No analytics available");
            s.line("The service holds no breach analytics for this email address.");
            return s;
        }
        let tone = match self.risk_label.to_ascii_lowercase().as_str() {
            "low" => Tone::Clean,
            "medium" => Tone::Warning,
            _ => Tone::Alert,
        };
        let mut s = Summary::new(
            tone,
            format!("Risk level: {} ({}/100)", self.risk_label, self.risk_score),
        );
        let mut industry = Table::new(["Industry", "Count", "Visual"]);
        for (name, count) in &self.industries {
            industry.push_row([name.to_uppercase(), count.to_string(), industry_bar(*count)]);
        }
        s.table(industry);
        let ps = &self.password_strength;
        let mut strength = Table::new(["Type", "Count"]);
        strength.push_row(["Plain Text".to_string(), ps.plain_text.to_string()]);
        strength.push_row(["Easy Crack".to_string(), ps.easy_to_crack.to_string()]);
        strength.push_row(["Strong Hash".to_string(), ps.strong_hash.to_string()]);
        strength.push_row(["Unknown".to_string(), ps.unknown.to_string()]);
        s.table(strength);
        s
    }
}

pub struct XonBreachAnalytics;

impl Connector for XonBreachAnalytics {
    fn name(&self) -> &'static str {
        "xposedornot-analytics"
    }

    fn title(&self) -> &'static str {
        "Breach Analytics"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure> {
        let email = target
            .as_email()
            .ok_or_else(|| Failure::unsupported(self.name(), target))?;
        let url = format!("{}/breach-analytics", session.endpoints().xposedornot);
        let resp: Option<AnalyticsResponse> = session.fetch_json(
            self.name(),
            session.get(&url).query(&[("email", email)]),
            session.timeout_for(self.default_timeout()),
        )?;
        Ok(Payload::BreachAnalytics(
            resp.map(BreachAnalytics::from_response).unwrap_or_default(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Anonymous password exposure
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct SearchPassAnon {
    count: Option<Value>,
    #[serde(rename = "char")]
    composition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PasswordResponse {
    #[serde(rename = "SearchPassAnon", default)]
    search: Option<SearchPassAnon>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordExposure {
    pub prefix: String,
    pub count: u64,
    /// (component, value) pairs such as ("Digits", "3").
    pub composition: Vec<(String, String)>,
}

/// Parse a composition string like `D:3;A:8;S:0;L:11`.
pub fn parse_composition(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|part| part.split_once(':'))
        .map(|(k, v)| {
            let name = match k.trim() {
                "D" => "Digits",
                "A" => "Letters",
                "S" => "Special",
                "L" => "Length",
                other => other,
            };
            (name.to_string(), v.trim().to_string())
        })
        .collect()
}

impl PasswordExposure {
    fn unexposed(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            count: 0,
            composition: Vec::new(),
        }
    }

    pub fn summarize(&self) -> Summary {
        if self.count == 0 {
            let mut s = Summary::new(Tone::Clean, "Password status: SECURE");
            s.line(format!("Hash prefix: {}", self.prefix));
            s.line("Password not found in known breaches.");
            return s;
        }
        let mut s = Summary::new(
            Tone::Alert,
            format!(
                "Password compromised: exposed {} times in data breaches",
                self.count
            ),
        );
        s.line(format!("Hash prefix: {}", self.prefix));
        let mut t = Table::new(["Component", "Count"]);
        for (k, v) in &self.composition {
            t.push_row([k.clone(), v.clone()]);
        }
        s.table(t);
        s.line("Critical: change this password everywhere it is used.");
        s
    }
}

pub struct XonPasswordExposure;

impl Connector for XonPasswordExposure {
    fn name(&self) -> &'static str {
        "xposedornot-password"
    }

    fn title(&self) -> &'static str {
        "Password Exposure Scan"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure> {
        let Target::Password(digest) = target else {
            return Err(Failure::unsupported(self.name(), target));
        };
        let prefix = digest.prefix();
        let url = format!(
            "{}/pass/anon/{}",
            session.endpoints().xposedornot_passwords,
            prefix
        );
        let resp: Option<PasswordResponse> = session.fetch_json(
            self.name(),
            session.get(&url),
            session.timeout_for(self.default_timeout()),
        )?;
        let search = resp.and_then(|r| r.search);
        let exposure = match search {
            None => PasswordExposure::unexposed(prefix),
            Some(s) => PasswordExposure {
                prefix: prefix.to_string(),
                count: count_or_zero(&s.count),
                composition: s
                    .composition
                    .as_deref()
                    .map(parse_composition)
                    .unwrap_or_default(),
            },
        };
        Ok(Payload::PasswordExposure(exposure))
    }
}

// ---------------------------------------------------------------------------
// Domain breaches
// ---------------------------------------------------------------------------

/// One listed breach. Records are read loosely, key by key, since the service
/// is inconsistent about field names and value types.
type DomainBreachRaw = Map<String, Value>;

#[derive(Debug, Deserialize)]
struct DomainMetrics {
    #[serde(rename = "Breaches_Details")]
    details: Vec<DomainBreachRaw>,
}

/// Anything else (including error bodies served with 200) fails to parse and
/// surfaces as a malformed payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DomainBreachesResponse {
    Metrics { metrics: DomainMetrics },
    Listed { domain_breaches: Vec<DomainBreachRaw> },
    Bare(Vec<DomainBreachRaw>),
}

/// First of `keys` present with a non-null value.
fn first_field<'a>(record: &'a DomainBreachRaw, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find(|v| !v.is_null())
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainBreach {
    pub name: String,
    pub domain: String,
    pub records: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainBreaches {
    /// Domain the listing was narrowed to, if any.
    pub scope: Option<String>,
    pub breaches: Vec<DomainBreach>,
}

fn in_scope(record_domain: &str, scope: &str) -> bool {
    let d = record_domain.to_ascii_lowercase();
    d == scope || d.ends_with(&format!(".{scope}"))
}

impl DomainBreaches {
    fn from_response(resp: DomainBreachesResponse, scope: Option<&str>) -> Self {
        let raw = match resp {
            DomainBreachesResponse::Metrics { metrics } => metrics.details,
            DomainBreachesResponse::Listed { domain_breaches } => domain_breaches,
            DomainBreachesResponse::Bare(v) => v,
        };
        let breaches = raw
            .iter()
            .map(|r| DomainBreach {
                name: first_field(r, &["breach", "name"])
                    .map(scalar_text)
                    .unwrap_or_else(|| "Unknown".to_string()),
                domain: first_field(r, &["domain", "Domain"])
                    .map(scalar_text)
                    .unwrap_or_else(|| "N/A".to_string()),
                records: display_count(first_field(
                    r,
                    &["xposed_records", "records", "exposed_records"],
                )),
            })
            .filter(|b| scope.is_none_or(|s| in_scope(&b.domain, s)))
            .collect();
        Self {
            scope: scope.map(str::to_string),
            breaches,
        }
    }

    pub fn summarize(&self) -> Summary {
        if self.breaches.is_empty() {
            let mut s = Summary::new(Tone::Clean, "Domain status: CLEAN");
            s.line("No domain breaches found in the current database.");
            return s;
        }
        let mut s = Summary::new(
            Tone::Alert,
            format!("Total breaches found: {}", self.breaches.len()),
        );
        let mut t = Table::new(["#", "Breach Name", "Domain", "Records Exposed"]);
        for (i, b) in self
            .breaches
            .iter()
            .take(DOMAIN_BREACH_DISPLAY_LIMIT)
            .enumerate()
        {
            t.push_row([
                (i + 1).to_string(),
                b.name.clone(),
                b.domain.clone(),
                b.records.clone(),
            ]);
        }
        s.table(t);
        if self.breaches.len() > DOMAIN_BREACH_DISPLAY_LIMIT {
            s.line(format!(
                "Showing first {} of {} total breaches",
                DOMAIN_BREACH_DISPLAY_LIMIT,
                self.breaches.len()
            ));
        }
        s
    }
}

pub struct XonDomainBreaches;

impl Connector for XonDomainBreaches {
    fn name(&self) -> &'static str {
        "xposedornot-domain"
    }

    fn title(&self) -> &'static str {
        "Domain Breaches"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(15)
    }

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure> {
        let scope = match target {
            Target::Domain(d) => Some(d.as_str()),
            Target::Catalog => None,
            _ => return Err(Failure::unsupported(self.name(), target)),
        };
        let url = format!("{}/domain-breaches", session.endpoints().xposedornot);
        let mut req = session.post(&url).body("");
        if let Some(key) = &session.keys().xposedornot {
            req = req.header("x-api-key", key);
        }
        let resp: Option<DomainBreachesResponse> =
            session.fetch_json(self.name(), req, session.timeout_for(self.default_timeout()))?;
        let breaches = match resp {
            Some(r) => DomainBreaches::from_response(r, scope),
            None => DomainBreaches {
                scope: scope.map(str::to_string),
                breaches: Vec::new(),
            },
        };
        Ok(Payload::DomainBreaches(breaches))
    }
}

// ---------------------------------------------------------------------------
// Breach catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CatalogEntryRaw {
    #[serde(rename = "breachID", alias = "Breach ID")]
    id: Option<String>,
    #[serde(alias = "Domain")]
    domain: Option<String>,
    #[serde(rename = "breachedDate", alias = "Breached Date")]
    date: Option<String>,
    #[serde(rename = "exposedRecords", alias = "Exposed Records")]
    records: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(rename = "exposedBreaches", alias = "Exposed Breaches", default)]
    breaches: Option<Vec<CatalogEntryRaw>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub domain: String,
    /// Date part only (`YYYY-MM-DD`).
    pub date: String,
    pub records: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BreachCatalog {
    pub domain: Option<String>,
    pub entries: Vec<CatalogEntry>,
}

impl BreachCatalog {
    fn from_response(resp: CatalogResponse, domain: Option<&str>) -> Self {
        let entries = resp
            .breaches
            .unwrap_or_default()
            .into_iter()
            .map(|e| CatalogEntry {
                id: e.id.unwrap_or_else(|| "Unknown".to_string()),
                domain: e.domain.unwrap_or_else(|| "N/A".to_string()),
                date: e
                    .date
                    .as_deref()
                    .and_then(|d| d.split('T').next())
                    .unwrap_or_default()
                    .to_string(),
                records: display_count(e.records.as_ref()),
            })
            .collect();
        Self {
            domain: domain.map(str::to_string),
            entries,
        }
    }

    pub fn summarize(&self) -> Summary {
        if self.entries.is_empty() {
            let mut s = Summary::new(Tone::Clean, "No breaches listed");
            match &self.domain {
                Some(d) => s.line(format!("The catalog lists no breaches for {d}.")),
                None => s.line("The catalog returned no breaches."),
            };
            return s;
        }
        let shown = self.entries.len().min(CATALOG_DISPLAY_LIMIT);
        let mut s = Summary::new(
            Tone::Info,
            format!("First {} of {} breaches", shown, self.entries.len()),
        );
        let mut t = Table::new(["ID", "Domain", "Date", "Records"]);
        for e in self.entries.iter().take(CATALOG_DISPLAY_LIMIT) {
            t.push_row([
                e.id.clone(),
                e.domain.clone(),
                e.date.clone(),
                e.records.clone(),
            ]);
        }
        s.table(t);
        s
    }
}

pub struct XonBreachCatalog;

impl Connector for XonBreachCatalog {
    fn name(&self) -> &'static str {
        "xposedornot-catalog"
    }

    fn title(&self) -> &'static str {
        "Breach Catalog"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure> {
        let domain = match target {
            Target::Domain(d) => Some(d.as_str()),
            Target::Catalog => None,
            _ => return Err(Failure::unsupported(self.name(), target)),
        };
        let url = format!("{}/breaches", session.endpoints().xposedornot);
        let mut req = session.get(&url);
        if let Some(d) = domain {
            req = req.query(&[("domain", d)]);
        }
        let resp: Option<CatalogResponse> =
            session.fetch_json(self.name(), req, session.timeout_for(self.default_timeout()))?;
        let catalog = match resp {
            Some(r) => BreachCatalog::from_response(r, domain),
            None => BreachCatalog {
                domain: domain.map(str::to_string),
                entries: Vec::new(),
            },
        };
        Ok(Payload::BreachCatalog(catalog))
    }
}
