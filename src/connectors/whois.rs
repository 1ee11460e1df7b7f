//! Domain registration lookup. Queries the RDAP service (the JSON successor
//! of port-43 WHOIS) and reduces the answer to registrar, lifecycle dates,
//! name servers and contact emails.
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::{Connector, Failure, Payload, Summary, Tone, encode_path_segment};
use crate::session::Session;
use crate::target::Target;

#[derive(Debug, Deserialize)]
struct EventRaw {
    #[serde(rename = "eventAction")]
    action: Option<String>,
    #[serde(rename = "eventDate")]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntityRaw {
    #[serde(default)]
    roles: Vec<String>,
    #[serde(rename = "vcardArray")]
    vcard: Option<Value>,
    #[serde(default)]
    entities: Vec<EntityRaw>,
}

#[derive(Debug, Deserialize)]
struct NameServerRaw {
    #[serde(rename = "ldhName")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DomainRaw {
    #[serde(default)]
    events: Vec<EventRaw>,
    #[serde(default)]
    entities: Vec<EntityRaw>,
    #[serde(default)]
    nameservers: Vec<NameServerRaw>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisRecord {
    pub domain: String,
    /// False when the registry does not know the domain.
    pub registered: bool,
    pub registrar: String,
    pub creation_date: String,
    pub expiration_date: String,
    pub name_servers: Vec<String>,
    pub emails: Vec<String>,
}

impl WhoisRecord {
    fn unregistered(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            registered: false,
            registrar: "Unknown".to_string(),
            creation_date: "Unknown".to_string(),
            expiration_date: "Unknown".to_string(),
            name_servers: Vec::new(),
            emails: Vec::new(),
        }
    }

    fn from_response(domain: &str, raw: DomainRaw) -> Self {
        let event = |action: &str| {
            raw.events
                .iter()
                .find(|e| e.action.as_deref() == Some(action))
                .and_then(|e| e.date.clone())
                .unwrap_or_else(|| "Unknown".to_string())
        };
        let registrar = raw
            .entities
            .iter()
            .find(|e| e.roles.iter().any(|r| r == "registrar"))
            .and_then(|e| vcard_property(e.vcard.as_ref(), "fn").into_iter().next())
            .unwrap_or_else(|| "Unknown".to_string());
        let mut emails = Vec::new();
        collect_emails(&raw.entities, &mut emails);
        emails.sort();
        emails.dedup();
        let name_servers = raw
            .nameservers
            .iter()
            .filter_map(|n| n.name.as_ref())
            .map(|n| n.to_ascii_lowercase())
            .collect();
        Self {
            domain: domain.to_string(),
            registered: true,
            registrar,
            creation_date: event("registration"),
            expiration_date: event("expiration"),
            name_servers,
            emails,
        }
    }

    pub fn summarize(&self) -> Summary {
        if !self.registered {
            let mut s = Summary::new(Tone::Info, "Domain not found in registry");
            s.line(format!("Domain: {}", self.domain));
            return s;
        }
        let mut s = Summary::new(Tone::Info, format!("Domain: {}", self.domain));
        s.line(format!("Registrar: {}", self.registrar));
        s.line(format!("Creation Date: {}", self.creation_date));
        s.line(format!("Expiration Date: {}", self.expiration_date));
        if !self.name_servers.is_empty() {
            s.line(format!("Name Servers: {}", self.name_servers.join(", ")));
        }
        if !self.emails.is_empty() {
            s.line(format!("Contact Emails: {}", self.emails.join(", ")));
        }
        s
    }
}

/// Text values of a jCard property, e.g. `fn` or `email`.
fn vcard_property(vcard: Option<&Value>, name: &str) -> Vec<String> {
    let Some(props) = vcard.and_then(|v| v.get(1)).and_then(Value::as_array) else {
        return Vec::new();
    };
    props
        .iter()
        .filter_map(Value::as_array)
        .filter(|p| p.first().and_then(Value::as_str) == Some(name))
        .filter_map(|p| p.get(3).and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

fn collect_emails(entities: &[EntityRaw], out: &mut Vec<String>) {
    for e in entities {
        out.extend(vcard_property(e.vcard.as_ref(), "email"));
        collect_emails(&e.entities, out);
    }
}

pub struct Whois;

impl Connector for Whois {
    fn name(&self) -> &'static str {
        "whois"
    }

    fn title(&self) -> &'static str {
        "WHOIS Registration"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn fetch(&self, session: &Session, target: &Target) -> Result<Payload, Failure> {
        let domain = target
            .lookup_domain()
            .ok_or_else(|| Failure::unsupported(self.name(), target))?;
        let url = format!(
            "{}/domain/{}",
            session.endpoints().rdap,
            encode_path_segment(domain)
        );
        let req = session.get(&url).header("Accept", "application/rdap+json");
        let resp: Option<DomainRaw> =
            session.fetch_json(self.name(), req, session.timeout_for(self.default_timeout()))?;
        let record = match resp {
            Some(raw) => WhoisRecord::from_response(domain, raw),
            None => WhoisRecord::unregistered(domain),
        };
        Ok(Payload::Whois(record))
    }
}
