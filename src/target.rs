//! Target identity model: the email address, domain or password digest a
//! report is about.
//!
//! Inputs are validated against basic syntactic patterns before any connector
//! runs. Passwords are hashed on construction so the plaintext never reaches a
//! report, a log line or a filename.
use once_cell::sync::Lazy;
use regex::Regex;
use sha3::{Digest, Sha3_512};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern")
});

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$")
        .expect("domain pattern")
});

/// Length of the hash prefix sent to the password-exposure service.
pub const PASSWORD_PREFIX_LEN: usize = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("no input provided")]
    Empty,
    #[error("invalid email format: {0}")]
    InvalidEmail(String),
    #[error("invalid domain format: {0}")]
    InvalidDomain(String),
}

/// SHA3-512 digest of a password, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    hex: String,
}

impl PasswordDigest {
    pub fn of(password: &str) -> Self {
        let digest = Sha3_512::digest(password.as_bytes());
        Self {
            hex: hex::encode(digest),
        }
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// The k-anonymity prefix queried remotely.
    pub fn prefix(&self) -> &str {
        &self.hex[..PASSWORD_PREFIX_LEN]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Email(String),
    Domain(String),
    Password(PasswordDigest),
    /// The full breach catalog, not tied to any identity.
    Catalog,
}

impl Target {
    pub fn email(input: &str) -> Result<Self, TargetError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(TargetError::Empty);
        }
        if !EMAIL_RE.is_match(s) {
            return Err(TargetError::InvalidEmail(s.to_string()));
        }
        Ok(Target::Email(s.to_string()))
    }

    pub fn domain(input: &str) -> Result<Self, TargetError> {
        let s = input.trim().trim_end_matches('.');
        if s.is_empty() {
            return Err(TargetError::Empty);
        }
        if !DOMAIN_RE.is_match(s) {
            return Err(TargetError::InvalidDomain(s.to_string()));
        }
        Ok(Target::Domain(s.to_ascii_lowercase()))
    }

    /// Hash the password immediately, after trimming surrounding whitespace.
    pub fn password(input: &str) -> Result<Self, TargetError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(TargetError::Empty);
        }
        Ok(Target::Password(PasswordDigest::of(s)))
    }

    /// Human-readable identity printed in report headers.
    pub fn label(&self) -> String {
        match self {
            Target::Email(e) => e.clone(),
            Target::Domain(d) => d.clone(),
            Target::Password(p) => format!("password {}", p.prefix()),
            Target::Catalog => "breach catalog".to_string(),
        }
    }

    /// Domain a WHOIS/DNS connector should look at, if any.
    pub fn lookup_domain(&self) -> Option<&str> {
        match self {
            Target::Email(e) => e.rsplit_once('@').map(|(_, d)| d),
            Target::Domain(d) => Some(d.as_str()),
            _ => None,
        }
    }

    pub fn as_email(&self) -> Option<&str> {
        match self {
            Target::Email(e) => Some(e.as_str()),
            _ => None,
        }
    }
}

/// Make a label safe to embed in a filename.
pub fn sanitize_for_filename(label: &str) -> String {
    let mut out = String::with_capacity(label.len() + 8);
    for ch in label.chars() {
        match ch {
            '@' => out.push_str("_at_"),
            '.' => out.push_str("_dot_"),
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => out.push(c),
            _ => out.push('_'),
        }
    }
    out
}
