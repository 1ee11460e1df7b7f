//! Interactive menu loop.
//!
//! Reads selections and targets line by line, runs the selected report, shows
//! it and saves it. Input and output are generic so the loop can be driven from
//! tests as well as from the terminal.
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::*;
use log::{debug, error};

use crate::aggregate::{ReportKind, run_report};
use crate::export::save_report;
use crate::render::render_terminal;
use crate::session::Session;
use crate::target::{Target, TargetError};

enum Choice {
    Run(ReportKind),
    Exit,
    Invalid(String),
}

fn parse_choice(line: &str) -> Choice {
    match line.trim() {
        "1" => Choice::Run(ReportKind::EmailBreaches),
        "2" => Choice::Run(ReportKind::BreachAnalytics),
        "3" => Choice::Run(ReportKind::PasswordExposure),
        "4" => Choice::Run(ReportKind::DomainIntel),
        "5" => Choice::Run(ReportKind::BreachCatalog),
        "6" => Choice::Run(ReportKind::OsintProfile),
        "0" => Choice::Exit,
        other => Choice::Invalid(other.to_string()),
    }
}

fn menu_label(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::EmailBreaches => "Check email breaches",
        ReportKind::BreachAnalytics => "Breach analytics for email",
        ReportKind::PasswordExposure => "Check password exposure",
        ReportKind::DomainIntel => "Domain intelligence",
        ReportKind::BreachCatalog => "Browse breach catalog",
        ReportKind::OsintProfile => "Full OSINT profile",
    }
}

fn prompt_for(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::EmailBreaches | ReportKind::BreachAnalytics | ReportKind::OsintProfile => {
            "Enter email address: "
        }
        ReportKind::PasswordExposure => "Enter password to check: ",
        ReportKind::DomainIntel => "Enter domain: ",
        ReportKind::BreachCatalog => "Filter by domain (leave empty for all): ",
    }
}

fn parse_target(kind: ReportKind, line: &str) -> Result<Target, TargetError> {
    match kind {
        ReportKind::EmailBreaches | ReportKind::BreachAnalytics | ReportKind::OsintProfile => {
            Target::email(line)
        }
        ReportKind::PasswordExposure => Target::password(line),
        ReportKind::DomainIntel => Target::domain(line),
        ReportKind::BreachCatalog if line.trim().is_empty() => Ok(Target::Catalog),
        ReportKind::BreachCatalog => Target::domain(line),
    }
}

pub struct Console<'s> {
    session: &'s Session,
    reports_dir: PathBuf,
}

impl<'s> Console<'s> {
    pub fn new(session: &'s Session, reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            reports_dir: reports_dir.into(),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Run until the user selects exit or input ends.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut out: W) -> Result<()> {
        loop {
            self.print_menu(&mut out)?;
            let Some(line) = read_line(&mut input, &mut out, "Select an option: ")? else {
                break;
            };
            let kind = match parse_choice(&line) {
                Choice::Exit => break,
                Choice::Invalid(s) => {
                    writeln!(out, "{} {:?}", "Invalid option:".red().bold(), s)?;
                    continue;
                }
                Choice::Run(kind) => kind,
            };
            let Some(raw) = read_line(&mut input, &mut out, prompt_for(kind))? else {
                break;
            };
            let target = match parse_target(kind, &raw) {
                Ok(t) => t,
                Err(e) => {
                    writeln!(out, "{} {}", "Error:".red().bold(), e)?;
                    continue;
                }
            };
            self.run_one(kind, &target, &mut out)?;
        }
        writeln!(out, "{}", "Goodbye.".bold())?;
        Ok(())
    }

    fn run_one<W: Write>(&self, kind: ReportKind, target: &Target, out: &mut W) -> Result<()> {
        writeln!(
            out,
            "{} {}",
            "Running".bold(),
            format!("{} for {}...", kind.title(), target.label()).cyan()
        )?;
        let report = run_report(self.session, kind, target, chrono::Local::now());
        writeln!(out)?;
        write!(out, "{}", render_terminal(&report))?;
        writeln!(out)?;
        match save_report(&self.reports_dir, &report) {
            Ok(path) => {
                writeln!(out, "{} {}", "Report saved to".green(), path.display())?;
            }
            Err(e) => {
                error!("saving report failed: {:#}", e);
                writeln!(out, "{} {:#}", "Could not save report:".red().bold(), e)?;
            }
        }
        Ok(())
    }

    fn print_menu<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", "Select an option:".bold().cyan())?;
        for (i, kind) in ReportKind::ALL.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, menu_label(*kind))?;
        }
        writeln!(out, "  0. Exit")?;
        Ok(())
    }
}

/// Prompt and read one line. `None` on end of input.
fn read_line<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
) -> Result<Option<String>> {
    write!(out, "{}", prompt)?;
    out.flush()?;
    let mut buf = String::new();
    if input.read_line(&mut buf)? == 0 {
        debug!("input closed");
        writeln!(out)?;
        return Ok(None);
    }
    Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Endpoints, SessionConfig};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn drive(console: &Console<'_>, script: &str) -> String {
        let mut out = Vec::new();
        console.run(Cursor::new(script.as_bytes()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn offline_session() -> Session {
        // Nothing listens here; any network call would surface as a failure section.
        Session::new(SessionConfig {
            endpoints: Endpoints::all_at("http://127.0.0.1:9"),
            ..SessionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn exit_and_eof_both_end_the_loop() {
        let session = offline_session();
        let dir = tempdir().unwrap();
        let console = Console::new(&session, dir.path());
        assert!(drive(&console, "0\n").contains("Goodbye."));
        assert!(drive(&console, "").contains("Goodbye."));
    }

    #[test]
    fn invalid_option_reprompts() {
        let session = offline_session();
        let dir = tempdir().unwrap();
        let console = Console::new(&session, dir.path());
        let out = drive(&console, "9\n0\n");
        assert!(out.contains("Invalid option:"));
        assert!(out.contains("\"9\""));
        assert_eq!(out.matches("0. Exit").count(), 2);
    }

    #[test]
    fn invalid_email_returns_to_menu_without_report() {
        let session = offline_session();
        let dir = tempdir().unwrap();
        let console = Console::new(&session, dir.path());
        let out = drive(&console, "1\nnot-an-email\n0\n");
        assert!(out.contains("invalid email format: not-an-email"));
        assert!(!out.contains("Running"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn password_report_is_shown_and_saved() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_includes("/xon-pass/v1/pass/anon/");
            then.status(200)
                .json_body(json!({"SearchPassAnon": {"count": "0", "char": ""}}));
        });
        let session = Session::new(SessionConfig {
            endpoints: Endpoints::all_at(&server.base_url()),
            ..SessionConfig::default()
        })
        .unwrap();
        let dir = tempdir().unwrap();
        let console = Console::new(&session, dir.path());
        let out = drive(&console, "3\nhunter2\n0\n");
        assert!(out.contains("Password Exposure Report"));
        assert!(out.contains("Report saved to"));
        assert!(!out.contains("hunter2"));
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let saved = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        assert!(!saved.contains("hunter2"));
    }

    #[test]
    fn save_failure_is_not_fatal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_includes("/xon-pass/v1/pass/anon/");
            then.status(404);
        });
        let session = Session::new(SessionConfig {
            endpoints: Endpoints::all_at(&server.base_url()),
            ..SessionConfig::default()
        })
        .unwrap();
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("reports");
        std::fs::write(&blocker, "file in the way").unwrap();
        let console = Console::new(&session, &blocker);
        let out = drive(&console, "3\nhunter2\n0\n");
        assert!(out.contains("Could not save report"));
        assert!(out.contains("Goodbye."));
    }

    #[test]
    fn empty_catalog_filter_means_whole_catalog() {
        assert_eq!(
            parse_target(ReportKind::BreachCatalog, "  ").unwrap(),
            Target::Catalog
        );
        assert_eq!(
            parse_target(ReportKind::BreachCatalog, "Example.COM").unwrap(),
            Target::Domain("example.com".into())
        );
        assert!(parse_target(ReportKind::DomainIntel, "").is_err());
    }
}
