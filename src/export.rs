//! Report persistence.
//!
//! `save_report` writes the colorless rendering of a report to
//! `<dir>/<sanitized-target>_<YYYYmmdd_HHMMSS>.txt`. Files are created with
//! `create_new`, so an existing report is never overwritten: a second report
//! for the same target within the same second gets a `-2`, `-3`, ... suffix.
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, info};

use crate::aggregate::AggregatedReport;
use crate::render::{render_text, report_file_name};

const MAX_SUFFIX: u32 = 1000;

fn candidate(dir: &Path, file_name: &str, attempt: u32) -> PathBuf {
    if attempt <= 1 {
        return dir.join(file_name);
    }
    let stem = file_name.strip_suffix(".txt").unwrap_or(file_name);
    dir.join(format!("{}-{}.txt", stem, attempt))
}

pub fn save_report(dir: &Path, report: &AggregatedReport) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create reports directory {}", dir.display()))?;
    let text = render_text(report);
    let file_name = report_file_name(report);

    for attempt in 1..=MAX_SUFFIX {
        let path = candidate(dir, &file_name, attempt);
        let mut f = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next suffix", path.display());
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("create {}", path.display()));
            }
        };
        f.write_all(text.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        f.flush()
            .with_context(|| format!("flush {}", path.display()))?;
        info!("report saved to {}", path.display());
        return Ok(path);
    }
    bail!(
        "no free report filename for {} in {}",
        file_name,
        dir.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{ReportKind, aggregate};
    use crate::target::Target;
    use chrono::{Local, TimeZone};
    use tempfile::tempdir;

    fn report() -> AggregatedReport {
        aggregate(
            ReportKind::BreachCatalog,
            Target::Catalog,
            Local.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
            vec![],
        )
    }

    #[test]
    fn writes_rendered_text_verbatim() {
        let dir = tempdir().unwrap();
        let r = report();
        let path = save_report(dir.path(), &r).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "breach_catalog_20261019_093000.txt"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), render_text(&r));
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("reports").join("nested");
        let path = save_report(&nested, &report()).unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }

    #[test]
    fn same_second_collision_gets_suffix_and_keeps_first() {
        let dir = tempdir().unwrap();
        let r = report();
        let first = save_report(dir.path(), &r).unwrap();
        fs::write(&first, "earlier report").unwrap();
        let second = save_report(dir.path(), &r).unwrap();
        let third = save_report(dir.path(), &r).unwrap();
        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("_093000-2.txt"));
        assert!(third.to_string_lossy().ends_with("_093000-3.txt"));
        assert_eq!(fs::read_to_string(&first).unwrap(), "earlier report");
    }

    #[test]
    fn fails_when_directory_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("reports");
        fs::write(&blocker, "not a directory").unwrap();
        let err = save_report(&blocker, &report()).unwrap_err();
        assert!(format!("{:#}", err).contains("reports"));
    }
}
