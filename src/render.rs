//! Report rendering.
//!
//! `render_text` produces the colorless form that is persisted verbatim; it is
//! a pure function of the report, so rendering twice yields identical bytes.
//! `render_terminal` produces the colored on-screen form with box tables.
use colored::*;
use comfy_table::{ContentArrangement, Table as CTable, presets};

use crate::aggregate::{AggregatedReport, SectionBody};
use crate::connectors::{Block, Summary, Table, Tone};
use crate::target::sanitize_for_filename;

/// Timestamp format embedded in report filenames (second granularity).
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn underlined(title: &str, rule: &str) -> String {
    format!("{}\n{}\n", title, rule.repeat(visible_len(title)))
}

fn build_table(t: &Table, preset: &str, arrangement: ContentArrangement) -> CTable {
    let mut table = CTable::new();
    table.load_preset(preset);
    table.set_content_arrangement(arrangement);
    table.set_header(t.headers.clone());
    for row in &t.rows {
        table.add_row(row.clone());
    }
    table
}

fn push_blocks(out: &mut String, summary: &Summary, terminal: bool) {
    for block in &summary.blocks {
        match block {
            Block::Line(l) => {
                out.push_str(l);
                out.push('\n');
            }
            Block::Table(t) => {
                let table = if terminal {
                    build_table(
                        t,
                        presets::UTF8_FULL_CONDENSED,
                        ContentArrangement::Dynamic,
                    )
                } else {
                    build_table(
                        t,
                        presets::ASCII_FULL_CONDENSED,
                        ContentArrangement::Disabled,
                    )
                };
                out.push_str(&table.to_string());
                out.push('\n');
            }
        }
    }
}

pub fn render_text(report: &AggregatedReport) -> String {
    let mut out = String::new();
    out.push_str(&underlined(report.kind().title(), "="));
    out.push_str(&format!("Target: {}\n", report.target().label()));
    out.push_str(&format!(
        "Generated: {}\n",
        report.generated_at().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!(
        "Sections: {} ({} unavailable)\n",
        report.sections().len(),
        report.failed_sections()
    ));

    for section in report.sections() {
        out.push('\n');
        out.push_str(&underlined(&section.title.to_uppercase(), "-"));
        match &section.body {
            SectionBody::Summary(s) => {
                out.push_str(&s.headline);
                out.push('\n');
                push_blocks(&mut out, s, false);
            }
            SectionBody::Unavailable(f) => {
                out.push_str(&format!("Not available: {}\n", f.kind));
                out.push_str(&format!("Failure class: {}\n", f.kind.category()));
            }
        }
    }

    let recommendations = report.kind().recommendations();
    if !recommendations.is_empty() {
        out.push('\n');
        out.push_str(&underlined("SECURITY RECOMMENDATIONS", "-"));
        for (i, r) in recommendations.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, r));
        }
    }
    out
}

fn toned(headline: &str, tone: Tone) -> String {
    match tone {
        Tone::Clean => headline.bold().green().to_string(),
        Tone::Warning => headline.bold().yellow().to_string(),
        Tone::Alert => headline.bold().red().to_string(),
        Tone::Info => headline.bold().cyan().to_string(),
    }
}

pub fn render_terminal(report: &AggregatedReport) -> String {
    let mut out = String::new();
    out.push_str(&underlined(
        &report.kind().title().bold().cyan().to_string(),
        "═",
    ));
    out.push_str(&format!(
        "{} {}\n",
        "Target:".bold(),
        report.target().label().bold().white()
    ));
    out.push_str(&format!(
        "{} {}\n",
        "Generated:".bold(),
        report.generated_at().format("%Y-%m-%d %H:%M:%S")
    ));

    for section in report.sections() {
        out.push('\n');
        out.push_str(&underlined(
            &section.title.to_uppercase().bold().yellow().to_string(),
            "─",
        ));
        match &section.body {
            SectionBody::Summary(s) => {
                out.push_str(&toned(&s.headline, s.tone));
                out.push('\n');
                push_blocks(&mut out, s, true);
            }
            SectionBody::Unavailable(f) => {
                out.push_str(&format!(
                    "{} {}\n",
                    "Not available:".red().bold(),
                    f.kind.to_string().red()
                ));
                out.push_str(&format!("{}\n", f.kind.category().dimmed()));
            }
        }
    }

    let recommendations = report.kind().recommendations();
    if !recommendations.is_empty() {
        out.push('\n');
        out.push_str(&underlined(
            &"SECURITY RECOMMENDATIONS".bold().magenta().to_string(),
            "─",
        ));
        for (i, r) in recommendations.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, r));
        }
    }
    out
}

/// `<sanitized-target>_<YYYYmmdd_HHMMSS>.txt`
pub fn report_file_name(report: &AggregatedReport) -> String {
    format!(
        "{}_{}.txt",
        sanitize_for_filename(&report.target().label()),
        report.generated_at().format(FILE_TIMESTAMP_FORMAT)
    )
}
