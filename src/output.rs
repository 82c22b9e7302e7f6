//! CLI output formatting.
//!
//! Rendered HTML goes to stdout (or a file) untouched; everything in this
//! module is the human-readable summary printed alongside it. Summaries are
//! written to stderr when the page itself occupies stdout.
//!
//! # Output Format
//!
//! ## Render
//!
//! ```text
//! Language: fr (2 options in selector)
//! site name           1
//! news list           5 items
//! about               1
//! language selector   2 items
//! ```
//!
//! ## Build
//!
//! ```text
//! en: 3 pages
//! fr: 3 pages
//! default (en): 3 pages at the output root
//! Generated 9 pages from 3 templates → dist
//! ```
//!
//! ## Check
//!
//! ```text
//! Grace Chapel (default language: en)
//!     en: 7 news, 2 sermons
//!     fr: missing (404), falls back to en
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that does the I/O. Format functions
//! do no I/O.

use crate::bind::{BindReport, Region};
use crate::generate::GenerateSummary;
use crate::loader::{LangStatus, SiteCheck};
use crate::render::{Initialized, RenderOutcome};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn is_list(region: Region) -> bool {
    matches!(
        region,
        Region::NewsList | Region::Sermons | Region::NewsCollection | Region::LangSelect
    )
}

/// One line per bound region: name, then item count (lists) or element
/// count (everything else).
pub fn format_bind_report(report: &BindReport) -> Vec<String> {
    report
        .bound
        .iter()
        .map(|b| {
            if is_list(b.region) {
                let noun = if b.items == 1 { "item" } else { "items" };
                format!("{:<20}{} {}", b.region.name(), b.items, noun)
            } else {
                format!("{:<20}{}", b.region.name(), b.items)
            }
        })
        .collect()
}

pub fn format_outcome(outcome: &RenderOutcome) -> Vec<String> {
    match outcome {
        RenderOutcome::Applied(report) if report.bound.is_empty() => {
            vec!["No regions found in page".to_string()]
        }
        RenderOutcome::Applied(report) => format_bind_report(report),
        RenderOutcome::Stale { generation, latest } => vec![format!(
            "Render pass {generation} discarded (superseded by pass {latest})"
        )],
    }
}

pub fn format_initialized(init: &Initialized) -> Vec<String> {
    let mut lines = vec![if init.lang_options > 0 {
        format!(
            "Language: {} ({} options in selector)",
            init.lang, init.lang_options
        )
    } else {
        format!("Language: {}", init.lang)
    }];
    lines.extend(format_outcome(&init.outcome));
    lines
}

pub fn format_generate_summary(summary: &GenerateSummary, output_dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for lang in &summary.langs {
        let prefix = Path::new(lang);
        let count = summary
            .pages
            .iter()
            .filter(|p| p.path.starts_with(prefix))
            .count();
        lines.push(format!("{lang}: {count} pages"));
    }
    let root_count = summary
        .pages
        .iter()
        .filter(|p| !summary.langs.iter().any(|l| p.path.starts_with(l)))
        .count();
    lines.push(format!(
        "default ({}): {} pages at the output root",
        summary.default_lang, root_count
    ));
    lines.push(format!(
        "Generated {} pages from {} templates → {}",
        summary.pages.len(),
        summary.templates,
        output_dir.display()
    ));
    lines
}

pub fn format_check(check: &SiteCheck) -> Vec<String> {
    let default = check.config.default_lang();
    let mut lines = vec![format!(
        "{} (default language: {})",
        check.config.site_name, default
    )];
    for (lang, status) in &check.langs {
        let detail = match status {
            LangStatus::Available { news, sermons } => {
                format!("{news} news, {sermons} sermons")
            }
            LangStatus::Missing { status } if lang == default => {
                format!("missing ({status}), no fallback available")
            }
            LangStatus::Missing { status } => {
                format!("missing ({status}), falls back to {default}")
            }
            LangStatus::Malformed { reason } => format!("malformed: {reason}"),
        };
        lines.push(format!("{}{}: {}", indent(1), lang, detail));
    }
    lines
}

pub fn print_initialized(init: &Initialized) {
    for line in format_initialized(init) {
        eprintln!("{}", line);
    }
}

pub fn print_outcome(outcome: &RenderOutcome) {
    for line in format_outcome(outcome) {
        eprintln!("{}", line);
    }
}

pub fn print_generate_summary(summary: &GenerateSummary, output_dir: &Path) {
    for line in format_generate_summary(summary, output_dir) {
        println!("{}", line);
    }
}

pub fn print_check(check: &SiteCheck) {
    for line in format_check(check) {
        println!("{}", line);
    }
}
