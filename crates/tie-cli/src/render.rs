//! Plain-text output formats.

use std::io::{self, Write};
use tie_core::{Entry, ReconcileReport, RemoveReport, RemoveStatus};

const NO_ENTRIES: &str = "No entries found.";

/// Two-column name/availability table.
pub fn table(out: &mut impl Write, entries: &[(String, Entry)]) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "{}", NO_ENTRIES);
    }

    let width = entries
        .iter()
        .map(|(alias, _)| alias.chars().count())
        .chain(std::iter::once("Name".len()))
        .max()
        .unwrap_or(0);

    writeln!(out, "{:<width$}  Available", "Name")?;
    writeln!(out, "{:<width$}  ---------", "----")?;
    for (alias, entry) in entries {
        writeln!(out, "{:<width$}  {}", alias, entry.available)?;
    }
    Ok(())
}

/// One Name/Available/Target block per entry. With `separators`, blocks are
/// framed by `---` lines.
pub fn blocks(
    out: &mut impl Write,
    entries: &[(String, Entry)],
    separators: bool,
) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "{}", NO_ENTRIES);
    }

    if separators {
        writeln!(out, "---")?;
    }
    for (alias, entry) in entries {
        writeln!(out, "Name: {}", alias)?;
        writeln!(out, "Available: {}", entry.available)?;
        writeln!(out, "Target: {}", entry.source.display())?;
        if separators {
            writeln!(out, "---")?;
        }
    }
    Ok(())
}

/// Outcome line for one removed or cleaned name.
pub fn remove_line(report: &RemoveReport, verb: &str) -> String {
    match &report.status {
        RemoveStatus::Removed => format!("{} {}", verb, report.alias),
        RemoveStatus::NotFound => format!("{} not found", report.alias),
        RemoveStatus::Skipped => format!("Skipped {}", report.alias),
        RemoveStatus::Failed(reason) => format!("Failed to remove {}: {}", report.alias, reason),
    }
}

pub fn reconcile_report(out: &mut impl Write, report: &ReconcileReport) -> io::Result<()> {
    writeln!(
        out,
        "Checked {} entries: {} available, {} unavailable",
        report.checked,
        report.available.len(),
        report.unavailable.len()
    )?;
    for alias in &report.changed {
        let now = if report.available.contains(alias) {
            "available"
        } else {
            "unavailable"
        };
        writeln!(out, "  {} is now {}", alias, now)?;
    }
    Ok(())
}
