//! Command handlers. Each one calls into `LiteTie` and prints the result.

use crate::render;
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tie_core::{LiteTie, RemoveReport, TieError};

pub fn add(tie: &LiteTie, exec_path: &Path, alias: Option<&str>) -> Result<()> {
    let outcome = tie.add(exec_path, alias)?;
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "Linked {} -> {} ({})",
        outcome.alias,
        outcome.source.display(),
        outcome.kind
    )?;
    Ok(())
}

pub fn list(tie: &LiteTie, name: Option<&str>, simple: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    let entries = match tie.list(name) {
        Ok(entries) => entries,
        Err(err @ TieError::NotFound { .. }) => {
            if let Some(name) = name {
                writeln!(out, "Entry '{}' not found.", name)?;
            }
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    if simple {
        render::table(&mut out, &entries)?;
    } else {
        render::blocks(&mut out, &entries, name.is_none())?;
    }
    Ok(())
}

pub fn remove(tie: &LiteTie, names: &[String], silent: bool, clean: bool) -> Result<()> {
    let mut out = io::stdout();

    if !names.is_empty() {
        let stdin = io::stdin();
        let reports = tie.remove(names, silent, |name, _| {
            confirm(&mut stdin.lock(), &mut io::stdout(), name).unwrap_or(false)
        })?;
        print_reports(&mut out, &reports, "Removed")?;
    }

    if clean {
        let reports = tie.clean()?;
        print_reports(&mut out, &reports, "Cleaned")?;
    }
    Ok(())
}

pub fn update(tie: &LiteTie) -> Result<()> {
    let report = tie.update()?;
    render::reconcile_report(&mut io::stdout().lock(), &report)?;
    Ok(())
}

fn print_reports(out: &mut impl Write, reports: &[RemoveReport], verb: &str) -> Result<()> {
    for report in reports {
        writeln!(out, "{}", render::remove_line(report, verb))?;
    }
    Ok(())
}

/// Ask whether to delete `name`. Only "yes" or "y" (any case) approve; end of
/// input declines.
fn confirm(input: &mut impl BufRead, output: &mut impl Write, name: &str) -> Result<bool> {
    write!(output, "Delete {}? (yes/no): ", name)?;
    output.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "yes" || answer == "y")
}
