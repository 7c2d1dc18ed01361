//! Lint posts and internal links

use anyhow::Result;

use crate::check::{self, Report, Severity};
use crate::Site;

/// Run the linter and print every diagnostic followed by a summary
pub fn run(site: &Site) -> Result<Report> {
    let report = check::run(site)?;

    for diagnostic in &report.diagnostics {
        match diagnostic.severity() {
            Severity::Error => eprintln!("{}", diagnostic),
            Severity::Warning => println!("{}", diagnostic),
        }
    }

    let errors = report.errors().count();
    let warnings = report.warnings().count();
    println!(
        "{} documents checked: {} error{}, {} warning{}",
        report.documents,
        errors,
        if errors == 1 { "" } else { "s" },
        warnings,
        if warnings == 1 { "" } else { "s" }
    );

    Ok(report)
}
