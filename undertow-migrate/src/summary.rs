//! Human-readable rendering of a migration report.

use colored::Colorize;
use undertow::migration::{MigrationReport, TableState};

/// One line per table, then a total.
pub fn render_report(report: &MigrationReport) -> String {
    let mut out = String::new();
    for t in &report.tables {
        let marker = match (t.state, t.created) {
            (TableState::ForeignKeysApplied, true) => "+".green(),
            (TableState::ForeignKeysApplied, false) if t.statements > 0 => "~".yellow(),
            (TableState::ForeignKeysApplied, false) => "=".normal(),
            _ => "!".red(),
        };
        let detail = if t.created {
            "created".to_string()
        } else if t.statements == 0 {
            "up to date".to_string()
        } else {
            format!("{} statements", t.statements)
        };
        out.push_str(&format!("  {marker} {} ({detail})\n", t.table));
    }
    let total = report.statement_count();
    let noun = if total == 1 { "statement" } else { "statements" };
    out.push_str(&format!("{} tables, {total} {noun}\n", report.tables.len()));
    out
}
