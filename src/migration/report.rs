//! Per-table progress of a migration run.

use std::fmt;

/// Where a table is in the two-pass run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    NotChecked,
    /// Not found in the catalog.
    Absent,
    Created,
    /// Found and introspected.
    Live,
    /// Columns and indexes match the target.
    StructureSettled,
    /// Foreign keys applied; the terminal state.
    ForeignKeysApplied,
}

impl TableState {
    /// Whether moving to `next` is a legal transition.
    pub fn can_advance_to(self, next: TableState) -> bool {
        use TableState::*;
        matches!(
            (self, next),
            (NotChecked, Absent)
                | (NotChecked, Live)
                | (Absent, Created)
                | (Created, StructureSettled)
                | (Live, StructureSettled)
                | (StructureSettled, ForeignKeysApplied)
        )
    }
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TableState::NotChecked => "not checked",
            TableState::Absent => "absent",
            TableState::Created => "created",
            TableState::Live => "live",
            TableState::StructureSettled => "structure settled",
            TableState::ForeignKeysApplied => "foreign keys applied",
        };
        f.write_str(s)
    }
}

/// Progress of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub state: TableState,
    /// Whether the table was created by this run.
    pub created: bool,
    pub statements: usize,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub tables: Vec<TableReport>,
    /// Every statement run (or written, in dry-run mode), in order.
    pub statements: Vec<String>,
}

impl MigrationReport {
    pub fn new<'a>(tables: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|t| TableReport {
                    table: t.to_string(),
                    state: TableState::NotChecked,
                    created: false,
                    statements: 0,
                })
                .collect(),
            statements: Vec::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub(crate) fn advance(&mut self, idx: usize, next: TableState) {
        if let Some(t) = self.tables.get_mut(idx) {
            debug_assert!(
                t.state.can_advance_to(next),
                "table {} cannot move from {} to {next}",
                t.table,
                t.state
            );
            log::info!("table {:?}: {} -> {next}", t.table, t.state);
            if next == TableState::Created {
                t.created = true;
            }
            t.state = next;
        }
    }

    pub(crate) fn record(&mut self, idx: usize, statement: String) {
        if let Some(t) = self.tables.get_mut(idx) {
            t.statements += 1;
        }
        self.statements.push(statement);
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Whether every table reached the terminal state.
    pub fn is_complete(&self) -> bool {
        self.tables.iter().all(|t| t.state == TableState::ForeignKeysApplied)
    }
}
