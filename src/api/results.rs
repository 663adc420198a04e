use crate::descriptor::ConfigurationError;
use crate::diff::TableDiscrepancies;
use serde::Serialize;

/// Result of a reconciliation plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    /// `CREATE TABLE` statements for missing tables
    pub create: Vec<String>,
    /// Alter statements for tables that exist but differ
    pub alter: Vec<String>,
    pub discrepancies: Vec<TableDiscrepancies>,
    pub missing_tables: Vec<String>,
    /// Entities left out of the declared model
    pub skipped_entities: Vec<ConfigurationError>,
    /// Fingerprint of the declared model
    pub fingerprint: String,
}

impl PlanResult {
    /// Whether the plan is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.alter.is_empty()
    }

    pub fn statement_count(&self) -> usize {
        self.create.len() + self.alter.len()
    }
}

/// Result of applying a reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    /// Number of statements executed; zero on a dry run
    pub statements_executed: usize,
    /// Rendered statements, create batch first
    pub statements: Vec<String>,
    pub dry_run: bool,
    pub skipped_entities: Vec<ConfigurationError>,
}

/// Result of a read-only drift check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub has_drift: bool,
    pub discrepancies: Vec<TableDiscrepancies>,
    pub missing_tables: Vec<String>,
    pub fingerprint: String,
}

/// Result of loading descriptors without touching a database.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateResult {
    /// Declared tables, in declaration order
    pub tables: Vec<String>,
    pub skipped_entities: Vec<ConfigurationError>,
    pub fingerprint: String,
}

impl ValidateResult {
    pub fn is_clean(&self) -> bool {
        self.skipped_entities.is_empty()
    }
}
