//! Locating and removing the constraint that covers a column before a
//! destructive edit.

use crate::model::LiveSchemaSnapshot;
use crate::util::{Result, SchemaError};
use std::collections::BTreeSet;

pub trait ConstraintResolver {
    /// Finds the named constraint covering `table.column`, issues its removal
    /// and returns its name. Returns `None` when nothing covers the column.
    fn drop_constraint_covering_column(&mut self, table: &str, column: &str)
        -> Result<Option<String>>;
}

/// Resolves constraints from a freshly fetched [`LiveSchemaSnapshot`].
///
/// Removal is recorded rather than executed: the caller emits the drop into
/// the alter batch so the executor's transaction covers it. A constraint is
/// only handed out once per run.
#[derive(Debug)]
pub struct SnapshotResolver<'a> {
    snapshot: &'a LiveSchemaSnapshot,
    dropped: BTreeSet<(String, String)>,
}

impl<'a> SnapshotResolver<'a> {
    pub fn new(snapshot: &'a LiveSchemaSnapshot) -> Self {
        Self {
            snapshot,
            dropped: BTreeSet::new(),
        }
    }

    /// Constraints handed out so far, as `(table, constraint)` pairs.
    pub fn dropped(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dropped.iter().map(|(t, c)| (t.as_str(), c.as_str()))
    }
}

impl ConstraintResolver for SnapshotResolver<'_> {
    fn drop_constraint_covering_column(
        &mut self,
        table: &str,
        column: &str,
    ) -> Result<Option<String>> {
        let live = self
            .snapshot
            .table(table)
            .filter(|t| t.exists)
            .ok_or_else(|| SchemaError::ConstraintResolution {
                table: table.to_string(),
                column: column.to_string(),
                message: "table was not found in the inspected schema".to_string(),
            })?;

        let Some(constraint) = live.constraint_covering(column) else {
            return Ok(None);
        };

        let key = (table.to_string(), constraint.to_string());
        if !self.dropped.insert(key) {
            tracing::debug!(table, column, constraint, "constraint already dropped");
            return Ok(None);
        }

        tracing::debug!(table, column, constraint, "dropping covering constraint");
        Ok(Some(constraint.to_string()))
    }
}
