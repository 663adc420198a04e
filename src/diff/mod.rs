pub mod resolver;

pub use resolver::{ConstraintResolver, SnapshotResolver};

use crate::model::{ForeignKeyRef, LiveTableSnapshot, SqlType, TableDefinition};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A structured difference between a declared table and its live counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    MissingColumn {
        column: String,
    },
    /// Live column with no declaration and no covering constraint.
    ExtraColumn {
        column: String,
    },
    /// Live column with no declaration, covered by a named constraint (a
    /// foreign key or any other kind).
    ExtraColumnWithForeignKey {
        column: String,
    },
    TypeMismatch {
        column: String,
        expected: SqlType,
        actual: String,
    },
    /// The reference is the declared one, whatever the live schema shows.
    MissingForeignKey {
        column: String,
        references: ForeignKeyRef,
    },
    MissingPrimaryKey {
        column: String,
    },
}

impl Discrepancy {
    pub fn column(&self) -> &str {
        match self {
            Discrepancy::MissingColumn { column }
            | Discrepancy::ExtraColumn { column }
            | Discrepancy::ExtraColumnWithForeignKey { column }
            | Discrepancy::TypeMismatch { column, .. }
            | Discrepancy::MissingForeignKey { column, .. }
            | Discrepancy::MissingPrimaryKey { column } => column,
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::MissingColumn { column } => write!(f, "missing column {column}"),
            Discrepancy::ExtraColumn { column } => write!(f, "extra column {column}"),
            Discrepancy::ExtraColumnWithForeignKey { column } => {
                write!(f, "extra column {column} (constrained)")
            }
            Discrepancy::TypeMismatch {
                column,
                expected,
                actual,
            } => write!(
                f,
                "column {column} has mismatched type: expected {expected}, found {actual}"
            ),
            Discrepancy::MissingForeignKey { column, references } => write!(
                f,
                "missing foreign key {column} -> {}.{}",
                references.table, references.column
            ),
            Discrepancy::MissingPrimaryKey { column } => {
                write!(f, "missing primary key on {column}")
            }
        }
    }
}

/// Discrepancies for one table, in detection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDiscrepancies {
    pub table: String,
    pub discrepancies: Vec<Discrepancy>,
}

/// Compares a declared table with a live table that exists.
///
/// Checks run in a fixed order: declared columns (missing, then type), live
/// columns without a declaration, declared foreign keys, declared primary-key
/// columns. Within each pass the declared or live column order is kept.
pub fn detect_discrepancies(table: &TableDefinition, live: &LiveTableSnapshot) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();

    discrepancies.extend(diff_columns(table, live));
    discrepancies.extend(diff_extra_columns(table, live));
    discrepancies.extend(diff_foreign_keys(table, live));
    discrepancies.extend(diff_primary_keys(table, live));

    discrepancies
}

fn diff_columns(table: &TableDefinition, live: &LiveTableSnapshot) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();

    for column in &table.columns {
        match live.column(&column.name) {
            None => discrepancies.push(Discrepancy::MissingColumn {
                column: column.name.clone(),
            }),
            Some(live_column) => {
                let expected = column.sql_type();
                if !expected.matches(live_column) {
                    discrepancies.push(Discrepancy::TypeMismatch {
                        column: column.name.clone(),
                        expected,
                        actual: live_column.describe_type(),
                    });
                }
            }
        }
    }

    discrepancies
}

fn diff_extra_columns(table: &TableDefinition, live: &LiveTableSnapshot) -> Vec<Discrepancy> {
    let declared: HashSet<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();

    live.columns
        .iter()
        .filter(|c| !declared.contains(c.name.as_str()))
        .map(|c| match live.constraint_covering(&c.name) {
            Some(_) => Discrepancy::ExtraColumnWithForeignKey {
                column: c.name.clone(),
            },
            None => Discrepancy::ExtraColumn {
                column: c.name.clone(),
            },
        })
        .collect()
}

fn diff_foreign_keys(table: &TableDefinition, live: &LiveTableSnapshot) -> Vec<Discrepancy> {
    table
        .foreign_key_columns()
        .filter(|(column, _)| live.constraint_covering(&column.name).is_none())
        .map(|(column, reference)| Discrepancy::MissingForeignKey {
            column: column.name.clone(),
            references: reference.clone(),
        })
        .collect()
}

fn diff_primary_keys(table: &TableDefinition, live: &LiveTableSnapshot) -> Vec<Discrepancy> {
    table
        .primary_key_columns()
        .into_iter()
        .filter(|column| !live.primary_key_columns.contains(&column.name))
        .map(|column| Discrepancy::MissingPrimaryKey {
            column: column.name.clone(),
        })
        .collect()
}
