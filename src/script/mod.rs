//! Turning missing tables and discrepancies into ordered DDL.
//!
//! Output is structured ([`DdlStatement`]) and rendered to SQL text by
//! [`crate::pg::sqlgen::generate_sql`]. Create and alter paths produce separate
//! batches; the executor decides how to run them.

use crate::diff::{detect_discrepancies, ConstraintResolver, Discrepancy, TableDiscrepancies};
use crate::model::{
    ColumnDefinition, ConstraintKind, ForeignKeyRef, LiveSchemaSnapshot, LiveTableSnapshot,
    Registry, SqlType, TableDefinition,
};
use crate::util::{Result, SchemaError};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DdlStatement {
    CreateTable(TableDefinition),
    /// Identity and primary-key clauses are never rendered for added columns.
    AddColumn {
        table: String,
        column: ColumnDefinition,
    },
    DropConstraint {
        table: String,
        constraint: String,
    },
    DropColumn {
        table: String,
        column: String,
    },
    AlterColumnType {
        table: String,
        column: String,
        data_type: SqlType,
    },
    AddForeignKey {
        table: String,
        column: String,
        references: ForeignKeyRef,
    },
    AddPrimaryKey {
        table: String,
        columns: Vec<String>,
    },
    AddUnique {
        table: String,
        column: String,
    },
}

/// What to do with a detected `MissingPrimaryKey`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PrimaryKeyPolicy {
    /// Fail generation with an unsupported-discrepancy error.
    #[default]
    Reject,
    /// Add a `PK_<table>` constraint over every declared primary-key column.
    AddConstraint,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    pub primary_key_policy: PrimaryKeyPolicy,
}

/// Name of the foreign-key constraint generated for `table.column`.
pub fn foreign_key_name(table: &str, column: &str) -> String {
    format!("FK_{table}_{column}")
}

pub fn primary_key_name(table: &str) -> String {
    format!("PK_{table}")
}

/// One `CreateTable` per table, in the order given. No dependency ordering is
/// performed between tables that reference each other.
pub fn generate_create_script<'a>(
    tables: impl IntoIterator<Item = &'a TableDefinition>,
) -> Vec<DdlStatement> {
    tables
        .into_iter()
        .map(|table| DdlStatement::CreateTable(table.clone()))
        .collect()
}

/// Alter statements for each table's discrepancies, in detection order.
///
/// Destructive edits (dropping or retyping a column) are preceded by the
/// removal of whatever constraint `resolver` reports as covering the column.
/// Declared keys lost to those removals are added back: a foreign key or
/// unique constraint right after the retype, a primary key at the end of the
/// table's statements. `snapshot` supplies the kind of each dropped constraint.
pub fn generate_alter_script(
    discrepancies: &[TableDiscrepancies],
    registry: &Registry,
    snapshot: &LiveSchemaSnapshot,
    resolver: &mut dyn ConstraintResolver,
    options: &ScriptOptions,
) -> Result<Vec<DdlStatement>> {
    let mut statements = Vec::new();

    for table_discrepancies in discrepancies {
        let table_name = &table_discrepancies.table;
        let table = registry.get(table_name).ok_or_else(|| {
            SchemaError::ParseError(format!("table \"{table_name}\" is not declared"))
        })?;
        let mut alter = TableAlter::new(table, snapshot.table(table_name));

        for discrepancy in &table_discrepancies.discrepancies {
            alter.apply(discrepancy, resolver, options)?;
        }
        statements.extend(alter.finish());
    }

    Ok(statements)
}

/// Statements for one table, plus what its constraint drops took away.
struct TableAlter<'a> {
    table: &'a TableDefinition,
    live: Option<&'a LiveTableSnapshot>,
    statements: Vec<DdlStatement>,
    dropped: HashSet<String>,
    /// Columns whose declared foreign key or unique constraint was re-added.
    recovered: HashSet<String>,
    primary_key_dropped: bool,
    primary_key_added: bool,
}

impl<'a> TableAlter<'a> {
    fn new(table: &'a TableDefinition, live: Option<&'a LiveTableSnapshot>) -> Self {
        Self {
            table,
            live,
            statements: Vec::new(),
            dropped: HashSet::new(),
            recovered: HashSet::new(),
            primary_key_dropped: false,
            primary_key_added: false,
        }
    }

    fn apply(
        &mut self,
        discrepancy: &Discrepancy,
        resolver: &mut dyn ConstraintResolver,
        options: &ScriptOptions,
    ) -> Result<()> {
        let table = self.table;
        match discrepancy {
            Discrepancy::MissingColumn { column } => {
                let definition = declared_column(table, column)?;
                self.statements.push(DdlStatement::AddColumn {
                    table: table.name.clone(),
                    column: definition.clone(),
                });
            }
            Discrepancy::ExtraColumn { column }
            | Discrepancy::ExtraColumnWithForeignKey { column } => {
                let dropped = self.drop_covering(resolver, column)?;
                self.statements.push(DdlStatement::DropColumn {
                    table: table.name.clone(),
                    column: column.clone(),
                });
                if let Some(constraint) = dropped {
                    if self.kind_of(&constraint) == Some(ConstraintKind::PrimaryKey) {
                        self.primary_key_dropped = true;
                    }
                }
            }
            Discrepancy::TypeMismatch {
                column, expected, ..
            } => {
                let dropped = self.drop_covering(resolver, column)?;
                self.statements.push(DdlStatement::AlterColumnType {
                    table: table.name.clone(),
                    column: column.clone(),
                    data_type: *expected,
                });
                if let Some(constraint) = dropped {
                    self.restore_after_retype(column, &constraint)?;
                }
            }
            Discrepancy::MissingForeignKey { column, references } => {
                self.statements.push(DdlStatement::AddForeignKey {
                    table: table.name.clone(),
                    column: column.clone(),
                    references: references.clone(),
                });
            }
            Discrepancy::MissingPrimaryKey { column } => match options.primary_key_policy {
                PrimaryKeyPolicy::Reject => {
                    return Err(SchemaError::UnsupportedDiscrepancy {
                        table: table.name.clone(),
                        column: column.clone(),
                        reason: "adding a primary key to an existing table is not enabled"
                            .to_string(),
                    });
                }
                PrimaryKeyPolicy::AddConstraint => self.add_primary_key(),
            },
        }
        Ok(())
    }

    fn drop_covering(
        &mut self,
        resolver: &mut dyn ConstraintResolver,
        column: &str,
    ) -> Result<Option<String>> {
        let dropped = resolver.drop_constraint_covering_column(&self.table.name, column)?;
        if let Some(constraint) = &dropped {
            self.statements.push(DdlStatement::DropConstraint {
                table: self.table.name.clone(),
                constraint: constraint.clone(),
            });
            self.dropped.insert(constraint.clone());
        }
        Ok(dropped)
    }

    fn kind_of(&self, constraint: &str) -> Option<ConstraintKind> {
        self.live.and_then(|live| live.constraint_kind(constraint))
    }

    fn restore_after_retype(&mut self, column: &str, constraint: &str) -> Result<()> {
        let definition = declared_column(self.table, column)?;
        match self.kind_of(constraint) {
            Some(ConstraintKind::PrimaryKey) => self.primary_key_dropped = true,
            Some(ConstraintKind::ForeignKey) if definition.foreign_key.is_some() => {
                self.add_foreign_key(definition);
            }
            Some(ConstraintKind::Unique) if definition.unique => {
                self.statements.push(DdlStatement::AddUnique {
                    table: self.table.name.clone(),
                    column: column.to_string(),
                });
                self.recovered.insert(column.to_string());
            }
            kind => tracing::warn!(
                table = %self.table.name,
                column,
                constraint,
                ?kind,
                "dropped constraint has no declared counterpart and is not restored"
            ),
        }
        Ok(())
    }

    fn add_foreign_key(&mut self, column: &ColumnDefinition) {
        if let Some(references) = &column.foreign_key {
            self.statements.push(DdlStatement::AddForeignKey {
                table: self.table.name.clone(),
                column: column.name.clone(),
                references: references.clone(),
            });
            self.recovered.insert(column.name.clone());
        }
    }

    fn add_primary_key(&mut self) {
        let columns: Vec<String> = self
            .table
            .primary_key_columns()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        if self.primary_key_added || columns.is_empty() {
            return;
        }
        self.primary_key_added = true;
        self.statements.push(DdlStatement::AddPrimaryKey {
            table: self.table.name.clone(),
            columns,
        });
    }

    /// Re-adds declared foreign keys whose only reported coverage was dropped,
    /// then the primary key if a drop removed it.
    fn finish(mut self) -> Vec<DdlStatement> {
        let table = self.table;
        let primary_key_present = self.primary_key_dropped || self.primary_key_added;
        let uncovered: Vec<&ColumnDefinition> = table
            .foreign_key_columns()
            .map(|(column, _)| column)
            .filter(|column| !self.recovered.contains(&column.name))
            .filter(|column| !(primary_key_present && column.primary_key))
            .filter(|column| {
                self.live
                    .and_then(|live| live.constraint_covering(&column.name))
                    .is_some_and(|constraint| self.dropped.contains(constraint))
            })
            .filter(|column| {
                let name = foreign_key_name(&table.name, &column.name);
                self.dropped.contains(&name) || self.kind_of(&name).is_none()
            })
            .collect();
        for column in uncovered {
            self.add_foreign_key(column);
        }

        if self.primary_key_dropped {
            self.add_primary_key();
        }
        self.statements
    }
}

fn declared_column<'t>(table: &'t TableDefinition, column: &str) -> Result<&'t ColumnDefinition> {
    table.column(column).ok_or_else(|| {
        SchemaError::ParseError(format!(
            "column \"{column}\" is not declared on table \"{}\"",
            table.name
        ))
    })
}

/// Everything one reconciliation run would do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    /// Declared tables with no live counterpart, in registry order.
    pub missing_tables: Vec<String>,
    pub discrepancies: Vec<TableDiscrepancies>,
    pub create: Vec<DdlStatement>,
    pub alter: Vec<DdlStatement>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.alter.is_empty()
    }

    pub fn has_drift(&self) -> bool {
        !self.missing_tables.is_empty() || !self.discrepancies.is_empty()
    }
}

/// Runs detection and generation over a completed snapshot.
///
/// Tables are visited in registry order. A registry table absent from the
/// snapshot is treated as missing.
pub fn plan_reconciliation(
    registry: &Registry,
    snapshot: &LiveSchemaSnapshot,
    resolver: &mut dyn ConstraintResolver,
    options: &ScriptOptions,
) -> Result<ReconcilePlan> {
    let mut plan = ReconcilePlan::default();
    let mut missing = HashSet::new();

    for table in registry.tables() {
        match snapshot.table(&table.name).filter(|t| t.exists) {
            None => {
                missing.insert(table.name.as_str());
                plan.missing_tables.push(table.name.clone());
            }
            Some(live) => {
                let discrepancies = detect_discrepancies(table, live);
                if !discrepancies.is_empty() {
                    tracing::info!(
                        table = %table.name,
                        count = discrepancies.len(),
                        "schema discrepancies found"
                    );
                    plan.discrepancies.push(TableDiscrepancies {
                        table: table.name.clone(),
                        discrepancies,
                    });
                }
            }
        }
    }

    plan.create =
        generate_create_script(registry.tables().filter(|t| missing.contains(t.name.as_str())));
    plan.alter =
        generate_alter_script(&plan.discrepancies, registry, snapshot, resolver, options)?;

    tracing::info!(
        missing = plan.missing_tables.len(),
        altered = plan.discrepancies.len(),
        create_statements = plan.create.len(),
        alter_statements = plan.alter.len(),
        "reconciliation planned"
    );

    Ok(plan)
}
