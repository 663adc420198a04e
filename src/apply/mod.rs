//! Runs a [`ReconcilePlan`] against a live connection.
//!
//! Both batches run create-then-alter inside one transaction. Nothing is
//! retried: DDL is not safe to repeat blindly after a partial failure.

use crate::pg::connection::PgConnection;
use crate::pg::sqlgen::generate_sql;
use crate::script::{DdlStatement, ReconcilePlan};
use sqlx::Executor;
use thiserror::Error;
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub schema: String,
    pub dry_run: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecuteResult {
    pub statements: Vec<String>,
    pub executed: usize,
    pub dry_run: bool,
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Failed to begin transaction: {0}")]
    Begin(String),

    #[error("Dropping constraint {constraint} on {table} failed: {message}")]
    ConstraintDrop {
        table: String,
        constraint: String,
        message: String,
        statement_index: usize,
        sql: String,
    },

    #[error("Statement {statement_index} failed: {message}")]
    Statement {
        message: String,
        statement_index: usize,
        sql: String,
    },

    #[error("Failed to commit transaction: {0}")]
    Commit(String),
}

/// Statements in execution order: the create batch, then the alter batch.
pub fn plan_statements(plan: &ReconcilePlan) -> Vec<&DdlStatement> {
    plan.create.iter().chain(plan.alter.iter()).collect()
}

pub async fn execute_plan(
    connection: &PgConnection,
    plan: &ReconcilePlan,
    options: &ExecuteOptions,
) -> Result<ExecuteResult, ExecuteError> {
    let ordered: Vec<DdlStatement> = plan_statements(plan).into_iter().cloned().collect();
    let statements = generate_sql(&ordered, &options.schema);

    if statements.is_empty() || options.dry_run {
        return Ok(ExecuteResult {
            executed: 0,
            statements,
            dry_run: options.dry_run,
        });
    }

    let mut transaction = connection
        .pool()
        .begin()
        .await
        .map_err(|e| ExecuteError::Begin(e.to_string()))?;

    for (i, (statement, sql)) in ordered.iter().zip(&statements).enumerate() {
        let span = tracing::debug_span!("db.execute", index = i, sql = %sql);
        if let Err(e) = transaction.execute(sql.as_str()).instrument(span).await {
            tracing::error!(index = i, sql = %sql, "statement failed: {e}");
            return Err(match statement {
                DdlStatement::DropConstraint { table, constraint } => ExecuteError::ConstraintDrop {
                    table: table.clone(),
                    constraint: constraint.clone(),
                    message: e.to_string(),
                    statement_index: i,
                    sql: sql.clone(),
                },
                _ => ExecuteError::Statement {
                    message: e.to_string(),
                    statement_index: i,
                    sql: sql.clone(),
                },
            });
        }
    }

    transaction
        .commit()
        .await
        .map_err(|e| ExecuteError::Commit(e.to_string()))?;

    tracing::info!(executed = statements.len(), "reconciliation applied");

    Ok(ExecuteResult {
        executed: statements.len(),
        statements,
        dry_run: false,
    })
}
