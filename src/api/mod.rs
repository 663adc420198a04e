//! High-level API for embedding pgreconcile in other applications.
//!
//! These functions mirror the CLI commands with structured inputs and
//! outputs. Both async and blocking variants are available.
//!
//! # Example
//!
//! ```no_run
//! use pgreconcile::api::{plan_blocking, ReconcileOptions};
//!
//! let result = plan_blocking(ReconcileOptions::new(
//!     vec!["entities/".into()],
//!     "postgres://localhost/mydb",
//! )).unwrap();
//!
//! for statement in result.create.iter().chain(&result.alter) {
//!     println!("{}", statement);
//! }
//! ```
//!
//! Blocking variants create a new tokio runtime per call. For
//! high-frequency usage, prefer the async API with a shared runtime.

mod error;
mod options;
mod results;

pub use error::Error;
pub use options::ReconcileOptions;
pub use results::{ApplyResult, CheckResult, PlanResult, ValidateResult};

use crate::apply::{execute_plan, ExecuteOptions};
use crate::descriptor::{build_registry, load_descriptor_sources, BuildOutput};
use crate::diff::SnapshotResolver;
use crate::pg::connection::PgConnection;
use crate::pg::introspect::PgCatalog;
use crate::pg::sqlgen::generate_sql;
use crate::script::{plan_reconciliation, ReconcilePlan};

fn load_registry(sources: &[String]) -> Result<BuildOutput, Error> {
    let descriptors = load_descriptor_sources(sources)?;
    Ok(build_registry(&descriptors)?)
}

async fn connect(database_url: &str) -> Result<PgConnection, Error> {
    PgConnection::new(database_url)
        .await
        .map_err(|e| Error::connection(e.to_string()))
}

/// Loads the declared model, inspects the live schema once and plans the run.
async fn reconcile(
    options: &ReconcileOptions,
) -> Result<(PgConnection, BuildOutput, ReconcilePlan), Error> {
    let built = load_registry(&options.descriptor_sources)?;
    let connection = connect(&options.database_url).await?;

    let snapshot = PgCatalog::new(&connection, options.target_schema.as_str())
        .inspect(&built.registry)
        .await
        .map_err(|e| Error::catalog_query(e.to_string()))?;

    let mut resolver = SnapshotResolver::new(&snapshot);
    let plan = plan_reconciliation(
        &built.registry,
        &snapshot,
        &mut resolver,
        &options.script_options(),
    )?;

    Ok((connection, built, plan))
}

/// Generate create and alter scripts reconciling the database with the descriptors.
pub async fn plan(options: ReconcileOptions) -> Result<PlanResult, Error> {
    let (_connection, built, plan) = reconcile(&options).await?;

    Ok(PlanResult {
        create: generate_sql(&plan.create, &options.target_schema),
        alter: generate_sql(&plan.alter, &options.target_schema),
        discrepancies: plan.discrepancies,
        missing_tables: plan.missing_tables,
        fingerprint: built.registry.fingerprint(),
        skipped_entities: built.rejected,
    })
}

/// Plan and execute the reconciliation in a single transaction.
pub async fn apply(options: ReconcileOptions) -> Result<ApplyResult, Error> {
    let (connection, built, plan) = reconcile(&options).await?;

    let execute_options = ExecuteOptions {
        schema: options.target_schema.clone(),
        dry_run: options.dry_run,
    };
    let executed = execute_plan(&connection, &plan, &execute_options).await?;

    Ok(ApplyResult {
        statements_executed: executed.executed,
        statements: executed.statements,
        dry_run: executed.dry_run,
        skipped_entities: built.rejected,
    })
}

/// Report drift without generating or executing anything destructive.
///
/// A missing primary key counts as drift even when the configured policy
/// would reject generating a fix for it.
pub async fn check(options: ReconcileOptions) -> Result<CheckResult, Error> {
    let options = options.add_missing_primary_keys();
    let (_connection, built, plan) = reconcile(&options).await?;

    Ok(CheckResult {
        has_drift: plan.has_drift(),
        discrepancies: plan.discrepancies,
        missing_tables: plan.missing_tables,
        fingerprint: built.registry.fingerprint(),
    })
}

/// Load and build the declared model without connecting to a database.
pub fn validate(descriptor_sources: &[String]) -> Result<ValidateResult, Error> {
    let built = load_registry(descriptor_sources)?;

    Ok(ValidateResult {
        tables: built.registry.names().map(str::to_string).collect(),
        fingerprint: built.registry.fingerprint(),
        skipped_entities: built.rejected,
    })
}

fn create_runtime() -> Result<tokio::runtime::Runtime, Error> {
    tokio::runtime::Runtime::new().map_err(|e| Error::runtime(e.to_string()))
}

/// Blocking variant of [`plan`].
///
/// Creates a new tokio runtime for each call.
pub fn plan_blocking(options: ReconcileOptions) -> Result<PlanResult, Error> {
    create_runtime()?.block_on(plan(options))
}

/// Blocking variant of [`apply`].
pub fn apply_blocking(options: ReconcileOptions) -> Result<ApplyResult, Error> {
    create_runtime()?.block_on(apply(options))
}

/// Blocking variant of [`check`].
pub fn check_blocking(options: ReconcileOptions) -> Result<CheckResult, Error> {
    create_runtime()?.block_on(check(options))
}
