//! Convenient re-exports for common pgreconcile usage.
//!
//! # Example
//!
//! ```no_run
//! use pgreconcile::prelude::*;
//!
//! let result = check_blocking(ReconcileOptions::new(
//!     vec!["entities/".into()],
//!     "postgres://localhost/mydb",
//! )).unwrap();
//!
//! println!("drift: {}", result.has_drift);
//! ```

// Async functions
pub use crate::api::{apply, check, plan};

// Blocking functions
pub use crate::api::{apply_blocking, check_blocking, plan_blocking, validate};

pub use crate::api::ReconcileOptions;

pub use crate::api::{ApplyResult, CheckResult, PlanResult, ValidateResult};

pub use crate::api::Error;

// Core types
pub use crate::descriptor::{
    build_registry, ColumnDescriptor, ConfigurationError, EntityDescriptor, FieldDescriptor,
};
pub use crate::diff::{detect_discrepancies, ConstraintResolver, Discrepancy, SnapshotResolver};
pub use crate::model::{Registry, TableDefinition};
pub use crate::script::{plan_reconciliation, DdlStatement, PrimaryKeyPolicy, ReconcilePlan};
