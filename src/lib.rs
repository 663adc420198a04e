//! pgreconcile - bring a live PostgreSQL schema in line with declared entities.
//!
//! Entity descriptors are turned into a canonical table model, compared with
//! what the database catalog reports, and any difference is expressed as
//! additive or corrective DDL.
//!
//! # Quick Start
//!
//! Use the high-level API via the [`api`] module or [`prelude`]:
//!
//! ```no_run
//! use pgreconcile::prelude::*;
//!
//! let result = plan_blocking(ReconcileOptions::new(
//!     vec!["entities/".into()],
//!     "postgres://localhost/mydb",
//! )).unwrap();
//!
//! for statement in &result.alter {
//!     println!("{}", statement);
//! }
//! ```
//!
//! # Modules
//!
//! - [`descriptor`] - Entity descriptors and the canonical model builder
//! - [`model`] - Declared tables, logical types and live catalog snapshots
//! - [`pg`] - Connection, catalog inspection and SQL rendering
//! - [`diff`] - Discrepancy detection and constraint resolution
//! - [`script`] - Create and alter script generation
//! - [`apply`] - Transactional execution of a plan

pub mod api;
pub mod apply;
pub mod descriptor;
pub mod diff;
pub mod model;
pub mod pg;
pub mod prelude;
pub mod script;
pub mod util;
