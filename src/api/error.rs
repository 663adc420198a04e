use crate::apply::ExecuteError;
use crate::util::SchemaError;
use thiserror::Error;

/// Structured error type for pgreconcile library operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load descriptors: {message}")]
    Load { message: String },

    #[error("Unsupported type \"{type_name}\" on {table}.{field}")]
    UnsupportedType {
        table: String,
        field: String,
        type_name: String,
    },

    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Catalog query failed: {message}")]
    CatalogQuery { message: String },

    #[error("Unsupported discrepancy on {table}.{column}: {reason}")]
    UnsupportedDiscrepancy {
        table: String,
        column: String,
        reason: String,
    },

    /// `subject` is the column being edited, or the constraint whose drop
    /// failed during execution.
    #[error("Constraint resolution failed on {table} ({subject}): {message}")]
    ConstraintResolution {
        table: String,
        subject: String,
        message: String,
    },

    #[error("Script execution failed at statement {statement_index}: {message}")]
    ScriptExecution {
        message: String,
        statement_index: usize,
        sql: String,
    },

    #[error("Runtime error: {message}")]
    Runtime { message: String },
}

impl Error {
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn catalog_query(message: impl Into<String>) -> Self {
        Self::CatalogQuery {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::ParseError(message) => Self::Load { message },
            SchemaError::DatabaseError(message) => Self::CatalogQuery { message },
            SchemaError::UnsupportedType {
                table,
                field,
                type_name,
            } => Self::UnsupportedType {
                table,
                field,
                type_name,
            },
            SchemaError::UnsupportedDiscrepancy {
                table,
                column,
                reason,
            } => Self::UnsupportedDiscrepancy {
                table,
                column,
                reason,
            },
            SchemaError::ConstraintResolution {
                table,
                column,
                message,
            } => Self::ConstraintResolution {
                table,
                subject: column,
                message,
            },
        }
    }
}

impl From<ExecuteError> for Error {
    fn from(err: ExecuteError) -> Self {
        match err {
            ExecuteError::ConstraintDrop {
                table,
                constraint,
                message,
                ..
            } => Self::ConstraintResolution {
                table,
                subject: constraint,
                message,
            },
            ExecuteError::Statement {
                message,
                statement_index,
                sql,
            } => Self::ScriptExecution {
                message,
                statement_index,
                sql,
            },
            ExecuteError::Begin(message) => Self::ScriptExecution {
                message: format!("Failed to begin transaction: {message}"),
                statement_index: 0,
                sql: String::new(),
            },
            ExecuteError::Commit(message) => Self::ScriptExecution {
                message: format!("Failed to commit transaction: {message}"),
                statement_index: 0,
                sql: String::new(),
            },
        }
    }
}
