use regex::Regex;
use thiserror::Error;

/// Collapses runs of whitespace and trims, so catalog-reported type names
/// like `"character  varying"` compare equal to their canonical spelling.
pub fn normalize_sql_whitespace(sql: &str) -> String {
    let re = Regex::new(r"\s+").expect("static regex");
    re.replace_all(sql.trim(), " ").to_string()
}

/// Masks the password component of a connection URL for logging.
///
/// `postgres://app:secret@db:5432/main` becomes `postgres://app:***@db:5432/main`.
pub fn sanitize_url(url: &str) -> String {
    let re = Regex::new(r"^(?P<scheme>[a-zA-Z][a-zA-Z0-9+.-]*://[^:/@]+):[^@]*@")
        .expect("static regex");
    re.replace(url, "$scheme:***@").to_string()
}

/// Removes any occurrence of the raw connection string (and its password)
/// from a driver error message.
pub fn sanitize_connection_error(connection_string: &str, message: &str) -> String {
    let mut sanitized = message.replace(connection_string, &sanitize_url(connection_string));
    if let Some(password) = extract_password(connection_string) {
        if !password.is_empty() {
            sanitized = sanitized.replace(&password, "***");
        }
    }
    sanitized
}

fn extract_password(url: &str) -> Option<String> {
    let re = Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^:/@]+:(?P<password>[^@]*)@")
        .expect("static regex");
    re.captures(url)
        .and_then(|caps| caps.name("password"))
        .map(|m| m.as_str().to_string())
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unsupported type \"{type_name}\" on {table}.{field}")]
    UnsupportedType {
        table: String,
        field: String,
        type_name: String,
    },

    #[error("Unsupported discrepancy on {table}.{column}: {reason}")]
    UnsupportedDiscrepancy {
        table: String,
        column: String,
        reason: String,
    },

    #[error("Constraint resolution failed for {table}.{column}: {message}")]
    ConstraintResolution {
        table: String,
        column: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
