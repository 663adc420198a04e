use crate::script::{PrimaryKeyPolicy, ScriptOptions};

/// Options shared by `plan`, `apply` and `check`.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Descriptor files, directories or glob patterns
    pub descriptor_sources: Vec<String>,
    /// Database connection URL
    pub database_url: String,
    /// PostgreSQL schema holding the tables (default: "public")
    pub target_schema: String,
    /// What to do when a live table lacks a declared primary key
    pub primary_key_policy: PrimaryKeyPolicy,
    /// Render without executing (only used by `apply`)
    pub dry_run: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            descriptor_sources: Vec::new(),
            database_url: String::new(),
            target_schema: "public".into(),
            primary_key_policy: PrimaryKeyPolicy::default(),
            dry_run: false,
        }
    }
}

impl ReconcileOptions {
    /// Create new options with required fields.
    pub fn new(descriptor_sources: Vec<String>, database_url: impl Into<String>) -> Self {
        Self {
            descriptor_sources,
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    pub fn with_target_schema(mut self, schema: impl Into<String>) -> Self {
        self.target_schema = schema.into();
        self
    }

    /// Add a primary-key constraint when a live table lacks one, instead of failing.
    pub fn add_missing_primary_keys(mut self) -> Self {
        self.primary_key_policy = PrimaryKeyPolicy::AddConstraint;
        self
    }

    /// Enable dry run mode (preview only).
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub(crate) fn script_options(&self) -> ScriptOptions {
        ScriptOptions {
            primary_key_policy: self.primary_key_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ReconcileOptions::new(vec!["entities/".into()], "postgres://localhost/db");
        assert_eq!(options.target_schema, "public");
        assert_eq!(options.primary_key_policy, PrimaryKeyPolicy::Reject);
        assert!(!options.dry_run);
    }

    #[test]
    fn builder_chain() {
        let options = ReconcileOptions::new(vec![], "postgres://localhost/db")
            .with_target_schema("app")
            .add_missing_primary_keys()
            .dry_run();
        assert_eq!(options.target_schema, "app");
        assert_eq!(
            options.script_options().primary_key_policy,
            PrimaryKeyPolicy::AddConstraint
        );
        assert!(options.dry_run);
    }
}
