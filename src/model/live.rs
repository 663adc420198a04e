use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One column as the database reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveColumnInfo {
    pub name: String,
    pub data_type: String,
    pub max_length: Option<u32>,
}

impl LiveColumnInfo {
    /// Reported type with its length, e.g. `character varying(50)`.
    pub fn describe_type(&self) -> String {
        match self.max_length {
            Some(len) => format!("{}({len})", self.data_type),
            None => self.data_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
    Exclusion,
}

impl ConstraintKind {
    /// Maps a `pg_constraint.contype` code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "p" => Some(ConstraintKind::PrimaryKey),
            "u" => Some(ConstraintKind::Unique),
            "f" => Some(ConstraintKind::ForeignKey),
            "c" => Some(ConstraintKind::Check),
            "x" => Some(ConstraintKind::Exclusion),
            _ => None,
        }
    }
}

/// Read-only view of one live table, fetched fresh for each run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveTableSnapshot {
    pub name: String,
    pub exists: bool,
    pub columns: Vec<LiveColumnInfo>,
    pub primary_key_columns: BTreeSet<String>,
    /// Column name to the name of a constraint covering it.
    pub constraints: BTreeMap<String, String>,
    /// Constraint name to kind, for every covering constraint on the table.
    #[serde(default)]
    pub constraint_kinds: BTreeMap<String, ConstraintKind>,
}

impl LiveTableSnapshot {
    /// Snapshot of a table the database does not have.
    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn column(&self, name: &str) -> Option<&LiveColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn constraint_covering(&self, column: &str) -> Option<&str> {
        self.constraints.get(column).map(String::as_str)
    }

    pub fn constraint_kind(&self, constraint: &str) -> Option<ConstraintKind> {
        self.constraint_kinds.get(constraint).copied()
    }
}

/// Live state of every table the registry declares, keyed by table name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveSchemaSnapshot {
    pub tables: IndexMap<String, LiveTableSnapshot>,
}

impl LiveSchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: LiveTableSnapshot) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Option<&LiveTableSnapshot> {
        self.tables.get(name)
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.get(name).is_some_and(|t| t.exists)
    }
}
