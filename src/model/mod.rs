mod live;
mod types;

pub use live::{ConstraintKind, LiveColumnInfo, LiveSchemaSnapshot, LiveTableSnapshot};
pub use types::{LogicalType, SqlType};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Canonical, immutable description of one declared table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    pub primary_key: bool,
    pub identity: bool,
    pub unique: bool,
    pub default: Option<DefaultValue>,
    pub foreign_key: Option<ForeignKeyRef>,
}

/// Reference from a column to `table.column`. Not checked for existence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// A declared column default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DefaultValue {
    /// Raw SQL expression such as `now()`, emitted verbatim.
    Expression(String),
    Boolean(bool),
    Integer(i64),
    /// Numeric literal kept as text so precision survives round trips.
    Number(String),
    Text(String),
}

impl DefaultValue {
    /// Renders the default as a SQL literal or expression.
    pub fn to_sql(&self) -> String {
        match self {
            DefaultValue::Expression(expression) => expression.clone(),
            DefaultValue::Boolean(true) => "TRUE".to_string(),
            DefaultValue::Boolean(false) => "FALSE".to_string(),
            DefaultValue::Integer(value) => value.to_string(),
            DefaultValue::Number(value) => value.clone(),
            DefaultValue::Text(value) => format!("'{}'", value.replace('\'', "''")),
        }
    }
}

impl TableDefinition {
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key_columns(&self) -> Vec<&ColumnDefinition> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    pub fn foreign_key_columns(&self) -> impl Iterator<Item = (&ColumnDefinition, &ForeignKeyRef)> {
        self.columns
            .iter()
            .filter_map(|c| c.foreign_key.as_ref().map(|fk| (c, fk)))
    }
}

impl ColumnDefinition {
    /// The column's mapped SQL type.
    pub fn sql_type(&self) -> SqlType {
        self.logical_type.sql_type()
    }
}

/// Name-keyed set of declared tables, in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    tables: IndexMap<String, TableDefinition>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a table, returning `false` without replacing if the name is taken.
    pub fn insert(&mut self, table: TableDefinition) -> bool {
        if self.tables.contains_key(&table.name) {
            return false;
        }
        self.tables.insert(table.name.clone(), table);
        true
    }

    pub fn get(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDefinition> {
        self.tables.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let json = serde_json::to_string(self).expect("Registry must serialize");
        let hash = Sha256::digest(json.as_bytes());
        hex::encode(hash)
    }
}

impl FromIterator<TableDefinition> for Registry {
    fn from_iter<I: IntoIterator<Item = TableDefinition>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for table in iter {
            registry.insert(table);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, logical_type: LogicalType) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            logical_type,
            nullable: true,
            primary_key: false,
            identity: false,
            unique: false,
            default: None,
            foreign_key: None,
        }
    }

    fn table(name: &str) -> TableDefinition {
        TableDefinition {
            name: name.to_string(),
            columns: vec![column("Id", LogicalType::Integer32)],
        }
    }

    #[test]
    fn registry_preserves_declaration_order() {
        let registry: Registry = ["Users", "Roles", "Audit"].into_iter().map(table).collect();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["Users", "Roles", "Audit"]);
    }

    #[test]
    fn registry_rejects_duplicate_names() {
        let mut registry = Registry::new();
        assert!(registry.insert(table("Users")));
        assert!(!registry.insert(table("Users")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_registry_produces_same_fingerprint() {
        let a: Registry = ["Users", "Roles"].into_iter().map(table).collect();
        let b: Registry = ["Users", "Roles"].into_iter().map(table).collect();
        let c: Registry = ["Roles", "Users"].into_iter().map(table).collect();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_ne!(a.fingerprint(), Registry::new().fingerprint());
    }

    #[test]
    fn default_values_render_as_sql() {
        assert_eq!(DefaultValue::Text("it's".into()).to_sql(), "'it''s'");
        assert_eq!(DefaultValue::Boolean(true).to_sql(), "TRUE");
        assert_eq!(DefaultValue::Integer(-3).to_sql(), "-3");
        assert_eq!(DefaultValue::Number("0.50".into()).to_sql(), "0.50");
        assert_eq!(DefaultValue::Expression("now()".into()).to_sql(), "now()");
    }

    #[test]
    fn table_lookups() {
        let mut users = table("Users");
        let mut role = column("RoleId", LogicalType::Integer32);
        role.foreign_key = Some(ForeignKeyRef {
            table: "Roles".into(),
            column: "Id".into(),
        });
        users.columns[0].primary_key = true;
        users.columns.push(role);

        assert!(users.column("RoleId").is_some());
        assert!(users.column("roleid").is_none());
        assert_eq!(users.primary_key_columns().len(), 1);
        let fks: Vec<_> = users.foreign_key_columns().collect();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].1.table, "Roles");
    }
}
