//! Declarative entity descriptors and the canonical model builder.
//!
//! Descriptors mirror what an application declares about its persisted
//! entities: a table designation plus ordered fields, some of which carry a
//! column designation. They can be written in code or loaded from JSON files
//! (see [`loader`]). [`build_registry`] turns them into the immutable
//! [`Registry`] the rest of the pipeline works from.

pub mod loader;

pub use loader::load_descriptor_sources;

use crate::model::{
    ColumnDefinition, DefaultValue, ForeignKeyRef, LogicalType, Registry, TableDefinition,
};
use crate::util::{Result, SchemaError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntityDescriptor {
    /// Entity name, used in diagnostics only.
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub column: Option<ColumnDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub length: Option<u32>,
    /// JSON literal, or `{"expression": "..."}` for a raw SQL expression.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub identity: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub foreign_key: Option<ForeignKeyDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKeyDescriptor {
    pub table: String,
    pub column: String,
}

fn default_nullable() -> bool {
    true
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

impl FieldDescriptor {
    /// A field persisted as `column`.
    pub fn column(
        name: impl Into<String>,
        type_name: impl Into<String>,
        column: ColumnDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            column: Some(column),
        }
    }

    /// A field with no column designation; invisible to the schema.
    pub fn transient(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            column: None,
        }
    }
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: true,
            length: None,
            default: None,
            primary_key: false,
            identity: false,
            unique: false,
            foreign_key: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyDescriptor {
            table: table.into(),
            column: column.into(),
        });
        self
    }
}

/// An entity that could not be turned into a table. The entity is skipped;
/// the rest of the run proceeds.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("Entity {entity}: {message}")]
pub struct ConfigurationError {
    pub entity: String,
    pub message: String,
}

impl ConfigurationError {
    fn new(entity: &str, message: impl Into<String>) -> Self {
        Self {
            entity: entity.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub registry: Registry,
    pub rejected: Vec<ConfigurationError>,
}

/// Builds the canonical registry from entity descriptors.
///
/// Malformed entities are collected in [`BuildOutput::rejected`]; a field type
/// with no SQL mapping aborts the whole build.
pub fn build_registry(descriptors: &[EntityDescriptor]) -> Result<BuildOutput> {
    let mut output = BuildOutput::default();

    for entity in descriptors {
        match build_table(entity, &output.registry)? {
            Ok(table) => {
                tracing::debug!(
                    table = %table.name,
                    columns = table.columns.len(),
                    "built table definition"
                );
                output.registry.insert(table);
            }
            Err(err) => {
                tracing::warn!(entity = %err.entity, "skipping entity: {}", err.message);
                output.rejected.push(err);
            }
        }
    }

    tracing::info!(
        tables = output.registry.len(),
        rejected = output.rejected.len(),
        fingerprint = %output.registry.fingerprint(),
        "built declared model"
    );

    Ok(output)
}

fn build_table(
    entity: &EntityDescriptor,
    registry: &Registry,
) -> Result<std::result::Result<TableDefinition, ConfigurationError>> {
    let table_name = match entity.table.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Ok(Err(ConfigurationError::new(
                &entity.name,
                "missing table designation",
            )))
        }
    };

    // Types are resolved for every column before any entity-level check so an
    // unsupported type is fatal wherever it appears.
    let typed = entity
        .fields
        .iter()
        .filter_map(|field| field.column.as_ref().map(|column| (field, column)))
        .map(|(field, column)| {
            parse_logical_type(&field.type_name, column.length)
                .map(|logical_type| (column, logical_type))
                .ok_or_else(|| SchemaError::UnsupportedType {
                    table: table_name.clone(),
                    field: field.name.clone(),
                    type_name: field.type_name.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    if registry.contains(&table_name) {
        return Ok(Err(ConfigurationError::new(
            &entity.name,
            format!("table \"{table_name}\" is already declared by another entity"),
        )));
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for (column, logical_type) in typed {
        if !seen.insert(column.name.clone()) {
            return Ok(Err(ConfigurationError::new(
                &entity.name,
                format!("duplicate column \"{}\"", column.name),
            )));
        }

        if column.length == Some(0) {
            return Ok(Err(ConfigurationError::new(
                &entity.name,
                format!("column \"{}\" declares a zero length", column.name),
            )));
        }

        if column.identity && !logical_type.is_integer() {
            return Ok(Err(ConfigurationError::new(
                &entity.name,
                format!("identity column \"{}\" must be an integer", column.name),
            )));
        }

        let default = match &column.default {
            Some(value) => match convert_default(value) {
                Some(default) => Some(default),
                None => {
                    return Ok(Err(ConfigurationError::new(
                        &entity.name,
                        format!("column \"{}\" has an unusable default {value}", column.name),
                    )))
                }
            },
            None => None,
        };

        columns.push(ColumnDefinition {
            name: column.name.clone(),
            logical_type,
            nullable: column.nullable,
            primary_key: column.primary_key,
            identity: column.identity,
            unique: column.unique,
            default,
            foreign_key: column.foreign_key.as_ref().map(|fk| ForeignKeyRef {
                table: fk.table.clone(),
                column: fk.column.clone(),
            }),
        });
    }

    Ok(Ok(TableDefinition {
        name: table_name,
        columns,
    }))
}

/// Parses a field type name such as `int32`, `string?` or `Option<datetime>`.
/// `length` only applies to text types.
pub fn parse_logical_type(type_name: &str, length: Option<u32>) -> Option<LogicalType> {
    let wrapped = Regex::new(r"^\s*(?:Option\s*<\s*(?P<opt>[A-Za-z0-9_]+)\s*>|(?P<base>[A-Za-z0-9_]+)\s*(?P<q>\?)?)\s*$")
        .expect("static regex");
    let caps = wrapped.captures(type_name)?;

    let (base, optional) = match (caps.name("opt"), caps.name("base")) {
        (Some(inner), _) => (inner.as_str(), true),
        (None, Some(base)) => (base.as_str(), caps.name("q").is_some()),
        (None, None) => return None,
    };

    let logical = match base.to_ascii_lowercase().as_str() {
        "int" | "int32" | "integer" | "i32" => LogicalType::Integer32,
        "long" | "int64" | "bigint" | "i64" => LogicalType::Integer64,
        "string" | "text" => LogicalType::Text(length),
        "bool" | "boolean" => LogicalType::Boolean,
        "decimal" => LogicalType::Decimal,
        "datetime" | "timestamp" => LogicalType::Timestamp,
        _ => return None,
    };

    Some(if optional {
        LogicalType::nullable(logical)
    } else {
        logical
    })
}

fn convert_default(value: &serde_json::Value) -> Option<DefaultValue> {
    match value {
        serde_json::Value::Bool(b) => Some(DefaultValue::Boolean(*b)),
        serde_json::Value::Number(n) => Some(match n.as_i64() {
            Some(i) => DefaultValue::Integer(i),
            None => DefaultValue::Number(n.to_string()),
        }),
        serde_json::Value::String(s) => Some(DefaultValue::Text(s.clone())),
        serde_json::Value::Object(map) if map.len() == 1 => map
            .get("expression")
            .and_then(|e| e.as_str())
            .map(|e| DefaultValue::Expression(e.to_string())),
        _ => None,
    }
}
