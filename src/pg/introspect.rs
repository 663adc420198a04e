//! Read-only queries against the PostgreSQL catalog.
//!
//! Table and column names are always bound as query parameters. An absent
//! table yields `false` or empty results rather than an error.

use crate::model::{
    ConstraintKind, LiveColumnInfo, LiveSchemaSnapshot, LiveTableSnapshot, Registry,
};
use crate::pg::connection::PgConnection;
use crate::util::{Result, SchemaError};
use sqlx::Row;
use std::collections::{BTreeMap, BTreeSet};
use tracing::Instrument;

/// Constraint kinds that count as covering a column: primary key, unique,
/// foreign key, check and exclusion.
const COVERING_CONSTRAINT_TYPES: &str = "('p', 'u', 'f', 'c', 'x')";

pub struct PgCatalog<'a> {
    connection: &'a PgConnection,
    schema: String,
}

impl<'a> PgCatalog<'a> {
    pub fn new(connection: &'a PgConnection, schema: impl Into<String>) -> Self {
        Self {
            connection,
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2 AND table_type = 'BASE TABLE'
            ) AS present
            "#,
        )
        .bind(&self.schema)
        .bind(table_name)
        .fetch_one(self.connection.pool())
        .instrument(tracing::debug_span!("catalog.table_exists", table = table_name))
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to check table existence: {e}")))?;

        Ok(row.get("present"))
    }

    pub async fn columns(&self, table_name: &str) -> Result<Vec<LiveColumnInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT column_name::text AS column_name,
                   data_type::text AS data_type,
                   character_maximum_length::int4 AS character_maximum_length
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#,
        )
        .bind(&self.schema)
        .bind(table_name)
        .fetch_all(self.connection.pool())
        .instrument(tracing::debug_span!("catalog.columns", table = table_name))
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch columns: {e}")))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let max_length: Option<i32> = row.get("character_maximum_length");
            columns.push(LiveColumnInfo {
                name: row.get("column_name"),
                data_type: row.get("data_type"),
                max_length: max_length.and_then(|l| u32::try_from(l).ok()),
            });
        }

        Ok(columns)
    }

    pub async fn primary_key_columns(&self, table_name: &str) -> Result<BTreeSet<String>> {
        let rows = sqlx::query(
            r#"
            SELECT a.attname::text AS column_name
            FROM pg_index i
            JOIN pg_class c ON c.oid = i.indrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey)
            WHERE n.nspname = $1 AND c.relname = $2 AND i.indisprimary
            "#,
        )
        .bind(&self.schema)
        .bind(table_name)
        .fetch_all(self.connection.pool())
        .instrument(tracing::debug_span!("catalog.primary_key", table = table_name))
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch primary key: {e}")))?;

        Ok(rows.iter().map(|row| row.get("column_name")).collect())
    }

    /// Name of a constraint covering `table_name.column_name`, if any. When
    /// several do, the alphabetically first is returned.
    pub async fn constraint_covering(
        &self,
        table_name: &str,
        column_name: &str,
    ) -> Result<Option<String>> {
        let query = format!(
            r#"
            SELECT con.conname::text AS constraint_name
            FROM pg_constraint con
            JOIN pg_class c ON c.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(con.conkey)
            WHERE n.nspname = $1 AND c.relname = $2 AND a.attname = $3
              AND con.contype IN {COVERING_CONSTRAINT_TYPES}
            ORDER BY con.conname
            LIMIT 1
            "#
        );
        let row = sqlx::query(&query)
            .bind(&self.schema)
            .bind(table_name)
            .bind(column_name)
            .fetch_optional(self.connection.pool())
            .instrument(tracing::debug_span!(
                "catalog.constraint_covering",
                table = table_name,
                column = column_name
            ))
            .await
            .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch constraints: {e}")))?;

        Ok(row.map(|r| r.get("constraint_name")))
    }

    /// Column to covering-constraint lookup for a whole table, with the same
    /// tie-break as [`constraint_covering`](Self::constraint_covering).
    pub async fn constraints_by_column(&self, table_name: &str) -> Result<BTreeMap<String, String>> {
        let query = format!(
            r#"
            SELECT a.attname::text AS column_name, con.conname::text AS constraint_name
            FROM pg_constraint con
            JOIN pg_class c ON c.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(con.conkey)
            WHERE n.nspname = $1 AND c.relname = $2
              AND con.contype IN {COVERING_CONSTRAINT_TYPES}
            ORDER BY a.attname, con.conname
            "#
        );
        let rows = sqlx::query(&query)
            .bind(&self.schema)
            .bind(table_name)
            .fetch_all(self.connection.pool())
            .instrument(tracing::debug_span!("catalog.constraints", table = table_name))
            .await
            .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch constraints: {e}")))?;

        let mut constraints = BTreeMap::new();
        for row in rows {
            let column: String = row.get("column_name");
            let constraint: String = row.get("constraint_name");
            constraints.entry(column).or_insert(constraint);
        }

        Ok(constraints)
    }

    /// Kind of every covering constraint on the table, keyed by name.
    pub async fn constraint_kinds(
        &self,
        table_name: &str,
    ) -> Result<BTreeMap<String, ConstraintKind>> {
        let query = format!(
            r#"
            SELECT con.conname::text AS constraint_name, con.contype::text AS constraint_type
            FROM pg_constraint con
            JOIN pg_class c ON c.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2
              AND con.contype IN {COVERING_CONSTRAINT_TYPES}
            "#
        );
        let rows = sqlx::query(&query)
            .bind(&self.schema)
            .bind(table_name)
            .fetch_all(self.connection.pool())
            .instrument(tracing::debug_span!("catalog.constraint_kinds", table = table_name))
            .await
            .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch constraints: {e}")))?;

        let mut kinds = BTreeMap::new();
        for row in rows {
            let name: String = row.get("constraint_name");
            let code: String = row.get("constraint_type");
            if let Some(kind) = ConstraintKind::from_code(&code) {
                kinds.insert(name, kind);
            }
        }

        Ok(kinds)
    }

    pub async fn inspect_table(&self, table_name: &str) -> Result<LiveTableSnapshot> {
        if !self.table_exists(table_name).await? {
            return Ok(LiveTableSnapshot::absent(table_name));
        }

        Ok(LiveTableSnapshot {
            name: table_name.to_string(),
            exists: true,
            columns: self.columns(table_name).await?,
            primary_key_columns: self.primary_key_columns(table_name).await?,
            constraints: self.constraints_by_column(table_name).await?,
            constraint_kinds: self.constraint_kinds(table_name).await?,
        })
    }

    /// Fresh snapshot of every table the registry declares, in registry order.
    pub async fn inspect(&self, registry: &Registry) -> Result<LiveSchemaSnapshot> {
        let mut snapshot = LiveSchemaSnapshot::new();

        for table_name in registry.names() {
            let table = self.inspect_table(table_name).await?;
            tracing::debug!(
                table = table_name,
                exists = table.exists,
                columns = table.columns.len(),
                "inspected table"
            );
            snapshot.insert(table);
        }

        Ok(snapshot)
    }
}
