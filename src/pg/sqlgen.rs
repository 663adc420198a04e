use crate::model::{ColumnDefinition, ForeignKeyRef, TableDefinition};
use crate::script::{foreign_key_name, primary_key_name, DdlStatement};

/// Renders statements as PostgreSQL DDL, qualifying tables with `schema`.
pub fn generate_sql(statements: &[DdlStatement], schema: &str) -> Vec<String> {
    statements
        .iter()
        .map(|statement| generate_statement_sql(statement, schema))
        .collect()
}

fn generate_statement_sql(statement: &DdlStatement, schema: &str) -> String {
    match statement {
        DdlStatement::CreateTable(table) => generate_create_table(schema, table),

        DdlStatement::AddColumn { table, column } => format!(
            "ALTER TABLE {} ADD COLUMN {};",
            quote_qualified(schema, table),
            format_column(column, ColumnClauses::Added)
        ),

        DdlStatement::DropConstraint { table, constraint } => format!(
            "ALTER TABLE {} DROP CONSTRAINT {};",
            quote_qualified(schema, table),
            quote_ident(constraint)
        ),

        DdlStatement::DropColumn { table, column } => format!(
            "ALTER TABLE {} DROP COLUMN {};",
            quote_qualified(schema, table),
            quote_ident(column)
        ),

        DdlStatement::AlterColumnType {
            table,
            column,
            data_type,
        } => {
            let column = quote_ident(column);
            format!(
                "ALTER TABLE {} ALTER COLUMN {column} TYPE {data_type} USING {column}::{data_type};",
                quote_qualified(schema, table),
            )
        }

        DdlStatement::AddUnique { table, column } => format!(
            "ALTER TABLE {} ADD UNIQUE ({});",
            quote_qualified(schema, table),
            quote_ident(column)
        ),

        DdlStatement::AddForeignKey {
            table,
            column,
            references,
        } => format!(
            "ALTER TABLE {} ADD {};",
            quote_qualified(schema, table),
            format_foreign_key(schema, table, column, references)
        ),

        DdlStatement::AddPrimaryKey { table, columns } => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({});",
            quote_qualified(schema, table),
            quote_ident(&primary_key_name(table)),
            format_column_list(columns)
        ),
    }
}

fn generate_create_table(schema: &str, table: &TableDefinition) -> String {
    let primary_keys: Vec<String> = table
        .primary_key_columns()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    let clauses = if primary_keys.len() == 1 {
        ColumnClauses::CreatedInlinePrimaryKey
    } else {
        ColumnClauses::Created
    };

    let mut definitions: Vec<String> = table
        .columns
        .iter()
        .map(|column| format_column(column, clauses))
        .collect();

    if primary_keys.len() > 1 {
        definitions.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            quote_ident(&primary_key_name(&table.name)),
            format_column_list(&primary_keys)
        ));
    }

    for (column, reference) in table.foreign_key_columns() {
        definitions.push(format_foreign_key(
            schema,
            &table.name,
            &column.name,
            reference,
        ));
    }

    format!(
        "CREATE TABLE {} (\n    {}\n);",
        quote_qualified(schema, &table.name),
        definitions.join(",\n    ")
    )
}

/// Which inline clauses a column definition may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnClauses {
    /// Inside `CREATE TABLE` where the primary key is a trailing constraint.
    Created,
    /// Inside `CREATE TABLE` with a single-column primary key.
    CreatedInlinePrimaryKey,
    /// `ADD COLUMN` on an existing table: no identity, no primary key.
    Added,
}

fn format_column(column: &ColumnDefinition, clauses: ColumnClauses) -> String {
    let mut parts = vec![quote_ident(&column.name), column.sql_type().to_string()];

    if !column.nullable {
        parts.push("NOT NULL".to_string());
    }

    if clauses != ColumnClauses::Added {
        if column.identity {
            parts.push("GENERATED BY DEFAULT AS IDENTITY".to_string());
        }
        if column.primary_key && clauses == ColumnClauses::CreatedInlinePrimaryKey {
            parts.push("PRIMARY KEY".to_string());
        }
    }

    if column.unique {
        parts.push("UNIQUE".to_string());
    }

    if let Some(ref default) = column.default {
        parts.push(format!("DEFAULT {}", default.to_sql()));
    }

    parts.join(" ")
}

fn format_foreign_key(schema: &str, table: &str, column: &str, reference: &ForeignKeyRef) -> String {
    format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_ident(&foreign_key_name(table, column)),
        quote_ident(column),
        quote_qualified(schema, &reference.table),
        quote_ident(&reference.column)
    )
}

fn format_column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

pub fn quote_qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DefaultValue, LogicalType, SqlType};

    fn column(name: &str, logical_type: LogicalType) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            logical_type,
            nullable: false,
            primary_key: false,
            identity: false,
            unique: false,
            default: None,
            foreign_key: None,
        }
    }

    fn users() -> TableDefinition {
        let mut id = column("Id", LogicalType::Integer32);
        id.primary_key = true;
        id.identity = true;
        let mut username = column("Username", LogicalType::Text(Some(50)));
        username.unique = true;
        let mut created = column("CreatedAt", LogicalType::Timestamp);
        created.default = Some(DefaultValue::Expression("now()".into()));
        TableDefinition {
            name: "Users".into(),
            columns: vec![id, username, created],
        }
    }

    #[test]
    fn create_table_generates_valid_sql() {
        let sql = generate_sql(&[DdlStatement::CreateTable(users())], "public");
        assert_eq!(sql.len(), 1);
        assert_eq!(
            sql[0],
            "CREATE TABLE \"public\".\"Users\" (\n    \
             \"Id\" INT NOT NULL GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,\n    \
             \"Username\" VARCHAR(50) NOT NULL UNIQUE,\n    \
             \"CreatedAt\" TIMESTAMP NOT NULL DEFAULT now()\n);"
        );
    }

    #[test]
    fn create_table_appends_foreign_keys_after_columns() {
        let mut user_id = column("UserId", LogicalType::Integer32);
        user_id.foreign_key = Some(ForeignKeyRef {
            table: "Users".into(),
            column: "Id".into(),
        });
        let mut role_id = column("RoleId", LogicalType::Integer32);
        role_id.foreign_key = Some(ForeignKeyRef {
            table: "Roles".into(),
            column: "Id".into(),
        });
        let table = TableDefinition {
            name: "UserRoles".into(),
            columns: vec![user_id, role_id, column("AssignedAt", LogicalType::Timestamp)],
        };

        let sql = generate_sql(&[DdlStatement::CreateTable(table)], "app");
        let lines: Vec<&str> = sql[0].lines().collect();
        assert_eq!(lines[0], "CREATE TABLE \"app\".\"UserRoles\" (");
        assert_eq!(lines[3], "    \"AssignedAt\" TIMESTAMP NOT NULL,");
        assert_eq!(
            lines[4],
            "    CONSTRAINT \"FK_UserRoles_UserId\" FOREIGN KEY (\"UserId\") REFERENCES \"app\".\"Users\" (\"Id\"),"
        );
        assert_eq!(
            lines[5],
            "    CONSTRAINT \"FK_UserRoles_RoleId\" FOREIGN KEY (\"RoleId\") REFERENCES \"app\".\"Roles\" (\"Id\")"
        );
        assert_eq!(lines[6], ");");
    }

    #[test]
    fn composite_primary_key_is_a_trailing_constraint() {
        let mut a = column("A", LogicalType::Integer32);
        a.primary_key = true;
        let mut b = column("B", LogicalType::Integer64);
        b.primary_key = true;
        let table = TableDefinition {
            name: "Pairs".into(),
            columns: vec![a, b],
        };

        let sql = generate_sql(&[DdlStatement::CreateTable(table)], "public");
        assert!(!sql[0].contains("NOT NULL PRIMARY KEY"));
        assert!(sql[0].contains("CONSTRAINT \"PK_Pairs\" PRIMARY KEY (\"A\", \"B\")"));
    }

    #[test]
    fn add_column_omits_identity_and_primary_key() {
        let mut id = column("Id", LogicalType::Integer64);
        id.primary_key = true;
        id.identity = true;
        let sql = generate_sql(
            &[DdlStatement::AddColumn {
                table: "Users".into(),
                column: id,
            }],
            "public",
        );
        assert_eq!(
            sql[0],
            "ALTER TABLE \"public\".\"Users\" ADD COLUMN \"Id\" BIGINT NOT NULL;"
        );
    }

    #[test]
    fn add_nullable_column_has_no_not_null() {
        let mut description = column("Description", LogicalType::Text(Some(256)));
        description.nullable = true;
        let sql = generate_sql(
            &[DdlStatement::AddColumn {
                table: "Roles".into(),
                column: description,
            }],
            "public",
        );
        assert_eq!(
            sql[0],
            "ALTER TABLE \"public\".\"Roles\" ADD COLUMN \"Description\" VARCHAR(256);"
        );
    }

    #[test]
    fn alter_statements_generate_valid_sql() {
        let statements = vec![
            DdlStatement::DropConstraint {
                table: "Users".into(),
                constraint: "UQ_Users_Legacy".into(),
            },
            DdlStatement::DropColumn {
                table: "Users".into(),
                column: "Legacy".into(),
            },
            DdlStatement::AlterColumnType {
                table: "Users".into(),
                column: "Balance".into(),
                data_type: SqlType::Decimal,
            },
            DdlStatement::AddForeignKey {
                table: "Posts".into(),
                column: "AuthorId".into(),
                references: ForeignKeyRef {
                    table: "Users".into(),
                    column: "Id".into(),
                },
            },
            DdlStatement::AddPrimaryKey {
                table: "Users".into(),
                columns: vec!["Id".into()],
            },
            DdlStatement::AddUnique {
                table: "Users".into(),
                column: "Username".into(),
            },
        ];

        assert_eq!(
            generate_sql(&statements, "public"),
            vec![
                "ALTER TABLE \"public\".\"Users\" DROP CONSTRAINT \"UQ_Users_Legacy\";",
                "ALTER TABLE \"public\".\"Users\" DROP COLUMN \"Legacy\";",
                "ALTER TABLE \"public\".\"Users\" ALTER COLUMN \"Balance\" TYPE DECIMAL(18,2) USING \"Balance\"::DECIMAL(18,2);",
                "ALTER TABLE \"public\".\"Posts\" ADD CONSTRAINT \"FK_Posts_AuthorId\" FOREIGN KEY (\"AuthorId\") REFERENCES \"public\".\"Users\" (\"Id\");",
                "ALTER TABLE \"public\".\"Users\" ADD CONSTRAINT \"PK_Users\" PRIMARY KEY (\"Id\");",
                "ALTER TABLE \"public\".\"Users\" ADD UNIQUE (\"Username\");",
            ]
        );
    }

    #[test]
    fn retype_casts_existing_values_explicitly() {
        let sql = generate_sql(
            &[
                DdlStatement::AlterColumnType {
                    table: "Flags".into(),
                    column: "Id".into(),
                    data_type: SqlType::Int,
                },
                DdlStatement::AlterColumnType {
                    table: "Flags".into(),
                    column: "Label".into(),
                    data_type: SqlType::Varchar(20),
                },
            ],
            "public",
        );
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE \"public\".\"Flags\" ALTER COLUMN \"Id\" TYPE INT USING \"Id\"::INT;",
                "ALTER TABLE \"public\".\"Flags\" ALTER COLUMN \"Label\" TYPE VARCHAR(20) USING \"Label\"::VARCHAR(20);",
            ]
        );
    }

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("simple"), "\"simple\"");
        assert_eq!(quote_ident("has\"quote"), "\"has\"\"quote\"");
    }
}
