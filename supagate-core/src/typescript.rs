//! TypeScript declaration rendering for `generate_types`.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::naming::snake_to_pascal;

/// Column description as returned by the `get_schema_information` function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    /// Postgres information_schema convention: `"YES"` or `"NO"`
    #[serde(default)]
    pub is_nullable: String,
}

impl ColumnInfo {
    pub fn is_nullable(&self) -> bool {
        self.is_nullable.eq_ignore_ascii_case("YES")
    }
}

/// Table description as returned by the `get_schema_information` function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub table_name: String,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

/// Map a Postgres type name to the TypeScript type used in generated declarations.
pub fn ts_type_for(pg_type: &str) -> &'static str {
    match pg_type.to_lowercase().as_str() {
        "integer" | "numeric" | "decimal" | "real" | "double precision" | "smallint"
        | "bigint" => "number",
        "text" | "character varying" | "character" | "varchar" | "char" | "uuid" | "date"
        | "time" | "timestamp" | "timestamptz" => "string",
        "boolean" => "boolean",
        "json" | "jsonb" => "Record<string, any>",
        "array" => "any[]",
        _ => "any",
    }
}

fn header(schema: &str) -> String {
    format!("// TypeScript types for schema: {}\n\n", schema)
}

/// Render one interface per table with fully described columns.
pub fn render_interfaces(schema: &str, tables: &[TableInfo]) -> String {
    let mut out = header(schema);
    for table in tables {
        let _ = writeln!(out, "export interface {} {{", snake_to_pascal(&table.table_name));
        for column in &table.columns {
            let optional = if column.is_nullable() { "?" } else { "" };
            let _ = writeln!(
                out,
                "  {}{}: {};",
                column.column_name,
                optional,
                ts_type_for(&column.data_type)
            );
        }
        out.push_str("}\n\n");
    }
    out
}

/// Render placeholder interfaces when only table names are known.
pub fn render_stub_interfaces(schema: &str, table_names: &[String]) -> String {
    let mut out = header(schema);
    for name in table_names {
        let _ = writeln!(out, "export interface {} {{", snake_to_pascal(name));
        out.push_str("  // Add your column definitions here\n");
        out.push_str("  id: string; // Assuming primary key\n");
        out.push_str("  created_at?: string; // Common timestamp field\n");
        out.push_str("}\n\n");
    }
    out
}
