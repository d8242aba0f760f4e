//! Request and response shapes for the resources managed through the gateway.
//!
//! Nothing here is persisted by Supagate itself; these types only describe what
//! goes to and comes back from the Supabase backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{GatewayError, Result};

/// A column of an existing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub not_null: bool,
    /// Default expression as reported by Postgres, passed through untouched
    pub default_value: Option<String>,
}

/// Target of a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references: ForeignKeyReference,
}

/// Columns and key constraints of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<DatabaseColumn>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

/// schema name -> table name -> table schema
pub type SchemaData = BTreeMap<String, BTreeMap<String, TableSchema>>;

/// One flat row of the catalog query behind `get_database_schema`.
///
/// A column bound by several constraints shows up once per constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaRow {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub reference_schema: Option<String>,
    pub reference_table: Option<String>,
    pub reference_column: Option<String>,
}

impl TableSchema {
    fn absorb(&mut self, row: SchemaRow) {
        if !self.columns.iter().any(|c| c.name == row.column_name) {
            self.columns.push(DatabaseColumn {
                name: row.column_name.clone(),
                data_type: row.data_type,
                not_null: row.not_null,
                default_value: row.default_value,
            });
        }

        if row.is_primary_key && !self.primary_keys.contains(&row.column_name) {
            self.primary_keys.push(row.column_name.clone());
        }

        if row.is_foreign_key {
            let foreign_key = ForeignKey {
                column: row.column_name,
                references: ForeignKeyReference {
                    schema: row.reference_schema,
                    table: row.reference_table.unwrap_or_default(),
                    column: row.reference_column.unwrap_or_default(),
                },
            };
            if !self.foreign_keys.contains(&foreign_key) {
                self.foreign_keys.push(foreign_key);
            }
        }
    }
}

/// Group flat catalog rows into per-schema, per-table structures.
pub fn group_schema_rows(rows: impl IntoIterator<Item = SchemaRow>) -> SchemaData {
    let mut data = SchemaData::new();
    for row in rows {
        data.entry(row.schema_name.clone())
            .or_default()
            .entry(row.table_name.clone())
            .or_default()
            .absorb(row);
    }
    data
}

/// Command an RLS policy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyCommand {
    Select,
    Insert,
    Update,
    Delete,
    All,
}

impl PolicyCommand {
    pub fn as_sql(&self) -> &'static str {
        match self {
            PolicyCommand::Select => "SELECT",
            PolicyCommand::Insert => "INSERT",
            PolicyCommand::Update => "UPDATE",
            PolicyCommand::Delete => "DELETE",
            PolicyCommand::All => "ALL",
        }
    }

    /// Whether a `WITH CHECK` clause is meaningful for this command
    pub fn accepts_check(&self) -> bool {
        matches!(
            self,
            PolicyCommand::Insert | PolicyCommand::Update | PolicyCommand::All
        )
    }
}

impl std::fmt::Display for PolicyCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl std::str::FromStr for PolicyCommand {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "SELECT" => Ok(PolicyCommand::Select),
            "INSERT" => Ok(PolicyCommand::Insert),
            "UPDATE" => Ok(PolicyCommand::Update),
            "DELETE" => Ok(PolicyCommand::Delete),
            "ALL" => Ok(PolicyCommand::All),
            _ => Err(GatewayError::validation(format!(
                "Invalid operation: {}. Must be SELECT, INSERT, UPDATE, DELETE, or ALL",
                s
            ))),
        }
    }
}

/// Row-level security policy as reported by the `pg_policy` catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlsPolicy {
    pub schema_name: String,
    pub table_name: String,
    pub policy_name: String,
    /// `PERMISSIVE` or `RESTRICTIVE`
    pub policy_type: String,
    pub command: String,
    pub expression: Option<String>,
    pub check_expression: Option<String>,
    #[serde(default, deserialize_with = "deserialize_roles")]
    pub roles: Vec<String>,
}

/// Roles arrive either as a JSON array or as a Postgres array literal (`{a,b}`).
fn deserialize_roles<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Roles {
        List(Vec<String>),
        Literal(String),
        Missing(Option<()>),
    }

    Ok(match Roles::deserialize(deserializer)? {
        Roles::List(roles) => roles,
        Roles::Literal(literal) => literal
            .trim_start_matches('{')
            .trim_end_matches('}')
            .split(',')
            .map(|role| role.trim().trim_matches('"').to_string())
            .filter(|role| !role.is_empty())
            .collect(),
        Roles::Missing(_) => Vec::new(),
    })
}

/// Row of `storage.buckets`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
    pub file_size_limit: Option<i64>,
    pub allowed_mime_types: Option<Vec<String>>,
}

/// Operation a storage policy governs, stored as a numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BucketOperation {
    Select,
    Insert,
    Update,
    Delete,
}

impl BucketOperation {
    pub fn code(&self) -> i32 {
        match self {
            BucketOperation::Select => 10,
            BucketOperation::Insert => 20,
            BucketOperation::Update => 40,
            BucketOperation::Delete => 80,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            10 => Some(BucketOperation::Select),
            20 => Some(BucketOperation::Insert),
            40 => Some(BucketOperation::Update),
            80 => Some(BucketOperation::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BucketOperation::Select => "SELECT",
            BucketOperation::Insert => "INSERT",
            BucketOperation::Update => "UPDATE",
            BucketOperation::Delete => "DELETE",
        }
    }
}

impl std::str::FromStr for BucketOperation {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SELECT" => Ok(BucketOperation::Select),
            "INSERT" => Ok(BucketOperation::Insert),
            "UPDATE" => Ok(BucketOperation::Update),
            "DELETE" => Ok(BucketOperation::Delete),
            _ => Err(GatewayError::validation(
                "Invalid operation. Must be SELECT, INSERT, UPDATE, or DELETE",
            )),
        }
    }
}

/// Row of `storage.policies`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPolicy {
    pub bucket_id: String,
    pub name: String,
    pub operation: BucketOperation,
    pub definition: String,
    pub role: String,
}

/// Row of the `edge_functions` catalog table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFunction {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub verify_jwt: bool,
    #[serde(default)]
    pub import_map: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(table: &str, column: &str) -> SchemaRow {
        SchemaRow {
            schema_name: "public".to_string(),
            table_name: table.to_string(),
            column_name: column.to_string(),
            data_type: "integer".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_group_schema_rows_nests_by_schema_and_table() {
        let rows = vec![row("users", "id"), row("users", "email"), row("posts", "id")];
        let data = group_schema_rows(rows);

        let public = &data["public"];
        assert_eq!(public.len(), 2);
        assert_eq!(public["users"].columns.len(), 2);
        assert_eq!(public["users"].columns[1].name, "email");
        assert_eq!(public["posts"].columns.len(), 1);
    }

    #[test]
    fn test_group_schema_rows_deduplicates_constraint_rows() {
        let primary = SchemaRow {
            is_primary_key: true,
            ..row("posts", "author_id")
        };
        let foreign = SchemaRow {
            is_foreign_key: true,
            reference_schema: Some("public".to_string()),
            reference_table: Some("users".to_string()),
            reference_column: Some("id".to_string()),
            ..row("posts", "author_id")
        };

        let data = group_schema_rows(vec![primary.clone(), foreign.clone(), primary, foreign]);
        let posts = &data["public"]["posts"];

        assert_eq!(posts.columns.len(), 1);
        assert_eq!(posts.primary_keys, vec!["author_id".to_string()]);
        assert_eq!(posts.foreign_keys.len(), 1);
        assert_eq!(posts.foreign_keys[0].references.table, "users");
        assert_eq!(posts.foreign_keys[0].references.schema.as_deref(), Some("public"));
    }

    #[test]
    fn test_schema_row_tolerates_nulls() {
        let row: SchemaRow = serde_json::from_str(
            r#"{"schema_name":"public","table_name":"t","column_name":"c","data_type":"text",
                "not_null":false,"default_value":null,"is_primary_key":false,
                "is_foreign_key":false,"reference_schema":null,"reference_table":null,
                "reference_column":null}"#,
        )
        .unwrap();
        assert_eq!(row.default_value, None);
    }

    #[test]
    fn test_policy_command_parsing() {
        assert_eq!("select".parse::<PolicyCommand>().unwrap(), PolicyCommand::Select);
        assert_eq!("ALL".parse::<PolicyCommand>().unwrap(), PolicyCommand::All);
        assert!("TRUNCATE".parse::<PolicyCommand>().is_err());
        assert!(PolicyCommand::Update.accepts_check());
        assert!(!PolicyCommand::Delete.accepts_check());
    }

    #[test]
    fn test_rls_policy_roles_formats() {
        let base = r#""schema_name":"public","table_name":"posts","policy_name":"owner",
            "policy_type":"PERMISSIVE","command":"ALL","expression":"true","check_expression":null"#;

        let from_array: RlsPolicy =
            serde_json::from_str(&format!(r#"{{{}, "roles":["anon","authenticated"]}}"#, base))
                .unwrap();
        assert_eq!(from_array.roles, vec!["anon", "authenticated"]);

        let from_literal: RlsPolicy =
            serde_json::from_str(&format!(r#"{{{}, "roles":"{{anon,authenticated}}"}}"#, base))
                .unwrap();
        assert_eq!(from_literal.roles, vec!["anon", "authenticated"]);

        let from_null: RlsPolicy =
            serde_json::from_str(&format!(r#"{{{}, "roles":null}}"#, base)).unwrap();
        assert!(from_null.roles.is_empty());
    }

    #[test]
    fn test_bucket_operation_codes() {
        assert_eq!("SELECT".parse::<BucketOperation>().unwrap().code(), 10);
        assert_eq!("DELETE".parse::<BucketOperation>().unwrap().code(), 80);
        assert_eq!(BucketOperation::from_code(40), Some(BucketOperation::Update));
        assert_eq!(BucketOperation::from_code(30), None);
        assert!("ALL".parse::<BucketOperation>().is_err());
    }
}
