//! Machine-readable catalogue of the operations served under `/v1`.
//!
//! Each entry carries a JSON-schema style description of its request body so
//! that tool-calling clients can discover the gateway without documentation.

use serde::Serialize;
use serde_json::{Map, Value, json};

/// JSON-schema object describing a request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<&'static str>,
}

/// One operation of the gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: ParameterSchema,
}

impl OperationSpec {
    fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            parameters: ParameterSchema {
                kind: "object",
                properties: Map::new(),
                required: Vec::new(),
            },
        }
    }

    fn param(mut self, name: &str, schema: Value) -> Self {
        self.parameters.properties.insert(name.to_string(), schema);
        self
    }

    fn required(mut self, names: &[&'static str]) -> Self {
        self.parameters.required.extend_from_slice(names);
        self
    }
}

/// The full operation catalogue, built once at startup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Specification {
    pub functions: Vec<OperationSpec>,
}

fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn boolean(description: &str) -> Value {
    json!({ "type": "boolean", "description": description })
}

fn integer(description: &str) -> Value {
    json!({ "type": "integer", "description": description })
}

fn one_of(values: &[&str], description: &str) -> Value {
    json!({ "type": "string", "enum": values, "description": description })
}

const SCHEMA_PUBLIC: &str = "Database schema (optional, defaults to public)";
const POLICY_DEFINITION: &str = "Policy definition (using expression syntax)";
const CHECK_EXPRESSION: &str = "Optional check expression for INSERT/UPDATE operations";
const POLICY_COMMANDS: [&str; 5] = ["SELECT", "INSERT", "UPDATE", "DELETE", "ALL"];

fn column_schema(with_constraints: bool) -> Value {
    let mut properties = json!({
        "name": string("Column name"),
        "type": string("Column data type"),
        "nullable": boolean("Whether the column can be null (optional, defaults to true)"),
        "default_value": string("Default value (optional)"),
    });
    if with_constraints {
        properties["primary_key"] =
            boolean("Whether the column is a primary key (optional, defaults to false)");
        properties["unique"] =
            boolean("Whether the column value must be unique (optional, defaults to false)");
        properties["references"] = json!({
            "type": "object",
            "properties": {
                "schema": string("Referenced schema (optional)"),
                "table": string("Referenced table"),
                "column": string("Referenced column"),
            },
            "description": "Foreign key reference (optional)",
        });
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": ["name", "type"],
    })
}

fn table_operations() -> Vec<OperationSpec> {
    vec![
        OperationSpec::new(
            "query_table",
            "Query a specific table with schema selection and where clause support",
        )
        .param("schema", string(SCHEMA_PUBLIC))
        .param("table", string("Name of the table to query"))
        .param(
            "select",
            string("Comma-separated list of columns to select (optional, defaults to *)"),
        )
        .param(
            "where",
            json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "column": string("Column name"),
                        "operator": one_of(
                            &["eq", "neq", "gt", "gte", "lt", "lte", "like", "ilike", "is"],
                            "Comparison operator",
                        ),
                        "value": { "type": "any", "description": "Value to compare against" },
                    },
                    "required": ["column", "operator", "value"],
                },
                "description": "Array of where conditions (optional)",
            }),
        )
        .param("limit", integer("Maximum number of rows to return (optional)"))
        .required(&["table"]),
        OperationSpec::new(
            "generate_types",
            "Generate TypeScript types for your Supabase database schema",
        )
        .param("schema", string(SCHEMA_PUBLIC)),
        OperationSpec::new("list_tables", "List all tables in a specific schema")
            .param("schema", string(SCHEMA_PUBLIC)),
        OperationSpec::new("create_table", "Create a new table")
            .param("schema", string("Schema name (optional, defaults to public)"))
            .param("name", string("Table name"))
            .param(
                "columns",
                json!({ "type": "array", "items": column_schema(true), "description": "Table columns" }),
            )
            .param(
                "enable_rls",
                boolean("Whether to enable RLS on the table (optional, defaults to false)"),
            )
            .required(&["name", "columns"]),
        OperationSpec::new("alter_table", "Alter a table (add/drop columns, rename)")
            .param("schema", string("Schema name (optional, defaults to public)"))
            .param("name", string("Table name"))
            .param("new_name", string("New table name (optional)"))
            .param(
                "add_columns",
                json!({ "type": "array", "items": column_schema(false), "description": "Columns to add (optional)" }),
            )
            .param(
                "drop_columns",
                json!({
                    "type": "array",
                    "items": string("Column name to drop"),
                    "description": "Columns to drop (optional)",
                }),
            )
            .param("enable_rls", boolean("Whether to enable RLS on the table (optional)"))
            .required(&["name"]),
        OperationSpec::new("drop_table", "Drop a table")
            .param("schema", string("Schema name (optional, defaults to public)"))
            .param("name", string("Table name"))
            .param(
                "cascade",
                boolean("Whether to cascade the deletion (optional, defaults to false)"),
            )
            .required(&["name"]),
    ]
}

fn database_operations() -> Vec<OperationSpec> {
    vec![
        OperationSpec::new("execute_query", "Execute a raw SQL query (with security restrictions)")
            .param("query", string("SQL query to execute (read-only operations only)"))
            .required(&["query"]),
        OperationSpec::new("get_database_schema", "Get database schema")
            .param("schema", string("Schema name (optional, defaults to all schemas)")),
        OperationSpec::new("create_schema", "Create a new schema")
            .param("name", string("Schema name"))
            .required(&["name"]),
        OperationSpec::new("delete_schema", "Delete a schema")
            .param("name", string("Schema name"))
            .param(
                "cascade",
                boolean("Whether to cascade the deletion (optional, defaults to false)"),
            )
            .required(&["name"]),
    ]
}

fn policy_operations() -> Vec<OperationSpec> {
    vec![
        OperationSpec::new("get_rls_policies", "Get RLS policies for a table or all tables")
            .param("schema", string(SCHEMA_PUBLIC))
            .param(
                "table",
                string("Table name (optional, if not provided returns policies for all tables)"),
            ),
        OperationSpec::new("create_rls_policy", "Create a new RLS policy")
            .param("schema", string(SCHEMA_PUBLIC))
            .param("table", string("Table name"))
            .param("name", string("Policy name"))
            .param(
                "operation",
                one_of(&POLICY_COMMANDS, "Operation type that the policy applies to"),
            )
            .param("definition", string(POLICY_DEFINITION))
            .param("check", string(CHECK_EXPRESSION))
            .param("role", string("Optional role name (defaults to public)"))
            .param(
                "permissive",
                boolean("Whether the policy is permissive (optional, defaults to true)"),
            )
            .required(&["table", "name", "operation", "definition"]),
        OperationSpec::new("update_rls_policy", "Update an existing RLS policy")
            .param("schema", string(SCHEMA_PUBLIC))
            .param("table", string("Table name"))
            .param("name", string("Policy name"))
            .param(
                "operation",
                one_of(&POLICY_COMMANDS, "Operation type that the policy applies to"),
            )
            .param("definition", string(POLICY_DEFINITION))
            .param("check", string(CHECK_EXPRESSION))
            .param("role", string("Optional role name"))
            .required(&["table", "name", "definition"]),
        OperationSpec::new("delete_rls_policy", "Delete an RLS policy")
            .param("schema", string(SCHEMA_PUBLIC))
            .param("table", string("Table name"))
            .param("name", string("Policy name"))
            .required(&["table", "name"]),
    ]
}

fn storage_operations() -> Vec<OperationSpec> {
    let mime_types = json!({
        "type": "array",
        "items": { "type": "string" },
        "description": "Allowed MIME types (optional)",
    });

    vec![
        OperationSpec::new("get_buckets", "Get all storage buckets or a specific one")
            .param("id", string("Bucket ID (optional, if not provided returns all buckets)")),
        OperationSpec::new("create_bucket", "Create a new storage bucket")
            .param("id", string("Bucket ID"))
            .param("name", string("Bucket name (optional, defaults to ID)"))
            .param(
                "public",
                boolean("Whether the bucket is public (optional, defaults to false)"),
            )
            .param("file_size_limit", integer("File size limit in bytes (optional)"))
            .param("allowed_mime_types", mime_types.clone())
            .required(&["id"]),
        OperationSpec::new("update_bucket", "Update a storage bucket")
            .param("id", string("Bucket ID"))
            .param("public", boolean("Whether the bucket is public (optional)"))
            .param(
                "file_size_limit",
                integer("File size limit in bytes (optional, null removes the limit)"),
            )
            .param("allowed_mime_types", mime_types)
            .required(&["id"]),
        OperationSpec::new("delete_bucket", "Delete a storage bucket")
            .param("id", string("Bucket ID"))
            .required(&["id"]),
        OperationSpec::new("get_bucket_policies", "Get policies for a storage bucket")
            .param("bucket_id", string("Bucket ID"))
            .required(&["bucket_id"]),
        OperationSpec::new("create_bucket_policy", "Create a new policy for a storage bucket")
            .param("bucket_id", string("Bucket ID"))
            .param("name", string("Policy name"))
            .param(
                "operation",
                one_of(&["SELECT", "INSERT", "UPDATE", "DELETE"], "Operation type"),
            )
            .param("definition", string(POLICY_DEFINITION))
            .param("role", string("Optional role name (defaults to authenticated)"))
            .required(&["bucket_id", "name", "operation", "definition"]),
        OperationSpec::new("update_bucket_policy", "Update a policy for a storage bucket")
            .param("bucket_id", string("Bucket ID"))
            .param("name", string("Policy name"))
            .param("definition", string(POLICY_DEFINITION))
            .required(&["bucket_id", "name", "definition"]),
        OperationSpec::new("delete_bucket_policy", "Delete a policy for a storage bucket")
            .param("bucket_id", string("Bucket ID"))
            .param("name", string("Policy name"))
            .required(&["bucket_id", "name"]),
    ]
}

fn edge_function_operations() -> Vec<OperationSpec> {
    let import_map = json!({
        "type": "object",
        "additionalProperties": { "type": "string" },
        "description": "Optional import map for the function",
    });

    vec![
        OperationSpec::new("get_edge_functions", "Get all edge functions or a specific one").param(
            "name",
            string("Function name (optional, if not provided returns all functions)"),
        ),
        OperationSpec::new("create_edge_function", "Create a new edge function")
            .param("name", string("Function name"))
            .param("code", string("Function code (JavaScript/TypeScript)"))
            .param(
                "verify_jwt",
                boolean("Whether to verify JWT (optional, defaults to false)"),
            )
            .param("import_map", import_map.clone())
            .required(&["name", "code"]),
        OperationSpec::new("update_edge_function", "Update an existing edge function")
            .param("name", string("Function name"))
            .param("code", string("Function code (JavaScript/TypeScript)"))
            .param("verify_jwt", boolean("Whether to verify JWT (optional)"))
            .param("import_map", import_map)
            .required(&["name", "code"]),
        OperationSpec::new("delete_edge_function", "Delete an edge function")
            .param("name", string("Function name"))
            .required(&["name"]),
        OperationSpec::new("deploy_edge_function", "Deploy an edge function")
            .param("name", string("Function name"))
            .required(&["name"]),
    ]
}

impl Specification {
    /// Catalogue of every operation the router serves
    pub fn standard() -> Self {
        let mut functions = table_operations();
        functions.extend(database_operations());
        functions.extend(policy_operations());
        functions.extend(edge_function_operations());
        functions.extend(storage_operations());
        Self { functions }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.functions.iter().find(|f| f.name == name)
    }

    #[cfg(test)]
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.iter().map(|f| f.name)
    }
}
