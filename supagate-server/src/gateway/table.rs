//! Table reads, listing, DDL and TypeScript generation

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use supagate_core::{
    GatewayError, Result, TableInfo, qualified_name, quote_ident, quote_literal,
    render_interfaces, render_stub_interfaces, schema_or_default,
};

use crate::gateway::client::{
    Backend, Filter, FilterOperator, SelectRequest, decode_rows, execute_sql,
};
use crate::gateway::response::{MutationResponse, require};

/// Tables probed when neither the RPC nor the catalog can list a schema
pub const COMMON_TABLES: [&str; 6] = ["profiles", "products", "users", "categories", "orders", "items"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhereCondition {
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryTableRequest {
    pub schema: String,
    pub table: String,
    pub select: String,
    #[serde(rename = "where")]
    pub conditions: Vec<WhereCondition>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchemaRequest {
    pub schema: String,
}

/// Foreign key target of a new column
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColumnReference {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
}

/// Column of a table being created or altered
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: Option<bool>,
    pub default_value: Option<String>,
    pub primary_key: bool,
    pub unique: bool,
    pub references: Option<ColumnReference>,
}

impl ColumnDefinition {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.data_type.trim().is_empty() {
            return Err(GatewayError::validation("Each column requires a name and a type"));
        }
        if let Some(reference) = &self.references {
            if reference.table.trim().is_empty() || reference.column.trim().is_empty() {
                return Err(GatewayError::validation(format!(
                    "Reference of column '{}' requires a table and a column",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// `"name" type [NOT NULL] [DEFAULT expr]`
    pub fn base_clause(&self) -> String {
        let mut clause = format!("{} {}", quote_ident(&self.name), self.data_type);
        if self.nullable == Some(false) {
            clause.push_str(" NOT NULL");
        }
        if let Some(default) = self.default_value.as_deref().filter(|d| !d.is_empty()) {
            clause.push_str(&format!(" DEFAULT {}", default));
        }
        clause
    }

    /// Full column clause including key constraints
    pub fn clause(&self) -> String {
        let mut clause = self.base_clause();
        if self.primary_key {
            clause.push_str(" PRIMARY KEY");
        }
        if self.unique {
            clause.push_str(" UNIQUE");
        }
        if let Some(reference) = &self.references {
            let target = match reference.schema.as_deref().filter(|s| !s.is_empty()) {
                Some(schema) => qualified_name(schema, &reference.table),
                None => quote_ident(&reference.table),
            };
            clause.push_str(&format!(
                " REFERENCES {} ({})",
                target,
                quote_ident(&reference.column)
            ));
        }
        clause
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateTableRequest {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub enable_rls: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlterTableRequest {
    pub schema: String,
    pub name: String,
    pub new_name: String,
    pub add_columns: Vec<ColumnDefinition>,
    pub drop_columns: Vec<String>,
    pub enable_rls: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DropTableRequest {
    pub schema: String,
    pub name: String,
    pub cascade: bool,
}

/// Outcome of one statement of a multi-statement change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlterTableResponse {
    pub success: bool,
    pub operations: Vec<OperationOutcome>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypesResponse {
    pub types: String,
}

/// Result of one table-listing strategy
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Found(Value),
    Next(String),
}

/// Ways of listing the tables of a schema, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStrategy {
    /// Dedicated `list_tables` RPC function
    Rpc,
    /// `pg_tables` through `execute_sql`
    Catalog,
    /// One-row PostgREST reads of well-known table names. Reached only once
    /// `execute_sql` has failed, so the probe must not depend on it.
    ProbeCommonTables,
}

impl ListingStrategy {
    pub const CHAIN: [ListingStrategy; 3] = [
        ListingStrategy::Rpc,
        ListingStrategy::Catalog,
        ListingStrategy::ProbeCommonTables,
    ];

    pub async fn attempt(self, backend: &dyn Backend, schema: &str) -> Attempt {
        match self {
            ListingStrategy::Rpc => {
                match backend.invoke("list_tables", json!({ "p_schema": schema })).await {
                    Ok(Value::Null) => Attempt::Next("list_tables returned no data".to_string()),
                    Ok(tables) => Attempt::Found(tables),
                    Err(e) => Attempt::Next(e.to_string()),
                }
            }
            ListingStrategy::Catalog => match execute_sql(backend, &pg_tables_query(schema, "table_name")).await {
                Ok(Value::Null) => Attempt::Found(json!([])),
                Ok(tables) => Attempt::Found(tables),
                Err(e) => Attempt::Next(e.to_string()),
            },
            ListingStrategy::ProbeCommonTables => {
                let mut found = Vec::new();
                for table in COMMON_TABLES {
                    let probe = SelectRequest::new(schema, table).with_limit(1);
                    if backend.select_rows(&probe).await.is_ok() {
                        found.push(json!({ "table_name": table }));
                    }
                }
                Attempt::Found(Value::Array(found))
            }
        }
    }
}

fn pg_tables_query(schema: &str, alias: &str) -> String {
    format!(
        "SELECT tablename AS {} FROM pg_tables WHERE schemaname = {}",
        alias,
        quote_literal(schema)
    )
}

/// Build the `CREATE TABLE` statement, with the RLS switch appended when requested
pub fn create_table_sql(request: &CreateTableRequest) -> Result<String> {
    if request.name.trim().is_empty() || request.columns.is_empty() {
        return Err(GatewayError::validation("Table name and columns are required"));
    }

    let mut seen = HashSet::new();
    for column in &request.columns {
        column.validate()?;
        if !seen.insert(column.name.as_str()) {
            return Err(GatewayError::validation(format!(
                "Duplicate column name: {}",
                column.name
            )));
        }
    }

    let table = qualified_name(schema_or_default(&request.schema), &request.name);
    let columns: Vec<String> = request
        .columns
        .iter()
        .map(|column| format!("  {}", column.clause()))
        .collect();

    let mut sql = format!("CREATE TABLE {} (\n{}\n)", table, columns.join(",\n"));
    if request.enable_rls {
        sql.push_str(&format!(";\nALTER TABLE {} ENABLE ROW LEVEL SECURITY", table));
    }
    Ok(sql)
}

/// Statements of an `alter_table` request, in execution order.
///
/// Statements after a rename address the table by its new name.
pub fn alter_table_statements(request: &AlterTableRequest) -> Result<Vec<String>> {
    require(&request.name, "Table name is required")?;
    for column in &request.add_columns {
        column.validate()?;
    }

    let schema = schema_or_default(&request.schema);
    let mut table = qualified_name(schema, &request.name);
    let mut statements = Vec::new();

    if !request.new_name.trim().is_empty() {
        statements.push(format!(
            "ALTER TABLE {} RENAME TO {}",
            table,
            quote_ident(&request.new_name)
        ));
        table = qualified_name(schema, &request.new_name);
    }

    for column in &request.add_columns {
        statements.push(format!("ALTER TABLE {} ADD COLUMN {}", table, column.base_clause()));
    }

    for column in &request.drop_columns {
        statements.push(format!("ALTER TABLE {} DROP COLUMN {}", table, quote_ident(column)));
    }

    match request.enable_rls {
        Some(true) => statements.push(format!("ALTER TABLE {} ENABLE ROW LEVEL SECURITY", table)),
        Some(false) => statements.push(format!("ALTER TABLE {} DISABLE ROW LEVEL SECURITY", table)),
        None => {}
    }

    Ok(statements)
}

pub fn drop_table_sql(schema: &str, name: &str, cascade: bool) -> String {
    let mut sql = format!("DROP TABLE IF EXISTS {}", qualified_name(schema, name));
    if cascade {
        sql.push_str(" CASCADE");
    }
    sql
}

#[derive(Deserialize)]
struct TableNameRow {
    tablename: String,
}

/// Table service for reads, listing, DDL and type generation
pub struct TableService;

impl TableService {
    /// Filtered read of one table
    pub async fn query(backend: &dyn Backend, request: QueryTableRequest) -> Result<Value> {
        require(&request.table, "Table name is required")?;

        let select = if request.select.trim().is_empty() {
            "*"
        } else {
            request.select.as_str()
        };
        let mut select_request =
            SelectRequest::new(schema_or_default(&request.schema), &request.table).with_select(select);

        for condition in &request.conditions {
            match FilterOperator::parse(&condition.operator) {
                Some(operator) => {
                    select_request =
                        select_request.with_filter(Filter::new(&condition.column, operator, &condition.value));
                }
                None => tracing::debug!("Ignoring unknown operator: {}", condition.operator),
            }
        }
        if let Some(limit) = request.limit {
            select_request = select_request.with_limit(limit);
        }

        Ok(backend.select_rows(&select_request).await?)
    }

    /// List tables of a schema, falling through the strategy chain
    pub async fn list(backend: &dyn Backend, request: SchemaRequest) -> Result<Value> {
        let schema = schema_or_default(&request.schema);
        for strategy in ListingStrategy::CHAIN {
            match strategy.attempt(backend, schema).await {
                Attempt::Found(tables) => {
                    tracing::debug!("Listed tables of {} via {:?}", schema, strategy);
                    return Ok(tables);
                }
                Attempt::Next(reason) => {
                    tracing::debug!("Table listing via {:?} failed: {}", strategy, reason);
                }
            }
        }
        Ok(json!([]))
    }

    pub async fn create(backend: &dyn Backend, request: CreateTableRequest) -> Result<MutationResponse> {
        let sql = create_table_sql(&request)?;
        execute_sql(backend, &sql).await?;

        let schema = schema_or_default(&request.schema);
        tracing::info!("Created table {}.{}", schema, request.name);
        Ok(MutationResponse::success(format!(
            "Table '{}' created successfully in schema '{}'",
            request.name, schema
        )))
    }

    /// Apply each alteration independently and report per-statement outcomes
    pub async fn alter(backend: &dyn Backend, request: AlterTableRequest) -> Result<AlterTableResponse> {
        let statements = alter_table_statements(&request)?;

        let mut operations = Vec::with_capacity(statements.len());
        for query in statements {
            let outcome = match execute_sql(backend, &query).await {
                Ok(_) => OperationOutcome {
                    success: true,
                    query,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!("Alter statement failed: {}", e);
                    OperationOutcome {
                        success: false,
                        query,
                        error: Some(e.to_string()),
                    }
                }
            };
            operations.push(outcome);
        }

        let success = operations.iter().all(|op| op.success);
        let message = if success {
            format!("Table '{}' altered successfully", request.name)
        } else {
            format!("Some operations failed while altering table '{}'", request.name)
        };

        Ok(AlterTableResponse {
            success,
            operations,
            message,
        })
    }

    pub async fn drop(backend: &dyn Backend, request: DropTableRequest) -> Result<MutationResponse> {
        require(&request.name, "Table name is required")?;
        let schema = schema_or_default(&request.schema);

        execute_sql(backend, &drop_table_sql(schema, &request.name, request.cascade)).await?;

        tracing::info!("Dropped table {}.{}", schema, request.name);
        Ok(MutationResponse::success(format!(
            "Table '{}' dropped successfully from schema '{}'",
            request.name, schema
        )))
    }

    /// Render TypeScript interfaces for every table of a schema
    pub async fn generate_types(backend: &dyn Backend, request: SchemaRequest) -> Result<TypesResponse> {
        let schema = schema_or_default(&request.schema);

        let described = backend
            .invoke("get_schema_information", json!({ "p_schema": schema }))
            .await
            .and_then(decode_rows::<TableInfo>);

        match described {
            Ok(tables) => Ok(TypesResponse {
                types: render_interfaces(schema, &tables),
            }),
            Err(e) => {
                tracing::debug!("get_schema_information unavailable, using pg_tables: {}", e);
                let rows: Vec<TableNameRow> =
                    decode_rows(execute_sql(backend, &pg_tables_query(schema, "tablename")).await?)?;
                let names: Vec<String> = rows.into_iter().map(|row| row.tablename).collect();
                Ok(TypesResponse {
                    types: render_stub_interfaces(schema, &names),
                })
            }
        }
    }
}
