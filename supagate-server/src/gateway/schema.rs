//! Raw queries, catalog introspection and schema DDL

use serde::Deserialize;
use serde_json::Value;
use supagate_core::{
    GatewayError, Result, SchemaData, SchemaRow, group_schema_rows, is_read_only, quote_ident,
    quote_literal,
};

use crate::gateway::client::{Backend, decode_rows, execute_sql};
use crate::gateway::response::{MutationResponse, require};

/// Catalog query behind `get_database_schema`: one row per column and key constraint
const SCHEMA_CATALOG_QUERY: &str = "SELECT \
    n.nspname AS schema_name, \
    c.relname AS table_name, \
    a.attname AS column_name, \
    format_type(a.atttypid, a.atttypmod) AS data_type, \
    a.attnotnull AS not_null, \
    pg_get_expr(d.adbin, d.adrelid) AS default_value, \
    CASE WHEN co.contype = 'p' THEN true ELSE false END AS is_primary_key, \
    CASE WHEN co.contype = 'f' THEN true ELSE false END AS is_foreign_key, \
    CASE WHEN co.contype = 'f' THEN ref_ns.nspname ELSE NULL END AS reference_schema, \
    CASE WHEN co.contype = 'f' THEN ref_class.relname ELSE NULL END AS reference_table, \
    CASE WHEN co.contype = 'f' THEN ref_attr.attname ELSE NULL END AS reference_column \
    FROM pg_attribute a \
    JOIN pg_class c ON a.attrelid = c.oid \
    JOIN pg_namespace n ON c.relnamespace = n.oid \
    LEFT JOIN pg_attrdef d ON a.attrelid = d.adrelid AND a.attnum = d.adnum \
    LEFT JOIN pg_constraint co ON (co.conrelid = c.oid AND a.attnum = ANY(co.conkey) \
        AND (co.contype = 'p' OR co.contype = 'f')) \
    LEFT JOIN pg_class ref_class ON co.confrelid = ref_class.oid \
    LEFT JOIN pg_namespace ref_ns ON ref_class.relnamespace = ref_ns.oid \
    LEFT JOIN pg_attribute ref_attr ON (ref_attr.attrelid = co.confrelid \
        AND ref_attr.attnum = co.confkey[array_position(co.conkey, a.attnum)]) \
    WHERE a.attnum > 0 AND NOT a.attisdropped AND c.relkind = 'r'";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecuteQueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetDatabaseSchemaRequest {
    pub schema: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateSchemaRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteSchemaRequest {
    pub name: String,
    pub cascade: bool,
}

/// Build the catalog query, filtered on one schema or on all user schemas
pub fn schema_catalog_query(schema: &str) -> String {
    let filter = if schema.trim().is_empty() {
        " AND n.nspname NOT IN ('pg_catalog', 'information_schema')".to_string()
    } else {
        format!(" AND n.nspname = {}", quote_literal(schema))
    };
    format!(
        "{}{} ORDER BY n.nspname, c.relname, a.attnum",
        SCHEMA_CATALOG_QUERY, filter
    )
}

pub fn create_schema_sql(name: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(name))
}

pub fn drop_schema_sql(name: &str, cascade: bool) -> String {
    let mut sql = format!("DROP SCHEMA IF EXISTS {}", quote_ident(name));
    if cascade {
        sql.push_str(" CASCADE");
    }
    sql
}

/// Schema service for queries and schema-level DDL
pub struct SchemaService;

impl SchemaService {
    /// Run a read-only query and relay the rows untouched
    pub async fn execute_query(backend: &dyn Backend, request: ExecuteQueryRequest) -> Result<Value> {
        require(&request.query, "Query is required")?;

        if !is_read_only(&request.query) {
            tracing::warn!("Rejected non read-only query");
            return Err(GatewayError::forbidden(
                "Only read-only queries are allowed through this endpoint for security reasons",
            ));
        }

        Ok(execute_sql(backend, &request.query).await?)
    }

    /// Introspect tables, columns and key constraints
    pub async fn get_database_schema(
        backend: &dyn Backend,
        request: GetDatabaseSchemaRequest,
    ) -> Result<SchemaData> {
        let query = schema_catalog_query(&request.schema);
        let rows: Vec<SchemaRow> = decode_rows(execute_sql(backend, &query).await?)?;
        tracing::debug!("Catalog query returned {} rows", rows.len());
        Ok(group_schema_rows(rows))
    }

    pub async fn create(backend: &dyn Backend, request: CreateSchemaRequest) -> Result<MutationResponse> {
        require(&request.name, "Schema name is required")?;

        execute_sql(backend, &create_schema_sql(&request.name)).await?;

        tracing::info!("Created schema: {}", request.name);
        Ok(MutationResponse::success(format!(
            "Schema '{}' created successfully",
            request.name
        )))
    }

    pub async fn delete(backend: &dyn Backend, request: DeleteSchemaRequest) -> Result<MutationResponse> {
        require(&request.name, "Schema name is required")?;

        execute_sql(backend, &drop_schema_sql(&request.name, request.cascade)).await?;

        tracing::info!("Deleted schema: {}", request.name);
        Ok(MutationResponse::success(format!(
            "Schema '{}' deleted successfully",
            request.name
        )))
    }
}
