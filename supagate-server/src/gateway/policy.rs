//! Row-level security policies

use serde::Deserialize;
use serde_json::{Value, json};
use supagate_core::{
    PolicyCommand, Result, RlsPolicy, qualified_name, quote_ident, schema_or_default,
};

use crate::gateway::client::{Backend, EXECUTE_SQL, decode_rows, execute_sql};
use crate::gateway::response::{MutationResponse, require_all};

const DEFAULT_POLICY_ROLE: &str = "public";

const POLICY_CATALOG_QUERY: &str = "SELECT \
    n.nspname AS schema_name, \
    c.relname AS table_name, \
    p.polname AS policy_name, \
    CASE WHEN p.polpermissive THEN 'PERMISSIVE' ELSE 'RESTRICTIVE' END AS policy_type, \
    CASE p.polcmd WHEN 'r' THEN 'SELECT' WHEN 'a' THEN 'INSERT' WHEN 'w' THEN 'UPDATE' \
        WHEN 'd' THEN 'DELETE' WHEN '*' THEN 'ALL' END AS command, \
    pg_get_expr(p.polqual, p.polrelid) AS expression, \
    pg_get_expr(p.polwithcheck, p.polrelid) AS check_expression, \
    ARRAY(SELECT rolname FROM pg_roles WHERE pg_has_role(oid, p.polroles, 'MEMBER')) AS roles \
    FROM pg_policy p \
    JOIN pg_class c ON p.polrelid = c.oid \
    JOIN pg_namespace n ON c.relnamespace = n.oid \
    WHERE n.nspname = $1";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetRlsPoliciesRequest {
    pub schema: String,
    pub table: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateRlsPolicyRequest {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub operation: String,
    pub definition: String,
    pub check: Option<String>,
    pub role: Option<String>,
    pub permissive: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateRlsPolicyRequest {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub definition: String,
    pub operation: Option<String>,
    pub check: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteRlsPolicyRequest {
    pub schema: String,
    pub table: String,
    pub name: String,
}

/// Parts of a `CREATE POLICY` statement after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDefinition {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub command: PolicyCommand,
    pub using: String,
    pub check: Option<String>,
    pub role: Option<String>,
    pub restrictive: bool,
}

impl PolicyDefinition {
    pub fn to_sql(&self) -> String {
        let mut sql = format!(
            "CREATE POLICY {} ON {}",
            quote_ident(&self.name),
            qualified_name(&self.schema, &self.table)
        );
        if self.restrictive {
            sql.push_str(" AS RESTRICTIVE");
        }
        sql.push_str(&format!(" FOR {}", self.command));
        if let Some(role) = &self.role {
            sql.push_str(&format!(" TO {}", role_clause(role)));
        }

        // INSERT policies only take WITH CHECK
        if self.command == PolicyCommand::Insert {
            let check = self.check.as_deref().unwrap_or(&self.using);
            sql.push_str(&format!(" WITH CHECK ({})", check));
            return sql;
        }

        sql.push_str(&format!(" USING ({})", self.using));
        if let Some(check) = &self.check {
            if self.command.accepts_check() {
                sql.push_str(&format!(" WITH CHECK ({})", check));
            }
        }
        sql
    }
}

/// `PUBLIC` is a keyword, every other role is an identifier
fn role_clause(role: &str) -> String {
    if role.eq_ignore_ascii_case("public") {
        "PUBLIC".to_string()
    } else {
        quote_ident(role)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn drop_policy_sql(schema: &str, table: &str, name: &str) -> String {
    format!(
        "DROP POLICY IF EXISTS {} ON {}",
        quote_ident(name),
        qualified_name(schema, table)
    )
}

/// RLS policy service
pub struct PolicyService;

impl PolicyService {
    /// List policies of a schema, optionally narrowed to one table
    pub async fn list(backend: &dyn Backend, request: GetRlsPoliciesRequest) -> Result<Vec<RlsPolicy>> {
        let schema = schema_or_default(&request.schema);
        let mut query = POLICY_CATALOG_QUERY.to_string();
        let mut params = vec![Value::String(schema.to_string())];

        if !request.table.trim().is_empty() {
            query.push_str(" AND c.relname = $2");
            params.push(Value::String(request.table.clone()));
        }
        query.push_str(" ORDER BY n.nspname, c.relname, p.polname");

        let result = backend
            .invoke(EXECUTE_SQL, json!({ "query": query, "params": params }))
            .await?;
        Ok(decode_rows(result)?)
    }

    /// Validate a create request into a policy definition
    pub fn definition(request: CreateRlsPolicyRequest) -> Result<PolicyDefinition> {
        require_all(
            &[
                request.table.as_str(),
                request.name.as_str(),
                request.operation.as_str(),
                request.definition.as_str(),
            ],
            "Missing required parameters",
        )?;
        let command: PolicyCommand = request.operation.parse()?;

        Ok(PolicyDefinition {
            schema: schema_or_default(&request.schema).to_string(),
            table: request.table,
            name: request.name,
            command,
            using: request.definition,
            check: non_empty(request.check),
            role: Some(non_empty(request.role).unwrap_or_else(|| DEFAULT_POLICY_ROLE.to_string())),
            restrictive: request.permissive == Some(false),
        })
    }

    pub async fn create(backend: &dyn Backend, request: CreateRlsPolicyRequest) -> Result<MutationResponse> {
        let policy = Self::definition(request)?;
        execute_sql(backend, &policy.to_sql()).await?;

        let target = qualified_name(&policy.schema, &policy.table);
        tracing::info!("Created RLS policy {} on {}", policy.name, target);
        Ok(MutationResponse::success(format!(
            "RLS policy '{}' created on {}",
            policy.name, target
        )))
    }

    /// Replace a policy by dropping it and creating it again
    pub async fn update(backend: &dyn Backend, request: UpdateRlsPolicyRequest) -> Result<MutationResponse> {
        require_all(
            &[
                request.table.as_str(),
                request.name.as_str(),
                request.definition.as_str(),
            ],
            "Missing required parameters",
        )?;
        let command = match non_empty(request.operation) {
            Some(operation) => operation.parse()?,
            None => PolicyCommand::All,
        };
        let schema = schema_or_default(&request.schema).to_string();

        execute_sql(backend, &drop_policy_sql(&schema, &request.table, &request.name)).await?;

        let policy = PolicyDefinition {
            schema,
            table: request.table,
            name: request.name,
            command,
            using: request.definition,
            check: non_empty(request.check),
            role: non_empty(request.role),
            restrictive: false,
        };
        execute_sql(backend, &policy.to_sql()).await?;

        let target = qualified_name(&policy.schema, &policy.table);
        tracing::info!("Updated RLS policy {} on {}", policy.name, target);
        Ok(MutationResponse::success(format!(
            "RLS policy '{}' updated on {}",
            policy.name, target
        )))
    }

    pub async fn delete(backend: &dyn Backend, request: DeleteRlsPolicyRequest) -> Result<MutationResponse> {
        require_all(
            &[request.table.as_str(), request.name.as_str()],
            "Missing required parameters",
        )?;
        let schema = schema_or_default(&request.schema);

        execute_sql(backend, &drop_policy_sql(schema, &request.table, &request.name)).await?;

        let target = qualified_name(schema, &request.table);
        tracing::info!("Deleted RLS policy {} from {}", request.name, target);
        Ok(MutationResponse::success(format!(
            "RLS policy '{}' deleted from {}",
            request.name, target
        )))
    }
}
