//! Storage buckets and their access policies, managed through `storage.*` tables

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use supagate_core::{BucketOperation, BucketPolicy, Result, StorageBucket, quote_literal};

use crate::gateway::client::{Backend, execute_sql};
use crate::gateway::response::{MutationResponse, require, require_all};

const DEFAULT_BUCKET_POLICY_ROLE: &str = "authenticated";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetBucketsRequest {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateBucketRequest {
    pub id: String,
    pub name: String,
    pub public: bool,
    pub file_size_limit: Option<i64>,
    pub allowed_mime_types: Vec<String>,
}

/// Partial bucket update.
///
/// For the nullable fields, an absent key leaves the column alone while an
/// explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateBucketRequest {
    pub id: String,
    pub public: Option<bool>,
    #[serde(deserialize_with = "deserialize_some")]
    pub file_size_limit: Option<Option<i64>>,
    #[serde(deserialize_with = "deserialize_some")]
    pub allowed_mime_types: Option<Option<Vec<String>>>,
}

/// Distinguishes a present `null` from an absent field
fn deserialize_some<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteBucketRequest {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetBucketPoliciesRequest {
    pub bucket_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateBucketPolicyRequest {
    pub bucket_id: String,
    pub name: String,
    pub operation: String,
    pub definition: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateBucketPolicyRequest {
    pub bucket_id: String,
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteBucketPolicyRequest {
    pub bucket_id: String,
    pub name: String,
}

fn mime_types_value(types: &[String]) -> Result<String> {
    if types.is_empty() {
        return Ok("NULL".to_string());
    }
    Ok(format!("{}::jsonb", quote_literal(&serde_json::to_string(types)?)))
}

impl TryFrom<CreateBucketRequest> for StorageBucket {
    type Error = supagate_core::GatewayError;

    fn try_from(request: CreateBucketRequest) -> Result<Self> {
        require(&request.id, "Bucket ID is required")?;
        let name = if request.name.trim().is_empty() {
            request.id.clone()
        } else {
            request.name
        };
        Ok(StorageBucket {
            id: request.id,
            name,
            public: request.public,
            file_size_limit: request.file_size_limit,
            allowed_mime_types: Some(request.allowed_mime_types).filter(|types| !types.is_empty()),
        })
    }
}

pub fn list_buckets_sql(id: &str) -> String {
    let mut sql = "SELECT * FROM storage.buckets".to_string();
    if !id.trim().is_empty() {
        sql.push_str(&format!(" WHERE id = {}", quote_literal(id)));
    }
    sql
}

pub fn create_bucket_sql(bucket: &StorageBucket) -> Result<String> {
    let file_size_limit = bucket
        .file_size_limit
        .map(|limit| limit.to_string())
        .unwrap_or_else(|| "NULL".to_string());
    let mime_types = mime_types_value(bucket.allowed_mime_types.as_deref().unwrap_or_default())?;

    Ok(format!(
        "INSERT INTO storage.buckets (id, name, public, file_size_limit, allowed_mime_types, created_at, updated_at) \
         VALUES ({}, {}, {}, {}, {}, NOW(), NOW())",
        quote_literal(&bucket.id),
        quote_literal(&bucket.name),
        bucket.public,
        file_size_limit,
        mime_types
    ))
}

pub fn update_bucket_sql(request: &UpdateBucketRequest) -> Result<String> {
    require(&request.id, "Bucket ID is required")?;

    let mut sql = "UPDATE storage.buckets SET updated_at = NOW()".to_string();
    if let Some(public) = request.public {
        sql.push_str(&format!(", public = {}", public));
    }
    match request.file_size_limit {
        Some(Some(limit)) => sql.push_str(&format!(", file_size_limit = {}", limit)),
        Some(None) => sql.push_str(", file_size_limit = NULL"),
        None => {}
    }
    match &request.allowed_mime_types {
        Some(Some(types)) => sql.push_str(&format!(", allowed_mime_types = {}", mime_types_value(types)?)),
        Some(None) => sql.push_str(", allowed_mime_types = NULL"),
        None => {}
    }
    sql.push_str(&format!(" WHERE id = {}", quote_literal(&request.id)));
    Ok(sql)
}

pub fn bucket_policies_sql(bucket_id: &str) -> String {
    format!(
        "SELECT name, CASE operation WHEN 10 THEN 'SELECT' WHEN 20 THEN 'INSERT' \
         WHEN 40 THEN 'UPDATE' WHEN 80 THEN 'DELETE' ELSE 'UNKNOWN' END AS operation, \
         definition, role FROM storage.policies WHERE bucket_id = {}",
        quote_literal(bucket_id)
    )
}

impl TryFrom<CreateBucketPolicyRequest> for BucketPolicy {
    type Error = supagate_core::GatewayError;

    fn try_from(request: CreateBucketPolicyRequest) -> Result<Self> {
        require_all(
            &[
                request.bucket_id.as_str(),
                request.name.as_str(),
                request.operation.as_str(),
                request.definition.as_str(),
            ],
            "Missing required parameters",
        )?;
        let operation: BucketOperation = request.operation.parse()?;
        let role = if request.role.trim().is_empty() {
            DEFAULT_BUCKET_POLICY_ROLE.to_string()
        } else {
            request.role
        };
        Ok(BucketPolicy {
            bucket_id: request.bucket_id,
            name: request.name,
            operation,
            definition: request.definition,
            role,
        })
    }
}

pub fn create_bucket_policy_sql(policy: &BucketPolicy) -> String {
    format!(
        "INSERT INTO storage.policies (name, bucket_id, operation, definition, role, created_at) \
         VALUES ({}, {}, {}, {}, {}, NOW())",
        quote_literal(&policy.name),
        quote_literal(&policy.bucket_id),
        policy.operation.code(),
        quote_literal(&policy.definition),
        quote_literal(&policy.role)
    )
}

/// Storage service for buckets and bucket policies
pub struct StorageService;

impl StorageService {
    pub async fn list_buckets(backend: &dyn Backend, request: GetBucketsRequest) -> Result<Value> {
        Ok(execute_sql(backend, &list_buckets_sql(&request.id)).await?)
    }

    pub async fn create_bucket(backend: &dyn Backend, request: CreateBucketRequest) -> Result<MutationResponse> {
        let bucket = StorageBucket::try_from(request)?;
        execute_sql(backend, &create_bucket_sql(&bucket)?).await?;

        tracing::info!("Created bucket: {}", bucket.id);
        Ok(MutationResponse::success(format!("Bucket '{}' created successfully", bucket.id))
            .with_method("sql"))
    }

    pub async fn update_bucket(backend: &dyn Backend, request: UpdateBucketRequest) -> Result<MutationResponse> {
        let sql = update_bucket_sql(&request)?;
        execute_sql(backend, &sql).await?;

        tracing::info!("Updated bucket: {}", request.id);
        Ok(MutationResponse::success(format!("Bucket '{}' updated successfully", request.id)))
    }

    pub async fn delete_bucket(backend: &dyn Backend, request: DeleteBucketRequest) -> Result<MutationResponse> {
        require(&request.id, "Bucket ID is required")?;

        let sql = format!("DELETE FROM storage.buckets WHERE id = {}", quote_literal(&request.id));
        execute_sql(backend, &sql).await?;

        tracing::info!("Deleted bucket: {}", request.id);
        Ok(MutationResponse::success(format!("Bucket '{}' deleted successfully", request.id)))
    }

    pub async fn list_policies(backend: &dyn Backend, request: GetBucketPoliciesRequest) -> Result<Value> {
        require(&request.bucket_id, "Bucket ID is required")?;
        Ok(execute_sql(backend, &bucket_policies_sql(&request.bucket_id)).await?)
    }

    pub async fn create_policy(
        backend: &dyn Backend,
        request: CreateBucketPolicyRequest,
    ) -> Result<MutationResponse> {
        let policy = BucketPolicy::try_from(request)?;
        execute_sql(backend, &create_bucket_policy_sql(&policy)).await?;

        tracing::info!("Created policy {} for bucket {}", policy.name, policy.bucket_id);
        Ok(MutationResponse::success(format!(
            "Policy '{}' for bucket '{}' created successfully",
            policy.name, policy.bucket_id
        )))
    }

    pub async fn update_policy(
        backend: &dyn Backend,
        request: UpdateBucketPolicyRequest,
    ) -> Result<MutationResponse> {
        require_all(
            &[
                request.bucket_id.as_str(),
                request.name.as_str(),
                request.definition.as_str(),
            ],
            "Missing required parameters",
        )?;

        let sql = format!(
            "UPDATE storage.policies SET definition = {}, updated_at = NOW() WHERE bucket_id = {} AND name = {}",
            quote_literal(&request.definition),
            quote_literal(&request.bucket_id),
            quote_literal(&request.name)
        );
        execute_sql(backend, &sql).await?;

        tracing::info!("Updated policy {} for bucket {}", request.name, request.bucket_id);
        Ok(MutationResponse::success(format!(
            "Policy '{}' for bucket '{}' updated successfully",
            request.name, request.bucket_id
        )))
    }

    pub async fn delete_policy(
        backend: &dyn Backend,
        request: DeleteBucketPolicyRequest,
    ) -> Result<MutationResponse> {
        require_all(
            &[request.bucket_id.as_str(), request.name.as_str()],
            "Missing required parameters",
        )?;

        let sql = format!(
            "DELETE FROM storage.policies WHERE bucket_id = {} AND name = {}",
            quote_literal(&request.bucket_id),
            quote_literal(&request.name)
        );
        execute_sql(backend, &sql).await?;

        tracing::info!("Deleted policy {} for bucket {}", request.name, request.bucket_id);
        Ok(MutationResponse::success(format!(
            "Policy '{}' for bucket '{}' deleted successfully",
            request.name, request.bucket_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::client::MockBackend;
    use serde_json::json;
    use supagate_core::GatewayError;

    #[test]
    fn test_create_bucket_defaults() {
        let bucket = StorageBucket::try_from(CreateBucketRequest {
            id: "avatars".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(bucket.name, "avatars");

        let sql = create_bucket_sql(&bucket).unwrap();
        assert!(sql.ends_with("VALUES ('avatars', 'avatars', false, NULL, NULL, NOW(), NOW())"));
    }

    #[test]
    fn test_create_bucket_with_limits() {
        let bucket = StorageBucket::try_from(CreateBucketRequest {
            id: "docs".to_string(),
            name: "Documents".to_string(),
            public: true,
            file_size_limit: Some(1048576),
            allowed_mime_types: vec!["application/pdf".to_string()],
        })
        .unwrap();

        let sql = create_bucket_sql(&bucket).unwrap();
        assert!(sql.contains(r#"'docs', 'Documents', true, 1048576, '["application/pdf"]'::jsonb"#));
    }

    #[test]
    fn test_update_bucket_distinguishes_null_from_absent() {
        let absent: UpdateBucketRequest = serde_json::from_value(json!({"id": "docs", "public": true})).unwrap();
        assert_eq!(
            update_bucket_sql(&absent).unwrap(),
            "UPDATE storage.buckets SET updated_at = NOW(), public = true WHERE id = 'docs'"
        );

        let cleared: UpdateBucketRequest =
            serde_json::from_value(json!({"id": "docs", "file_size_limit": null})).unwrap();
        assert_eq!(
            update_bucket_sql(&cleared).unwrap(),
            "UPDATE storage.buckets SET updated_at = NOW(), file_size_limit = NULL WHERE id = 'docs'"
        );

        let emptied: UpdateBucketRequest =
            serde_json::from_value(json!({"id": "docs", "file_size_limit": 10, "allowed_mime_types": []}))
                .unwrap();
        assert_eq!(
            update_bucket_sql(&emptied).unwrap(),
            "UPDATE storage.buckets SET updated_at = NOW(), file_size_limit = 10, allowed_mime_types = NULL WHERE id = 'docs'"
        );
    }

    #[test]
    fn test_bucket_policies_filter_on_bucket_id() {
        let sql = bucket_policies_sql("avatars");
        assert!(sql.ends_with("FROM storage.policies WHERE bucket_id = 'avatars'"));
    }

    #[test]
    fn test_bucket_policy_validation() {
        let invalid = BucketPolicy::try_from(CreateBucketPolicyRequest {
            bucket_id: "avatars".to_string(),
            name: "read".to_string(),
            operation: "ALL".to_string(),
            definition: "true".to_string(),
            role: String::new(),
        })
        .unwrap_err();
        assert_eq!(
            invalid.client_message(),
            "Invalid operation. Must be SELECT, INSERT, UPDATE, or DELETE"
        );

        let missing = BucketPolicy::try_from(CreateBucketPolicyRequest::default()).unwrap_err();
        assert_eq!(missing.client_message(), "Missing required parameters");
    }

    #[test]
    fn test_create_bucket_policy_sql() {
        let policy = BucketPolicy::try_from(CreateBucketPolicyRequest {
            bucket_id: "avatars".to_string(),
            name: "owner upload".to_string(),
            operation: "INSERT".to_string(),
            definition: "owner = 'me'".to_string(),
            role: String::new(),
        })
        .unwrap();
        assert_eq!(policy.role, "authenticated");
        assert_eq!(
            create_bucket_policy_sql(&policy),
            "INSERT INTO storage.policies (name, bucket_id, operation, definition, role, created_at) \
             VALUES ('owner upload', 'avatars', 20, 'owner = ''me''', 'authenticated', NOW())"
        );
    }

    #[tokio::test]
    async fn test_create_bucket_reports_method() {
        let mut backend = MockBackend::new();
        backend
            .expect_invoke()
            .withf(|function, payload| {
                function == "execute_sql"
                    && payload["query"]
                        .as_str()
                        .unwrap_or_default()
                        .starts_with("INSERT INTO storage.buckets")
            })
            .times(1)
            .returning(|_, _| Ok(Value::Null));

        let response = StorageService::create_bucket(
            &backend,
            CreateBucketRequest {
                id: "avatars".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(response.method, Some("sql"));
        assert_eq!(response.message, "Bucket 'avatars' created successfully");
    }

    #[tokio::test]
    async fn test_delete_bucket_requires_id() {
        let mut backend = MockBackend::new();
        backend.expect_invoke().never();

        let err = StorageService::delete_bucket(&backend, DeleteBucketRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));
    }
}
