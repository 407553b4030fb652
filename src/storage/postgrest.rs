//! Hosted database backend speaking the PostgREST protocol
//!
//! Supabase exposes each table at `<project url>/rest/v1/<table>`. Filters
//! are query parameters of the form `column=op.value`, and writes return the
//! affected rows when `Prefer: return=representation` is sent.
//!
//! Expected tables: `users`, `projects`, `materials`, `files` and
//! `password_reset_tokens`, with columns named after the entity fields and a
//! unique constraint on `users.email`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use super::traits::*;
use crate::auth::reset::ResetToken;
use crate::auth::user::{normalize_email, User};
use crate::constants::DB_REQUEST_TIMEOUT_SECS;
use crate::error::{Result, SiteWorkError};
use crate::models::{FileRecord, Material, Project};

const USERS: &str = "users";
const PROJECTS: &str = "projects";
const MATERIALS: &str = "materials";
const FILES: &str = "files";
const RESET_TOKENS: &str = "password_reset_tokens";

type Filters = Vec<(&'static str, String)>;

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

fn owner_filter(filters: &mut Filters, owner: Option<&str>) {
    if let Some(owner) = owner {
        filters.push(("user_id", eq(owner)));
    }
}

/// Thin PostgREST client
pub struct PostgrestClient {
    http: reqwest::Client,
    rest_base: Url,
}

impl PostgrestClient {
    pub fn new(project_url: &str, api_key: &str) -> Result<Self> {
        let rest_base = rest_base_url(project_url)?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| SiteWorkError::ConfigError("Database API key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| SiteWorkError::ConfigError("Database API key is not a valid header value".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DB_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SiteWorkError::ConfigError(format!("Failed to build database client: {}", e)))?;

        Ok(Self { http, rest_base })
    }

    fn table_url(&self, table: &str, filters: &[(&'static str, String)]) -> Result<Url> {
        table_url(&self.rest_base, table, filters)
    }

    fn request(&self, method: Method, table: &str, filters: &[(&'static str, String)]) -> Result<RequestBuilder> {
        let url = self.table_url(table, filters)?;
        Ok(self.http.request(method, url))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, filters: Filters) -> Result<Vec<T>> {
        let response = self.request(Method::GET, table, &filters)?.send().await?;
        let response = check_status(table, response).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &str, mut filters: Filters) -> Result<Option<T>> {
        filters.push(("limit", "1".to_string()));
        Ok(self.select(table, filters).await?.into_iter().next())
    }

    async fn insert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<()> {
        let response = self
            .request(Method::POST, table, &[])?
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        check_status(table, response).await?;
        Ok(())
    }

    /// PATCH matching rows, returning how many were changed
    async fn update<T: Serialize + Sync>(&self, table: &str, filters: Filters, patch: &T) -> Result<usize> {
        let response = self
            .request(Method::PATCH, table, &filters)?
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        let response = check_status(table, response).await?;
        let rows = response.json::<Vec<serde_json::Value>>().await?;
        Ok(rows.len())
    }

    /// DELETE matching rows, returning how many were removed
    async fn delete(&self, table: &str, filters: Filters) -> Result<usize> {
        let response = self
            .request(Method::DELETE, table, &filters)?
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let response = check_status(table, response).await?;
        let rows = response.json::<Vec<serde_json::Value>>().await?;
        Ok(rows.len())
    }
}

/// Parse a hosted database URL, accepting only absolute http(s) URLs
pub fn parse_database_url(raw: &str) -> Result<Url> {
    let parsed = Url::parse(raw)
        .map_err(|e| SiteWorkError::ConfigError(format!("Invalid database URL '{}': {}", raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(SiteWorkError::ConfigError(format!(
            "Database URL must use http or https, got '{}'",
            other
        ))),
    }
}

fn rest_base_url(project_url: &str) -> Result<Url> {
    let mut base = parse_database_url(project_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("rest/v1/")
        .map_err(|e| SiteWorkError::ConfigError(format!("Invalid database URL: {}", e)))
}

fn table_url(rest_base: &Url, table: &str, filters: &[(&'static str, String)]) -> Result<Url> {
    let mut url = rest_base
        .join(table)
        .map_err(|e| SiteWorkError::StorageError(format!("Invalid table '{}': {}", table, e)))?;
    if !filters.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in filters {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

async fn check_status(table: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    log::error!("Database request on '{}' failed with {}: {}", table, status, body);
    match status {
        StatusCode::CONFLICT => Err(SiteWorkError::Conflict(format!("Duplicate record in {}", table))),
        _ => Err(SiteWorkError::StorageError(format!("{} returned {}", table, status))),
    }
}

/// Storage provider backed by a hosted PostgREST endpoint
pub struct PostgrestStorageProvider {
    client: PostgrestClient,
}

impl PostgrestStorageProvider {
    pub fn new(project_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: PostgrestClient::new(project_url, api_key)?,
        })
    }
}

#[async_trait]
impl StorageProvider for PostgrestStorageProvider {
    fn users(&self) -> &dyn UserStorage {
        self
    }

    fn projects(&self) -> &dyn ProjectStorage {
        self
    }

    fn materials(&self) -> &dyn MaterialStorage {
        self
    }

    fn files(&self) -> &dyn FileStorage {
        self
    }

    fn reset_tokens(&self) -> &dyn ResetTokenStorage {
        self
    }

    fn backend_name(&self) -> &'static str {
        "postgrest"
    }

    async fn initialize(&self) -> Result<()> {
        if self.health_check().await? {
            log::info!("Hosted database reachable");
            Ok(())
        } else {
            Err(SiteWorkError::StorageError("Hosted database is not reachable".to_string()))
        }
    }

    async fn health_check(&self) -> Result<bool> {
        let filters = vec![("select", "id".to_string()), ("limit", "1".to_string())];
        match self.client.select::<serde_json::Value>(USERS, filters).await {
            Ok(_) => Ok(true),
            Err(e) => {
                log::warn!("Database health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl UserStorage for PostgrestStorageProvider {
    async fn create_user(&self, mut user: User) -> Result<User> {
        user.email = normalize_email(&user.email);
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(SiteWorkError::Conflict("Email already registered".to_string()));
        }
        self.client.insert(USERS, &user).await.map_err(|e| match e {
            SiteWorkError::Conflict(_) => SiteWorkError::Conflict("Email already registered".to_string()),
            other => other,
        })?;
        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.client.select_one(USERS, vec![("id", eq(user_id))]).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.client
            .select_one(USERS, vec![("email", eq(&normalize_email(email)))])
            .await
    }

    async fn update_user(&self, user: User) -> Result<()> {
        let changed = self.client.update(USERS, vec![("id", eq(&user.id))], &user).await?;
        if changed == 0 {
            return Err(SiteWorkError::NotFound("User".to_string()));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.client
            .select(USERS, vec![("order", "created_at.asc".to_string())])
            .await
    }
}

#[async_trait]
impl ProjectStorage for PostgrestStorageProvider {
    async fn insert_project(&self, project: Project) -> Result<()> {
        self.client.insert(PROJECTS, &project).await
    }

    async fn get_project(&self, project_id: &str, owner: Option<&str>) -> Result<Option<Project>> {
        let mut filters = vec![("id", eq(project_id))];
        owner_filter(&mut filters, owner);
        self.client.select_one(PROJECTS, filters).await
    }

    async fn list_projects(&self, owner: Option<&str>) -> Result<Vec<Project>> {
        let mut filters = vec![("order", "created_at.desc".to_string())];
        owner_filter(&mut filters, owner);
        self.client.select(PROJECTS, filters).await
    }

    async fn update_project(&self, project: Project) -> Result<()> {
        let changed = self
            .client
            .update(PROJECTS, vec![("id", eq(&project.id))], &project)
            .await?;
        if changed == 0 {
            return Err(SiteWorkError::NotFound("Project".to_string()));
        }
        Ok(())
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool> {
        Ok(self.client.delete(PROJECTS, vec![("id", eq(project_id))]).await? > 0)
    }
}

#[async_trait]
impl MaterialStorage for PostgrestStorageProvider {
    async fn insert_material(&self, material: Material) -> Result<()> {
        self.client.insert(MATERIALS, &material).await
    }

    async fn get_material(&self, material_id: &str) -> Result<Option<Material>> {
        self.client.select_one(MATERIALS, vec![("id", eq(material_id))]).await
    }

    async fn list_materials(&self, project_id: &str) -> Result<Vec<Material>> {
        self.client
            .select(
                MATERIALS,
                vec![("project_id", eq(project_id)), ("order", "name.asc".to_string())],
            )
            .await
    }

    async fn update_material(&self, material: Material) -> Result<()> {
        let changed = self
            .client
            .update(MATERIALS, vec![("id", eq(&material.id))], &material)
            .await?;
        if changed == 0 {
            return Err(SiteWorkError::NotFound("Material".to_string()));
        }
        Ok(())
    }

    async fn delete_material(&self, material_id: &str) -> Result<bool> {
        Ok(self.client.delete(MATERIALS, vec![("id", eq(material_id))]).await? > 0)
    }

    async fn delete_project_materials(&self, project_id: &str) -> Result<usize> {
        self.client
            .delete(MATERIALS, vec![("project_id", eq(project_id))])
            .await
    }
}

#[async_trait]
impl FileStorage for PostgrestStorageProvider {
    async fn insert_file(&self, file: FileRecord) -> Result<()> {
        self.client.insert(FILES, &file).await
    }

    async fn get_file(&self, file_id: &str, owner: Option<&str>) -> Result<Option<FileRecord>> {
        let mut filters = vec![("id", eq(file_id))];
        owner_filter(&mut filters, owner);
        self.client.select_one(FILES, filters).await
    }

    async fn list_files(&self, owner: Option<&str>, project_id: Option<&str>) -> Result<Vec<FileRecord>> {
        let mut filters = vec![("order", "created_at.desc".to_string())];
        owner_filter(&mut filters, owner);
        if let Some(project_id) = project_id {
            filters.push(("project_id", eq(project_id)));
        }
        self.client.select(FILES, filters).await
    }

    async fn delete_file(&self, file_id: &str) -> Result<bool> {
        Ok(self.client.delete(FILES, vec![("id", eq(file_id))]).await? > 0)
    }
}

#[async_trait]
impl ResetTokenStorage for PostgrestStorageProvider {
    async fn store_reset_token(&self, token: ResetToken) -> Result<()> {
        self.client.insert(RESET_TOKENS, &token).await
    }

    async fn get_reset_token(&self, token_hash: &str) -> Result<Option<ResetToken>> {
        self.client
            .select_one(RESET_TOKENS, vec![("token_hash", eq(token_hash))])
            .await
    }

    async fn mark_reset_token_used(&self, token_hash: &str, used_at: DateTime<Utc>) -> Result<bool> {
        // The `used_at=is.null` filter makes the update a compare-and-set
        let filters = vec![
            ("token_hash", eq(token_hash)),
            ("used_at", "is.null".to_string()),
        ];
        let patch = serde_json::json!({ "used_at": used_at });
        Ok(self.client.update(RESET_TOKENS, filters, &patch).await? == 1)
    }

    async fn delete_expired_reset_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        self.client
            .delete(RESET_TOKENS, vec![("expires_at", format!("lte.{}", now.to_rfc3339()))])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_base_url() {
        let base = rest_base_url("https://abc.supabase.co").unwrap();
        assert_eq!(base.as_str(), "https://abc.supabase.co/rest/v1/");

        let nested = rest_base_url("https://db.example.com/tenant").unwrap();
        assert_eq!(nested.as_str(), "https://db.example.com/tenant/rest/v1/");
    }

    #[test]
    fn test_rest_base_url_rejects_bad_input() {
        assert!(rest_base_url("not a url").is_err());
        assert!(rest_base_url("ftp://db.example.com").is_err());
    }

    #[test]
    fn test_table_url_encodes_filters() {
        let base = rest_base_url("https://abc.supabase.co").unwrap();
        let url = table_url(
            &base,
            USERS,
            &[("email", eq("a+b@example.com")), ("limit", "1".to_string())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/rest/v1/users?email=eq.a%2Bb%40example.com&limit=1"
        );
    }

    #[test]
    fn test_client_rejects_invalid_key() {
        assert!(PostgrestClient::new("https://abc.supabase.co", "bad\nkey").is_err());
    }
}
