//! In-memory storage implementation for development and testing
//!
//! This provides a complete storage implementation that keeps all data
//! in memory. It is the fallback when no hosted database is configured.
//! Each map sits behind its own `RwLock`; when two locks are needed they
//! are taken in declaration order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::*;
use crate::auth::reset::ResetToken;
use crate::auth::user::{normalize_email, User};
use crate::error::{Result, SiteWorkError};
use crate::models::{FileRecord, Material, Project};

/// In-memory combined storage provider
pub struct MemoryStorageProvider {
    users: Arc<RwLock<HashMap<String, User>>>,
    user_emails: Arc<RwLock<HashMap<String, String>>>, // email -> user_id
    projects: Arc<RwLock<HashMap<String, Project>>>,
    materials: Arc<RwLock<HashMap<String, Material>>>,
    files: Arc<RwLock<HashMap<String, FileRecord>>>,
    reset_tokens: Arc<RwLock<HashMap<String, ResetToken>>>, // token_hash -> token
}

impl MemoryStorageProvider {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            user_emails: Arc::new(RwLock::new(HashMap::new())),
            projects: Arc::new(RwLock::new(HashMap::new())),
            materials: Arc::new(RwLock::new(HashMap::new())),
            files: Arc::new(RwLock::new(HashMap::new())),
            reset_tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryStorageProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn owned_by(owner: Option<&str>, user_id: &str) -> bool {
    owner.map_or(true, |owner| owner == user_id)
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
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
        "memory"
    }

    async fn initialize(&self) -> Result<()> {
        log::info!("Memory storage provider initialized");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        // Memory storage is always healthy
        Ok(true)
    }
}

#[async_trait]
impl UserStorage for MemoryStorageProvider {
    async fn create_user(&self, mut user: User) -> Result<User> {
        let mut users = self.users.write().await;
        let mut emails = self.user_emails.write().await;

        user.email = normalize_email(&user.email);
        if emails.contains_key(&user.email) {
            return Err(SiteWorkError::Conflict("Email already registered".to_string()));
        }

        emails.insert(user.email.clone(), user.id.clone());
        users.insert(user.id.clone(), user.clone());

        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        let emails = self.user_emails.read().await;

        Ok(emails
            .get(&normalize_email(email))
            .and_then(|user_id| users.get(user_id))
            .cloned())
    }

    async fn update_user(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        let mut emails = self.user_emails.write().await;

        let previous_email = match users.get(&user.id) {
            Some(existing) => existing.email.clone(),
            None => return Err(SiteWorkError::NotFound("User".to_string())),
        };

        if previous_email != user.email {
            if emails.contains_key(&user.email) {
                return Err(SiteWorkError::Conflict("Email already registered".to_string()));
            }
            emails.remove(&previous_email);
            emails.insert(user.email.clone(), user.id.clone());
        }

        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = self.users.read().await;
        let mut list: Vec<User> = users.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }
}

#[async_trait]
impl ProjectStorage for MemoryStorageProvider {
    async fn insert_project(&self, project: Project) -> Result<()> {
        let mut projects = self.projects.write().await;
        if projects.contains_key(&project.id) {
            return Err(SiteWorkError::Conflict("Project already exists".to_string()));
        }
        projects.insert(project.id.clone(), project);
        Ok(())
    }

    async fn get_project(&self, project_id: &str, owner: Option<&str>) -> Result<Option<Project>> {
        let projects = self.projects.read().await;
        Ok(projects
            .get(project_id)
            .filter(|project| owned_by(owner, &project.user_id))
            .cloned())
    }

    async fn list_projects(&self, owner: Option<&str>) -> Result<Vec<Project>> {
        let projects = self.projects.read().await;
        let mut list: Vec<Project> = projects
            .values()
            .filter(|project| owned_by(owner, &project.user_id))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn update_project(&self, project: Project) -> Result<()> {
        let mut projects = self.projects.write().await;
        match projects.get_mut(&project.id) {
            Some(existing) => {
                *existing = project;
                Ok(())
            }
            None => Err(SiteWorkError::NotFound("Project".to_string())),
        }
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool> {
        let mut projects = self.projects.write().await;
        Ok(projects.remove(project_id).is_some())
    }
}

#[async_trait]
impl MaterialStorage for MemoryStorageProvider {
    async fn insert_material(&self, material: Material) -> Result<()> {
        let mut materials = self.materials.write().await;
        materials.insert(material.id.clone(), material);
        Ok(())
    }

    async fn get_material(&self, material_id: &str) -> Result<Option<Material>> {
        let materials = self.materials.read().await;
        Ok(materials.get(material_id).cloned())
    }

    async fn list_materials(&self, project_id: &str) -> Result<Vec<Material>> {
        let materials = self.materials.read().await;
        let mut list: Vec<Material> = materials
            .values()
            .filter(|material| material.project_id == project_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn update_material(&self, material: Material) -> Result<()> {
        let mut materials = self.materials.write().await;
        match materials.get_mut(&material.id) {
            Some(existing) => {
                *existing = material;
                Ok(())
            }
            None => Err(SiteWorkError::NotFound("Material".to_string())),
        }
    }

    async fn delete_material(&self, material_id: &str) -> Result<bool> {
        let mut materials = self.materials.write().await;
        Ok(materials.remove(material_id).is_some())
    }

    async fn delete_project_materials(&self, project_id: &str) -> Result<usize> {
        let mut materials = self.materials.write().await;
        let before = materials.len();
        materials.retain(|_, material| material.project_id != project_id);
        Ok(before - materials.len())
    }
}

#[async_trait]
impl FileStorage for MemoryStorageProvider {
    async fn insert_file(&self, file: FileRecord) -> Result<()> {
        let mut files = self.files.write().await;
        files.insert(file.id.clone(), file);
        Ok(())
    }

    async fn get_file(&self, file_id: &str, owner: Option<&str>) -> Result<Option<FileRecord>> {
        let files = self.files.read().await;
        Ok(files
            .get(file_id)
            .filter(|file| owned_by(owner, &file.user_id))
            .cloned())
    }

    async fn list_files(&self, owner: Option<&str>, project_id: Option<&str>) -> Result<Vec<FileRecord>> {
        let files = self.files.read().await;
        let mut list: Vec<FileRecord> = files
            .values()
            .filter(|file| owned_by(owner, &file.user_id))
            .filter(|file| project_id.map_or(true, |pid| file.project_id.as_deref() == Some(pid)))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn delete_file(&self, file_id: &str) -> Result<bool> {
        let mut files = self.files.write().await;
        Ok(files.remove(file_id).is_some())
    }
}

#[async_trait]
impl ResetTokenStorage for MemoryStorageProvider {
    async fn store_reset_token(&self, token: ResetToken) -> Result<()> {
        let mut tokens = self.reset_tokens.write().await;
        tokens.insert(token.token_hash.clone(), token);
        Ok(())
    }

    async fn get_reset_token(&self, token_hash: &str) -> Result<Option<ResetToken>> {
        let tokens = self.reset_tokens.read().await;
        Ok(tokens.get(token_hash).cloned())
    }

    async fn mark_reset_token_used(&self, token_hash: &str, used_at: DateTime<Utc>) -> Result<bool> {
        let mut tokens = self.reset_tokens.write().await;
        match tokens.get_mut(token_hash) {
            Some(token) if token.used_at.is_none() => {
                token.used_at = Some(used_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_expired_reset_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut tokens = self.reset_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, token| token.expires_at > now);
        Ok(before - tokens.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::user::UserRole;
    use crate::models::CreateProject;

    fn user(email: &str) -> User {
        User::new("Test User".into(), email, UserRole::User, "hash".into())
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStorageProvider::new();
        store.create_user(user("a@example.com")).await.unwrap();
        let err = store.create_user(user("A@Example.com")).await.unwrap_err();
        assert!(matches!(err, SiteWorkError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let store = MemoryStorageProvider::new();
        let created = store.create_user(user("mixed@example.com")).await.unwrap();
        let found = store.get_user_by_email("MIXED@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_project_owner_scoping() {
        let store = MemoryStorageProvider::new();
        let project = CreateProject {
            name: "Depot".into(),
            ..Default::default()
        }
        .into_project("owner")
        .unwrap();
        let id = project.id.clone();
        store.insert_project(project).await.unwrap();

        assert!(store.get_project(&id, Some("owner")).await.unwrap().is_some());
        assert!(store.get_project(&id, Some("intruder")).await.unwrap().is_none());
        assert!(store.get_project(&id, None).await.unwrap().is_some());
        assert_eq!(store.list_projects(Some("intruder")).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_reset_token_marked_once() {
        let store = MemoryStorageProvider::new();
        let now = Utc::now();
        store
            .store_reset_token(ResetToken::new("digest".into(), "u1".into(), now))
            .await
            .unwrap();
        assert!(store.mark_reset_token_used("digest", now).await.unwrap());
        assert!(!store.mark_reset_token_used("digest", now).await.unwrap());
        assert!(!store.mark_reset_token_used("unknown", now).await.unwrap());
    }
}
