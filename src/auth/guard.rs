//! Role, permission and ownership checks
//!
//! The user record is re-read on every check, so role changes and deleted
//! accounts take effect immediately regardless of what the token says.

use std::fmt;
use std::sync::Arc;

use crate::auth::user::{Permission, User, UserRole};
use crate::error::{Result, SiteWorkError};
use crate::models::{FileRecord, Material, Project};
use crate::security_logger::{SecurityEvent, SecurityLogger};
use crate::storage::SharedStorage;

/// Resource kinds subject to ownership checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Project,
    /// Owned through its parent project
    Material,
    File,
}

impl ResourceType {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceType::Project => "Project",
            ResourceType::Material => "Material",
            ResourceType::File => "File",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scope for owner-filtered queries: admins see everything
pub fn owner_scope(user: &User) -> Option<&str> {
    if user.is_admin() {
        None
    } else {
        Some(user.id.as_str())
    }
}

pub struct Authorizer {
    storage: SharedStorage,
    security_logger: Arc<SecurityLogger>,
}

impl Authorizer {
    pub fn new(storage: SharedStorage, security_logger: Arc<SecurityLogger>) -> Self {
        Self {
            storage,
            security_logger,
        }
    }

    /// Load the acting user. A token for a vanished account yields 404.
    pub async fn current_user(&self, user_id: &str) -> Result<User> {
        self.storage
            .users()
            .get_user(user_id)
            .await?
            .ok_or_else(|| SiteWorkError::NotFound("User".to_string()))
    }

    pub async fn require_role(&self, user_id: &str, allowed: &[UserRole]) -> Result<User> {
        let user = self.current_user(user_id).await?;
        if allowed.contains(&user.role) {
            return Ok(user);
        }

        let roles: Vec<&str> = allowed.iter().map(|role| role.as_str()).collect();
        self.security_logger
            .log_event(SecurityEvent::PermissionDenied {
                user_id: user.id.clone(),
                action: format!("role in [{}]", roles.join(", ")),
            })
            .await;
        Err(SiteWorkError::Forbidden)
    }

    pub async fn require_permission(&self, user_id: &str, permission: Permission) -> Result<User> {
        let user = self.current_user(user_id).await?;
        if user.has_permission(permission) {
            return Ok(user);
        }

        self.security_logger
            .log_event(SecurityEvent::PermissionDenied {
                user_id: user.id.clone(),
                action: permission.to_string(),
            })
            .await;
        Err(SiteWorkError::Forbidden)
    }

    /// Admins pass for any existing resource. Everyone else gets 404 unless
    /// they own it, even when it exists under another owner.
    pub async fn require_ownership(&self, user: &User, resource: ResourceType, resource_id: &str) -> Result<()> {
        match resource {
            ResourceType::Project => self.owned_project(user, resource_id).await.map(|_| ()),
            ResourceType::Material => self.owned_material(user, resource_id).await.map(|_| ()),
            ResourceType::File => self.owned_file(user, resource_id).await.map(|_| ()),
        }
    }

    pub async fn owned_project(&self, user: &User, project_id: &str) -> Result<Project> {
        let projects = self.storage.projects();
        if let Some(project) = projects.get_project(project_id, owner_scope(user)).await? {
            return Ok(project);
        }

        if !user.is_admin() && projects.get_project(project_id, None).await?.is_some() {
            self.log_ownership_denied(user, ResourceType::Project, project_id).await;
        }
        Err(SiteWorkError::NotFound(ResourceType::Project.label().to_string()))
    }

    pub async fn owned_material(&self, user: &User, material_id: &str) -> Result<Material> {
        let not_found = || SiteWorkError::NotFound(ResourceType::Material.label().to_string());
        let material = self
            .storage
            .materials()
            .get_material(material_id)
            .await?
            .ok_or_else(not_found)?;

        match self.owned_project(user, &material.project_id).await {
            Ok(_) => Ok(material),
            Err(SiteWorkError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e),
        }
    }

    pub async fn owned_file(&self, user: &User, file_id: &str) -> Result<FileRecord> {
        let files = self.storage.files();
        if let Some(file) = files.get_file(file_id, owner_scope(user)).await? {
            return Ok(file);
        }

        if !user.is_admin() && files.get_file(file_id, None).await?.is_some() {
            self.log_ownership_denied(user, ResourceType::File, file_id).await;
        }
        Err(SiteWorkError::NotFound(ResourceType::File.label().to_string()))
    }

    async fn log_ownership_denied(&self, user: &User, resource: ResourceType, resource_id: &str) {
        self.security_logger
            .log_event(SecurityEvent::OwnershipDenied {
                user_id: user.id.clone(),
                resource: resource.to_string(),
                resource_id: resource_id.to_string(),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateProject;
    use crate::storage::MemoryStorageProvider;

    struct Fixture {
        guard: Authorizer,
        storage: SharedStorage,
        admin: User,
        owner: User,
        other: User,
        project_id: String,
    }

    async fn fixture() -> Fixture {
        let storage: SharedStorage = Arc::new(MemoryStorageProvider::new());
        let users = storage.users();
        let admin = users
            .create_user(User::new("Ad Min".into(), "admin@example.com", UserRole::Admin, "x".into()))
            .await
            .unwrap();
        let owner = users
            .create_user(User::new("Own Er".into(), "owner@example.com", UserRole::User, "x".into()))
            .await
            .unwrap();
        let other = users
            .create_user(User::new("Oth Er".into(), "other@example.com", UserRole::Manager, "x".into()))
            .await
            .unwrap();

        let project = CreateProject {
            name: "Bridge".into(),
            ..Default::default()
        }
        .into_project(&owner.id)
        .unwrap();
        let project_id = project.id.clone();
        storage.projects().insert_project(project).await.unwrap();

        Fixture {
            guard: Authorizer::new(storage.clone(), Arc::new(SecurityLogger::new())),
            storage,
            admin,
            owner,
            other,
            project_id,
        }
    }

    #[tokio::test]
    async fn test_permission_checks_use_stored_role() {
        let f = fixture().await;
        assert!(f.guard.require_permission(&f.owner.id, Permission::ReadProjects).await.is_ok());
        assert!(matches!(
            f.guard.require_permission(&f.owner.id, Permission::ManageUsers).await,
            Err(SiteWorkError::Forbidden)
        ));
        assert!(f.guard.require_permission(&f.admin.id, Permission::ManageUsers).await.is_ok());
        assert!(matches!(
            f.guard.require_permission("ghost", Permission::ReadProjects).await,
            Err(SiteWorkError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_require_role() {
        let f = fixture().await;
        let allowed = [UserRole::Admin, UserRole::Manager];
        assert!(f.guard.require_role(&f.other.id, &allowed).await.is_ok());
        assert!(matches!(
            f.guard.require_role(&f.owner.id, &allowed).await,
            Err(SiteWorkError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_ownership() {
        let f = fixture().await;
        let id = f.project_id.as_str();
        assert!(f.guard.require_ownership(&f.owner, ResourceType::Project, id).await.is_ok());
        assert!(f.guard.require_ownership(&f.admin, ResourceType::Project, id).await.is_ok());
        assert!(matches!(
            f.guard.require_ownership(&f.other, ResourceType::Project, id).await,
            Err(SiteWorkError::NotFound(_))
        ));
        assert!(matches!(
            f.guard.require_ownership(&f.admin, ResourceType::Project, "missing").await,
            Err(SiteWorkError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_material_owned_through_project() {
        let f = fixture().await;
        let material = crate::models::CreateMaterial {
            name: "Cement".into(),
            ..Default::default()
        }
        .into_material(&f.project_id)
        .unwrap();
        let material_id = material.id.clone();
        f.storage.materials().insert_material(material).await.unwrap();

        assert!(f.guard.owned_material(&f.owner, &material_id).await.is_ok());
        match f.guard.owned_material(&f.other, &material_id).await {
            Err(SiteWorkError::NotFound(what)) => assert_eq!(what, "Material"),
            other => panic!("unexpected {:?}", other.map(|m| m.id)),
        }
    }
}
