use std::sync::Arc;

use crate::auth::{Authorizer, ResourceType, User};
use crate::error::Result;
use crate::models::{CreateMaterial, Material, UpdateMaterial};
use crate::storage::SharedStorage;

pub struct MaterialService {
    storage: SharedStorage,
    authorizer: Arc<Authorizer>,
}

impl MaterialService {
    pub fn new(storage: SharedStorage, authorizer: Arc<Authorizer>) -> Self {
        Self { storage, authorizer }
    }

    pub async fn list(&self, user: &User, project_id: &str) -> Result<Vec<Material>> {
        let project = self.authorizer.owned_project(user, project_id).await?;
        self.storage.materials().list_materials(&project.id).await
    }

    pub async fn get(&self, user: &User, material_id: &str) -> Result<Material> {
        self.authorizer.owned_material(user, material_id).await
    }

    pub async fn create(&self, user: &User, project_id: &str, body: CreateMaterial) -> Result<Material> {
        let project = self.authorizer.owned_project(user, project_id).await?;
        let material = body.into_material(&project.id)?;
        self.storage.materials().insert_material(material.clone()).await?;
        Ok(material)
    }

    /// Apply a partial update. Stock status is recomputed from the new values.
    pub async fn update(&self, user: &User, material_id: &str, body: UpdateMaterial) -> Result<Material> {
        let mut material = self.authorizer.owned_material(user, material_id).await?;
        body.apply(&mut material)?;
        self.storage.materials().update_material(material.clone()).await?;
        Ok(material)
    }

    pub async fn delete(&self, user: &User, material_id: &str) -> Result<()> {
        self.authorizer
            .require_ownership(user, ResourceType::Material, material_id)
            .await?;
        self.storage.materials().delete_material(material_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;
    use crate::error::SiteWorkError;
    use crate::models::{CreateProject, StockStatus};
    use crate::security_logger::SecurityLogger;
    use crate::storage::MemoryStorageProvider;

    async fn setup() -> (MaterialService, User, User, String) {
        let storage: SharedStorage = Arc::new(MemoryStorageProvider::new());
        let owner = storage
            .users()
            .create_user(User::new("Own Er".into(), "owner@example.com", UserRole::User, "x".into()))
            .await
            .unwrap();
        let other = storage
            .users()
            .create_user(User::new("Oth Er".into(), "other@example.com", UserRole::Manager, "x".into()))
            .await
            .unwrap();
        let project = CreateProject {
            name: "Warehouse".into(),
            ..Default::default()
        }
        .into_project(&owner.id)
        .unwrap();
        let project_id = project.id.clone();
        storage.projects().insert_project(project).await.unwrap();

        let authorizer = Arc::new(Authorizer::new(storage.clone(), Arc::new(SecurityLogger::new())));
        (MaterialService::new(storage, authorizer), owner, other, project_id)
    }

    #[tokio::test]
    async fn test_status_follows_stock_on_update() {
        let (service, owner, _, project_id) = setup().await;
        let body = CreateMaterial {
            name: "Gravel".into(),
            current_stock: Some(100.0),
            minimum_stock: Some(50.0),
            ..Default::default()
        };
        let material = service.create(&owner, &project_id, body).await.unwrap();
        assert_eq!(material.status, StockStatus::Adequate);

        let update = UpdateMaterial {
            current_stock: Some(20.0),
            ..Default::default()
        };
        let updated = service.update(&owner, &material.id, update).await.unwrap();
        assert_eq!(updated.status, StockStatus::Critical);
        assert_eq!(service.list(&owner, &project_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_users_cannot_touch_materials() {
        let (service, owner, other, project_id) = setup().await;
        let body = CreateMaterial {
            name: "Gravel".into(),
            ..Default::default()
        };
        let material = service.create(&owner, &project_id, body).await.unwrap();

        assert!(matches!(
            service.list(&other, &project_id).await,
            Err(SiteWorkError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(&other, &material.id).await,
            Err(SiteWorkError::NotFound(_))
        ));
        assert!(service.get(&owner, &material.id).await.is_ok());
        let body = CreateMaterial {
            name: "Sand".into(),
            ..Default::default()
        };
        assert!(service.create(&other, &project_id, body).await.is_err());

        service.delete(&owner, &material.id).await.unwrap();
        assert!(service.get(&owner, &material.id).await.is_err());
    }
}
