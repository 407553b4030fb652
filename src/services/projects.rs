use std::sync::Arc;

use serde::Deserialize;

use crate::auth::{owner_scope, Authorizer, User};
use crate::error::Result;
use crate::models::{CreateProject, Project, ProjectStatus, UpdateProject};
use crate::storage::SharedStorage;
use crate::validation::Validator;

/// Query string of `GET /api/projects`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectQuery {
    pub status: Option<String>,
}

pub struct ProjectService {
    storage: SharedStorage,
    authorizer: Arc<Authorizer>,
}

impl ProjectService {
    pub fn new(storage: SharedStorage, authorizer: Arc<Authorizer>) -> Self {
        Self { storage, authorizer }
    }

    /// The user's projects (every project for admins), newest first
    pub async fn list(&self, user: &User, query: &ProjectQuery) -> Result<Vec<Project>> {
        let mut v = Validator::new();
        let status = v.parse::<ProjectStatus>("status", query.status.as_deref());
        v.finish()?;

        let mut projects = self.storage.projects().list_projects(owner_scope(user)).await?;
        if let Some(status) = status {
            projects.retain(|project| project.status == status);
        }
        Ok(projects)
    }

    pub async fn get(&self, user: &User, project_id: &str) -> Result<Project> {
        self.authorizer.owned_project(user, project_id).await
    }

    pub async fn create(&self, user: &User, body: CreateProject) -> Result<Project> {
        let project = body.into_project(&user.id)?;
        self.storage.projects().insert_project(project.clone()).await?;
        log::info!("User {} created project {}", user.id, project.id);
        Ok(project)
    }

    pub async fn update(&self, user: &User, project_id: &str, body: UpdateProject) -> Result<Project> {
        let mut project = self.authorizer.owned_project(user, project_id).await?;
        body.apply(&mut project)?;
        self.storage.projects().update_project(project.clone()).await?;
        Ok(project)
    }

    /// Delete a project together with its materials
    pub async fn delete(&self, user: &User, project_id: &str) -> Result<()> {
        let project = self.authorizer.owned_project(user, project_id).await?;

        let removed = self.storage.materials().delete_project_materials(&project.id).await?;
        self.storage.projects().delete_project(&project.id).await?;
        log::info!(
            "User {} deleted project {} and {} material(s)",
            user.id,
            project.id,
            removed
        );
        Ok(())
    }
}
