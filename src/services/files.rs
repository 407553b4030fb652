use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::auth::{owner_scope, Authorizer, ResourceType, User};
use crate::constants::UPLOADS_PATH;
use crate::error::{Result, SiteWorkError};
use crate::models::file::sanitize_file_name;
use crate::models::{FileQuery, FileRecord};
use crate::storage::SharedStorage;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A file received from a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct FileService {
    storage: SharedStorage,
    authorizer: Arc<Authorizer>,
    upload_dir: PathBuf,
    max_upload_bytes: u64,
}

impl FileService {
    pub fn new(
        storage: SharedStorage,
        authorizer: Arc<Authorizer>,
        upload_dir: impl Into<PathBuf>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            storage,
            authorizer,
            upload_dir: upload_dir.into(),
            max_upload_bytes,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub async fn list(&self, user: &User, query: &FileQuery) -> Result<Vec<FileRecord>> {
        let project_id = query.project_id.as_deref().filter(|id| !id.is_empty());
        self.storage.files().list_files(owner_scope(user), project_id).await
    }

    pub async fn get(&self, user: &User, file_id: &str) -> Result<FileRecord> {
        self.authorizer.owned_file(user, file_id).await
    }

    /// Store the blob and record its metadata. A project id, when given,
    /// must name a project the user may access.
    pub async fn upload(&self, user: &User, file: UploadedFile, project_id: Option<String>) -> Result<FileRecord> {
        let size = file.bytes.len() as u64;
        if size == 0 {
            return Err(SiteWorkError::invalid_field("file", "File is empty"));
        }
        if size > self.max_upload_bytes {
            return Err(SiteWorkError::PayloadTooLarge(self.max_upload_bytes));
        }

        let project_id = project_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        if let Some(id) = &project_id {
            self.authorizer
                .require_ownership(user, ResourceType::Project, id)
                .await?;
        }

        let id = uuid::Uuid::new_v4().to_string();
        let name = sanitize_file_name(&file.file_name);
        let stored_name = match Path::new(&name).extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", id, ext.to_ascii_lowercase()),
            None => id.clone(),
        };

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.upload_dir.join(&stored_name), &file.bytes).await?;

        let record = FileRecord {
            id,
            user_id: user.id.clone(),
            project_id,
            name,
            url: format!("/{}/{}", UPLOADS_PATH, stored_name),
            stored_name,
            size,
            mime_type: file
                .mime_type
                .filter(|mime| !mime.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            created_at: Utc::now(),
        };

        if let Err(e) = self.storage.files().insert_file(record.clone()).await {
            // Don't leave an orphaned blob behind
            let _ = tokio::fs::remove_file(self.upload_dir.join(&record.stored_name)).await;
            return Err(e);
        }
        log::info!("User {} uploaded file {} ({} bytes)", user.id, record.id, size);
        Ok(record)
    }

    /// Remove the stored blob, then the metadata record
    pub async fn delete(&self, user: &User, file_id: &str) -> Result<()> {
        let record = self.authorizer.owned_file(user, file_id).await?;

        match tokio::fs::remove_file(self.upload_dir.join(&record.stored_name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Blob for file {} was already missing", record.id);
            }
            Err(e) => return Err(e.into()),
        }

        self.storage.files().delete_file(&record.id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;
    use crate::models::CreateProject;
    use crate::security_logger::SecurityLogger;
    use crate::storage::MemoryStorageProvider;

    struct Setup {
        service: FileService,
        owner: User,
        other: User,
        project_id: String,
        dir: PathBuf,
    }

    async fn setup(max_upload_bytes: u64) -> Setup {
        let storage: SharedStorage = Arc::new(MemoryStorageProvider::new());
        let owner = storage
            .users()
            .create_user(User::new("Own Er".into(), "owner@example.com", UserRole::User, "x".into()))
            .await
            .unwrap();
        let other = storage
            .users()
            .create_user(User::new("Oth Er".into(), "other@example.com", UserRole::User, "x".into()))
            .await
            .unwrap();
        let project = CreateProject {
            name: "Plant".into(),
            ..Default::default()
        }
        .into_project(&owner.id)
        .unwrap();
        let project_id = project.id.clone();
        storage.projects().insert_project(project).await.unwrap();

        let dir = std::env::temp_dir().join(format!("sitework-files-{}", uuid::Uuid::new_v4()));
        let authorizer = Arc::new(Authorizer::new(storage.clone(), Arc::new(SecurityLogger::new())));
        Setup {
            service: FileService::new(storage, authorizer, dir.clone(), max_upload_bytes),
            owner,
            other,
            project_id,
            dir,
        }
    }

    fn pdf(bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: "../Site Plan.PDF".into(),
            mime_type: Some("application/pdf".into()),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_upload_and_delete() {
        let s = setup(1024).await;
        let record = s
            .service
            .upload(&s.owner, pdf(b"%PDF-1.4"), Some(s.project_id.clone()))
            .await
            .unwrap();
        assert_eq!(record.name, "Site Plan.PDF");
        assert!(record.stored_name.ends_with(".pdf"));
        assert_eq!(record.url, format!("/uploads/{}", record.stored_name));
        assert_eq!(record.size, 8);
        assert!(s.dir.join(&record.stored_name).exists());

        let query = FileQuery {
            project_id: Some(s.project_id.clone()),
        };
        assert_eq!(s.service.list(&s.owner, &query).await.unwrap().len(), 1);
        assert!(s.service.list(&s.other, &FileQuery::default()).await.unwrap().is_empty());

        s.service.delete(&s.owner, &record.id).await.unwrap();
        assert!(!s.dir.join(&record.stored_name).exists());
        assert!(s.service.get(&s.owner, &record.id).await.is_err());
        let _ = std::fs::remove_dir_all(&s.dir);
    }

    #[tokio::test]
    async fn test_upload_limits() {
        let s = setup(4).await;
        assert!(matches!(
            s.service.upload(&s.owner, pdf(b"12345"), None).await,
            Err(SiteWorkError::PayloadTooLarge(4))
        ));
        assert!(matches!(
            s.service.upload(&s.owner, pdf(b""), None).await,
            Err(SiteWorkError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_into_foreign_project_is_not_found() {
        let s = setup(1024).await;
        assert!(matches!(
            s.service.upload(&s.other, pdf(b"data"), Some(s.project_id.clone())).await,
            Err(SiteWorkError::NotFound(_))
        ));
    }
}
