use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SiteWorkError};

/// Account roles, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Manager,
    Admin,
}

impl UserRole {
    /// Returns the permissions associated with this role
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Admin => &[
                Permission::ReadProjects,
                Permission::WriteProjects,
                Permission::DeleteProjects,
                Permission::ReadMaterials,
                Permission::WriteMaterials,
                Permission::ReadFiles,
                Permission::UploadFiles,
                Permission::ReadAnalytics,
                Permission::ReadReports,
                Permission::ManageTeam,
                Permission::ManageUsers,
                Permission::ManageSettings,
            ],
            UserRole::Manager => &[
                Permission::ReadProjects,
                Permission::WriteProjects,
                Permission::DeleteProjects,
                Permission::ReadMaterials,
                Permission::WriteMaterials,
                Permission::ReadFiles,
                Permission::UploadFiles,
                Permission::ReadAnalytics,
                Permission::ReadReports,
                Permission::ManageTeam,
            ],
            UserRole::User => &[
                Permission::ReadProjects,
                Permission::WriteProjects,
                Permission::DeleteProjects,
                Permission::ReadMaterials,
                Permission::WriteMaterials,
                Permission::ReadFiles,
                Permission::UploadFiles,
                Permission::ReadAnalytics,
            ],
        }
    }

    /// Check if this role has a specific permission
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = SiteWorkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(UserRole::User),
            "manager" => Ok(UserRole::Manager),
            "admin" => Ok(UserRole::Admin),
            other => Err(SiteWorkError::invalid_field(
                "role",
                &format!("Unknown role '{}'", other),
            )),
        }
    }
}

/// Permissions that can be granted through a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "read:projects")]
    ReadProjects,
    #[serde(rename = "write:projects")]
    WriteProjects,
    #[serde(rename = "delete:projects")]
    DeleteProjects,
    #[serde(rename = "read:materials")]
    ReadMaterials,
    #[serde(rename = "write:materials")]
    WriteMaterials,
    #[serde(rename = "read:files")]
    ReadFiles,
    #[serde(rename = "upload:files")]
    UploadFiles,
    #[serde(rename = "read:analytics")]
    ReadAnalytics,
    #[serde(rename = "read:reports")]
    ReadReports,
    #[serde(rename = "manage:team")]
    ManageTeam,
    #[serde(rename = "manage:users")]
    ManageUsers,
    #[serde(rename = "manage:settings")]
    ManageSettings,
}

impl Permission {
    pub const ALL: [Permission; 12] = [
        Permission::ReadProjects,
        Permission::WriteProjects,
        Permission::DeleteProjects,
        Permission::ReadMaterials,
        Permission::WriteMaterials,
        Permission::ReadFiles,
        Permission::UploadFiles,
        Permission::ReadAnalytics,
        Permission::ReadReports,
        Permission::ManageTeam,
        Permission::ManageUsers,
        Permission::ManageSettings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadProjects => "read:projects",
            Permission::WriteProjects => "write:projects",
            Permission::DeleteProjects => "delete:projects",
            Permission::ReadMaterials => "read:materials",
            Permission::WriteMaterials => "write:materials",
            Permission::ReadFiles => "read:files",
            Permission::UploadFiles => "upload:files",
            Permission::ReadAnalytics => "read:analytics",
            Permission::ReadReports => "read:reports",
            Permission::ManageTeam => "manage:team",
            Permission::ManageUsers => "manage:users",
            Permission::ManageSettings => "manage:settings",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = SiteWorkError;

    fn from_str(s: &str) -> Result<Self> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| SiteWorkError::BadRequest(format!("Unknown permission '{}'", s)))
    }
}

/// A stored account, including its password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub password_hash: String,
    /// Initials shown in place of a profile picture
    pub avatar: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user, safe to return from the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub avatar: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user record. The email is normalized to lowercase.
    pub fn new(name: String, email: &str, role: UserRole, password_hash: String) -> Self {
        let now = Utc::now();
        let avatar = initials(&name);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: normalize_email(email),
            name,
            role,
            password_hash,
            avatar,
            company: None,
            phone: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
            company: self.company.clone(),
            phone: self.phone.clone(),
            permissions: self.role.permissions().to_vec(),
            created_at: self.created_at,
        }
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Derive avatar initials from a display name: first letter of up to two words
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(|c| c.to_uppercase())
        .collect();

    if letters.is_empty() {
        "U".to_string()
    } else {
        letters
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
