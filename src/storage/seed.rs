//! Demo data for the in-memory fallback store

use chrono::{Duration, NaiveDate, Utc};

use super::traits::StorageProvider;
use crate::auth::password::hash_password;
use crate::auth::user::{User, UserRole};
use crate::error::Result;
use crate::models::{CreateMaterial, Project, ProjectStatus, RiskLevel};

pub const DEMO_ADMIN_EMAIL: &str = "admin@sitework.demo";
pub const DEMO_MANAGER_EMAIL: &str = "manager@sitework.demo";
pub const DEMO_USER_EMAIL: &str = "user@sitework.demo";
pub const DEMO_PASSWORD: &str = "SiteWork2024";

struct DemoProject {
    name: &'static str,
    location: &'static str,
    status: ProjectStatus,
    budget: f64,
    spent: f64,
    progress: f64,
    cpi: f64,
    spi: f64,
    quality: f64,
    safety: f64,
    risk: RiskLevel,
}

const DEMO_PROJECTS: [DemoProject; 4] = [
    DemoProject {
        name: "Downtown Office Complex",
        location: "Chicago, IL",
        status: ProjectStatus::Active,
        budget: 850_000.0,
        spent: 585_000.0,
        progress: 68.0,
        cpi: 0.98,
        spi: 1.02,
        quality: 92.0,
        safety: 96.0,
        risk: RiskLevel::Medium,
    },
    DemoProject {
        name: "Riverside Residential Tower",
        location: "Portland, OR",
        status: ProjectStatus::Active,
        budget: 1_200_000.0,
        spent: 420_000.0,
        progress: 35.0,
        cpi: 1.05,
        spi: 0.94,
        quality: 88.0,
        safety: 91.0,
        risk: RiskLevel::Low,
    },
    DemoProject {
        name: "Highway Bridge Retrofit",
        location: "Denver, CO",
        status: ProjectStatus::OnHold,
        budget: 640_000.0,
        spent: 655_000.0,
        progress: 82.0,
        cpi: 0.81,
        spi: 0.88,
        quality: 79.0,
        safety: 85.0,
        risk: RiskLevel::High,
    },
    DemoProject {
        name: "Community Health Center",
        location: "Austin, TX",
        status: ProjectStatus::Planning,
        budget: 300_000.0,
        spent: 12_000.0,
        progress: 4.0,
        cpi: 1.0,
        spi: 1.0,
        quality: 100.0,
        safety: 100.0,
        risk: RiskLevel::Low,
    },
];

/// Populate an empty store with demo accounts, projects and materials
pub async fn seed_demo_data(storage: &dyn StorageProvider) -> Result<()> {
    if !storage.users().list_users().await?.is_empty() {
        log::debug!("Store already has users, skipping demo seed");
        return Ok(());
    }

    let password_hash = hash_password(DEMO_PASSWORD)?;
    let admin = storage
        .users()
        .create_user(User::new("Alex Morgan".into(), DEMO_ADMIN_EMAIL, UserRole::Admin, password_hash.clone()))
        .await?;
    let manager = storage
        .users()
        .create_user(User::new("Sarah Johnson".into(), DEMO_MANAGER_EMAIL, UserRole::Manager, password_hash.clone()))
        .await?;
    let user = storage
        .users()
        .create_user(User::new("Mike Chen".into(), DEMO_USER_EMAIL, UserRole::User, password_hash))
        .await?;

    let owners = [&manager.id, &manager.id, &user.id, &admin.id];
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap_or_default();
    let now = Utc::now();

    for (index, (demo, owner)) in DEMO_PROJECTS.iter().zip(owners).enumerate() {
        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: owner.clone(),
            name: demo.name.to_string(),
            description: None,
            location: Some(demo.location.to_string()),
            status: demo.status,
            budget: demo.budget,
            spent: demo.spent,
            progress: demo.progress,
            cpi: demo.cpi,
            spi: demo.spi,
            quality_score: demo.quality,
            safety_score: demo.safety,
            risk_level: demo.risk,
            start_date: Some(start + Duration::weeks(index as i64 * 6)),
            end_date: Some(start + Duration::weeks(index as i64 * 6 + 52)),
            created_at: now - Duration::days(30 - index as i64),
            updated_at: now,
        };
        let project_id = project.id.clone();
        storage.projects().insert_project(project).await?;

        for (name, unit, current, minimum, cost) in [
            ("Ready-mix concrete", "m3", 120.0, 80.0, 145.0),
            ("Rebar #5", "t", 6.0, 10.0, 980.0),
            ("Drywall sheets", "sheet", 40.0, 200.0, 14.5),
        ] {
            let material = CreateMaterial {
                name: name.to_string(),
                category: Some("Structural".to_string()),
                unit: Some(unit.to_string()),
                current_stock: Some(current),
                minimum_stock: Some(minimum),
                unit_cost: Some(cost),
                supplier: Some("Midwest Builders Supply".to_string()),
            }
            .into_material(&project_id)?;
            storage.materials().insert_material(material).await?;
        }
    }

    log::warn!(
        "Demo data seeded: accounts {}, {}, {} share a published demo password",
        DEMO_ADMIN_EMAIL,
        DEMO_MANAGER_EMAIL,
        DEMO_USER_EMAIL
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorageProvider;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStorageProvider::new();
        seed_demo_data(&store).await.unwrap();
        seed_demo_data(&store).await.unwrap();
        assert_eq!(store.users().list_users().await.unwrap().len(), 3);
        assert_eq!(store.projects().list_projects(None).await.unwrap().len(), 4);
    }
}
