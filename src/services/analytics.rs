//! Aggregate statistics over projects and materials

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::auth::{owner_scope, Authorizer, User};
use crate::error::Result;
use crate::models::project::budget_utilization;
use crate::models::{Material, Project, ProjectStatus, RiskLevel, StockStatus};
use crate::storage::SharedStorage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialSummary {
    pub total: usize,
    pub adequate: usize,
    pub low: usize,
    pub critical: usize,
    /// Sum of current_stock * unit_cost
    pub inventory_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectMetrics {
    pub project_id: String,
    pub budget: f64,
    pub spent: f64,
    pub budget_utilization: i64,
    pub remaining_budget: f64,
    pub over_budget: bool,
    /// Earned value minus actual cost: budget * progress / 100 - spent
    pub cost_variance: f64,
    pub progress: f64,
    pub cpi: f64,
    pub spi: f64,
    pub materials: MaterialSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub project_count: usize,
    pub total_budget: f64,
    pub total_spent: f64,
    pub budget_utilization: i64,
    pub average_progress: f64,
    pub average_cpi: f64,
    pub average_spi: f64,
    pub average_quality_score: f64,
    pub average_safety_score: f64,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_risk: BTreeMap<&'static str, usize>,
    pub over_budget_count: usize,
}

pub fn material_summary(materials: &[Material]) -> MaterialSummary {
    let count = |status: StockStatus| materials.iter().filter(|m| m.status == status).count();
    MaterialSummary {
        total: materials.len(),
        adequate: count(StockStatus::Adequate),
        low: count(StockStatus::Low),
        critical: count(StockStatus::Critical),
        inventory_value: materials.iter().map(Material::inventory_value).sum(),
    }
}

pub fn project_metrics(project: &Project, materials: &[Material]) -> ProjectMetrics {
    ProjectMetrics {
        project_id: project.id.clone(),
        budget: project.budget,
        spent: project.spent,
        budget_utilization: project.budget_utilization(),
        remaining_budget: project.budget - project.spent,
        over_budget: project.is_over_budget(),
        cost_variance: project.budget * project.progress / 100.0 - project.spent,
        progress: project.progress,
        cpi: project.cpi,
        spi: project.spi,
        materials: material_summary(materials),
    }
}

pub fn portfolio_summary(projects: &[Project]) -> PortfolioSummary {
    let average = |value: fn(&Project) -> f64| {
        if projects.is_empty() {
            0.0
        } else {
            projects.iter().map(value).sum::<f64>() / projects.len() as f64
        }
    };

    let mut by_status: BTreeMap<&'static str, usize> =
        ProjectStatus::ALL.iter().map(|status| (status.as_str(), 0)).collect();
    let mut by_risk: BTreeMap<&'static str, usize> =
        RiskLevel::ALL.iter().map(|risk| (risk.as_str(), 0)).collect();
    for project in projects {
        *by_status.entry(project.status.as_str()).or_insert(0) += 1;
        *by_risk.entry(project.risk_level.as_str()).or_insert(0) += 1;
    }

    let total_budget: f64 = projects.iter().map(|p| p.budget).sum();
    let total_spent: f64 = projects.iter().map(|p| p.spent).sum();

    PortfolioSummary {
        project_count: projects.len(),
        total_budget,
        total_spent,
        budget_utilization: budget_utilization(total_budget, total_spent),
        average_progress: average(|p| p.progress),
        average_cpi: average(|p| p.cpi),
        average_spi: average(|p| p.spi),
        average_quality_score: average(|p| p.quality_score),
        average_safety_score: average(|p| p.safety_score),
        by_status,
        by_risk,
        over_budget_count: projects.iter().filter(|p| p.is_over_budget()).count(),
    }
}

pub struct AnalyticsService {
    storage: SharedStorage,
    authorizer: Arc<Authorizer>,
}

impl AnalyticsService {
    pub fn new(storage: SharedStorage, authorizer: Arc<Authorizer>) -> Self {
        Self { storage, authorizer }
    }

    pub async fn project_metrics(&self, user: &User, project_id: &str) -> Result<ProjectMetrics> {
        let project = self.authorizer.owned_project(user, project_id).await?;
        let materials = self.storage.materials().list_materials(&project.id).await?;
        Ok(project_metrics(&project, &materials))
    }

    /// Summary of the projects visible to `user`
    pub async fn summary_for(&self, user: &User) -> Result<PortfolioSummary> {
        let projects = self.storage.projects().list_projects(owner_scope(user)).await?;
        Ok(portfolio_summary(&projects))
    }

    /// Summary across every project
    pub async fn portfolio_report(&self) -> Result<PortfolioSummary> {
        let projects = self.storage.projects().list_projects(None).await?;
        Ok(portfolio_summary(&projects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateMaterial, CreateProject};

    fn project(budget: f64, spent: f64, progress: f64, status: &str) -> Project {
        CreateProject {
            name: "P".into(),
            budget: Some(budget),
            spent: Some(spent),
            progress: Some(progress),
            status: Some(status.into()),
            ..Default::default()
        }
        .into_project("owner")
        .unwrap()
    }

    fn material(current: f64, minimum: f64, cost: f64) -> Material {
        CreateMaterial {
            name: "M".into(),
            current_stock: Some(current),
            minimum_stock: Some(minimum),
            unit_cost: Some(cost),
            ..Default::default()
        }
        .into_material("p")
        .unwrap()
    }

    #[test]
    fn test_project_metrics() {
        let p = project(850_000.0, 585_000.0, 68.0, "active");
        let m = project_metrics(&p, &[material(10.0, 5.0, 2.0), material(1.0, 5.0, 10.0)]);
        assert_eq!(m.budget_utilization, 69);
        assert_eq!(m.remaining_budget, 265_000.0);
        assert!(!m.over_budget);
        assert!((m.cost_variance - (578_000.0 - 585_000.0)).abs() < 1e-6);
        assert_eq!(m.materials.total, 2);
        assert_eq!(m.materials.critical, 1);
        assert_eq!(m.materials.inventory_value, 30.0);
    }

    #[test]
    fn test_over_budget_is_reported_not_clamped() {
        let p = project(100.0, 150.0, 50.0, "active");
        let m = project_metrics(&p, &[]);
        assert_eq!(m.budget_utilization, 150);
        assert!(m.over_budget);
        assert_eq!(m.remaining_budget, -50.0);
    }

    #[test]
    fn test_portfolio_summary() {
        let projects = vec![
            project(100.0, 50.0, 40.0, "active"),
            project(300.0, 350.0, 80.0, "on_hold"),
        ];
        let s = portfolio_summary(&projects);
        assert_eq!(s.project_count, 2);
        assert_eq!(s.total_budget, 400.0);
        assert_eq!(s.budget_utilization, 100);
        assert_eq!(s.average_progress, 60.0);
        assert_eq!(s.by_status["active"], 1);
        assert_eq!(s.by_status["on_hold"], 1);
        assert_eq!(s.by_status["planning"], 0);
        assert_eq!(s.by_risk["low"], 2);
        assert_eq!(s.over_budget_count, 1);
    }

    #[test]
    fn test_empty_portfolio_averages_are_zero() {
        let s = portfolio_summary(&[]);
        assert_eq!(s.project_count, 0);
        assert_eq!(s.average_cpi, 0.0);
        assert_eq!(s.budget_utilization, 0);
    }
}
