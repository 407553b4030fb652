//! Project entity and request bodies

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SiteWorkError};
use crate::validation::Validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Planning,
        ProjectStatus::Active,
        ProjectStatus::Completed,
        ProjectStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on_hold",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = SiteWorkError;

    fn from_str(s: &str) -> Result<Self> {
        ProjectStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| SiteWorkError::invalid_field("status", &format!("Unknown status '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = SiteWorkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(SiteWorkError::invalid_field(
                "risk_level",
                &format!("Unknown risk level '{}'", other),
            )),
        }
    }
}

/// A construction project, owned by the user who created it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: ProjectStatus,
    pub budget: f64,
    pub spent: f64,
    /// Completion percentage, 0 to 100
    pub progress: f64,
    /// Cost performance index
    pub cpi: f64,
    /// Schedule performance index
    pub spi: f64,
    pub quality_score: f64,
    pub safety_score: f64,
    pub risk_level: RiskLevel,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Budget utilization in whole percent: round(spent / budget * 100).
    /// Not clamped, so over-budget projects report more than 100.
    pub fn budget_utilization(&self) -> i64 {
        budget_utilization(self.budget, self.spent)
    }

    pub fn is_over_budget(&self) -> bool {
        self.spent > self.budget
    }
}

pub fn budget_utilization(budget: f64, spent: f64) -> i64 {
    if budget <= 0.0 {
        return 0;
    }
    (spent / budget * 100.0).round() as i64
}

/// Body of `POST /api/projects`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub budget: Option<f64>,
    pub spent: Option<f64>,
    pub progress: Option<f64>,
    pub cpi: Option<f64>,
    pub spi: Option<f64>,
    pub quality_score: Option<f64>,
    pub safety_score: Option<f64>,
    pub risk_level: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Body of `PUT /api/projects/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub budget: Option<f64>,
    pub spent: Option<f64>,
    pub progress: Option<f64>,
    pub cpi: Option<f64>,
    pub spi: Option<f64>,
    pub quality_score: Option<f64>,
    pub safety_score: Option<f64>,
    pub risk_level: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[allow(clippy::too_many_arguments)]
fn check_numbers(
    v: &mut Validator,
    budget: Option<f64>,
    spent: Option<f64>,
    progress: Option<f64>,
    cpi: Option<f64>,
    spi: Option<f64>,
    quality: Option<f64>,
    safety: Option<f64>,
) {
    v.non_negative("budget", budget);
    v.non_negative("spent", spent);
    v.range("progress", progress, 0.0, 100.0);
    v.non_negative("cpi", cpi);
    v.non_negative("spi", spi);
    v.range("quality_score", quality, 0.0, 100.0);
    v.range("safety_score", safety, 0.0, 100.0);
}

fn check_dates(v: &mut Validator, start: Option<NaiveDate>, end: Option<NaiveDate>) {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            v.error("end_date", "end_date must not be before start_date");
        }
    }
}

impl CreateProject {
    /// Validate the body and build a new project owned by `user_id`
    pub fn into_project(self, user_id: &str) -> Result<Project> {
        let mut v = Validator::new();
        v.text("name", &self.name, 200);
        v.optional_text("description", self.description.as_deref(), 5000);
        v.optional_text("location", self.location.as_deref(), 300);
        let status = v.parse::<ProjectStatus>("status", self.status.as_deref());
        let risk_level = v.parse::<RiskLevel>("risk_level", self.risk_level.as_deref());
        check_numbers(
            &mut v,
            self.budget,
            self.spent,
            self.progress,
            self.cpi,
            self.spi,
            self.quality_score,
            self.safety_score,
        );
        check_dates(&mut v, self.start_date, self.end_date);
        v.finish()?;

        let now = Utc::now();
        Ok(Project {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            location: self.location,
            status: status.unwrap_or(ProjectStatus::Planning),
            budget: self.budget.unwrap_or(0.0),
            spent: self.spent.unwrap_or(0.0),
            progress: self.progress.unwrap_or(0.0),
            cpi: self.cpi.unwrap_or(1.0),
            spi: self.spi.unwrap_or(1.0),
            quality_score: self.quality_score.unwrap_or(100.0),
            safety_score: self.safety_score.unwrap_or(100.0),
            risk_level: risk_level.unwrap_or(RiskLevel::Low),
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: now,
            updated_at: now,
        })
    }
}

impl UpdateProject {
    /// Validate the body and apply it to `project`. Status changes are not
    /// checked against the current status.
    pub fn apply(self, project: &mut Project) -> Result<()> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.text("name", name, 200);
        }
        v.optional_text("description", self.description.as_deref(), 5000);
        v.optional_text("location", self.location.as_deref(), 300);
        let status = v.parse::<ProjectStatus>("status", self.status.as_deref());
        let risk_level = v.parse::<RiskLevel>("risk_level", self.risk_level.as_deref());
        check_numbers(
            &mut v,
            self.budget,
            self.spent,
            self.progress,
            self.cpi,
            self.spi,
            self.quality_score,
            self.safety_score,
        );
        check_dates(
            &mut v,
            self.start_date.or(project.start_date),
            self.end_date.or(project.end_date),
        );
        v.finish()?;

        if let Some(name) = self.name {
            project.name = name.trim().to_string();
        }
        if self.description.is_some() {
            project.description = self.description;
        }
        if self.location.is_some() {
            project.location = self.location;
        }
        if let Some(status) = status {
            project.status = status;
        }
        if let Some(risk_level) = risk_level {
            project.risk_level = risk_level;
        }
        if let Some(budget) = self.budget {
            project.budget = budget;
        }
        if let Some(spent) = self.spent {
            project.spent = spent;
        }
        if let Some(progress) = self.progress {
            project.progress = progress;
        }
        if let Some(cpi) = self.cpi {
            project.cpi = cpi;
        }
        if let Some(spi) = self.spi {
            project.spi = spi;
        }
        if let Some(quality) = self.quality_score {
            project.quality_score = quality;
        }
        if let Some(safety) = self.safety_score {
            project.safety_score = safety;
        }
        if self.start_date.is_some() {
            project.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            project.end_date = self.end_date;
        }
        project.updated_at = Utc::now();
        Ok(())
    }
}
