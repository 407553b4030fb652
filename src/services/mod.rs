//! Resource services. Every operation is scoped to the acting user, with
//! admins seeing all records.

pub mod analytics;
pub mod files;
pub mod materials;
pub mod projects;

pub use analytics::{AnalyticsService, MaterialSummary, PortfolioSummary, ProjectMetrics};
pub use files::{FileService, UploadedFile};
pub use materials::MaterialService;
pub use projects::{ProjectQuery, ProjectService};
