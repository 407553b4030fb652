//! Domain entities and their request bodies

pub mod file;
pub mod material;
pub mod project;

pub use file::{FileQuery, FileRecord};
pub use material::{CreateMaterial, Material, StockStatus, UpdateMaterial};
pub use project::{CreateProject, Project, ProjectStatus, RiskLevel, UpdateProject};
