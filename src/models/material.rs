//! Materials tracked against a project

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::validation::Validator;

/// Stock ratio below which a material is critical
pub const CRITICAL_STOCK_RATIO: f64 = 0.5;
/// Stock ratio below which a material is low
pub const LOW_STOCK_RATIO: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Adequate,
    Low,
    Critical,
}

impl StockStatus {
    /// Classify stock by the ratio of current to minimum stock
    pub fn from_stock(current: f64, minimum: f64) -> Self {
        if minimum <= 0.0 {
            return StockStatus::Adequate;
        }
        let ratio = current / minimum;
        if ratio < CRITICAL_STOCK_RATIO {
            StockStatus::Critical
        } else if ratio < LOW_STOCK_RATIO {
            StockStatus::Low
        } else {
            StockStatus::Adequate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Adequate => "adequate",
            StockStatus::Low => "low",
            StockStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: String,
    pub current_stock: f64,
    pub minimum_stock: f64,
    pub unit_cost: f64,
    pub supplier: Option<String>,
    pub status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Material {
    /// Recompute the stock status from current levels
    pub fn refresh_status(&mut self) {
        self.status = StockStatus::from_stock(self.current_stock, self.minimum_stock);
    }

    pub fn inventory_value(&self) -> f64 {
        self.current_stock * self.unit_cost
    }
}

/// Body of `POST /api/projects/:id/materials`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateMaterial {
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub current_stock: Option<f64>,
    pub minimum_stock: Option<f64>,
    pub unit_cost: Option<f64>,
    pub supplier: Option<String>,
}

/// Body of `PUT /api/materials/:id`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateMaterial {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub current_stock: Option<f64>,
    pub minimum_stock: Option<f64>,
    pub unit_cost: Option<f64>,
    pub supplier: Option<String>,
}

impl CreateMaterial {
    pub fn into_material(self, project_id: &str) -> Result<Material> {
        let mut v = Validator::new();
        v.text("name", &self.name, 200);
        v.optional_text("category", self.category.as_deref(), 100);
        v.optional_text("unit", self.unit.as_deref(), 30);
        v.optional_text("supplier", self.supplier.as_deref(), 200);
        v.non_negative("current_stock", self.current_stock);
        v.non_negative("minimum_stock", self.minimum_stock);
        v.non_negative("unit_cost", self.unit_cost);
        v.finish()?;

        let now = Utc::now();
        let mut material = Material {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: self.name.trim().to_string(),
            category: self.category,
            unit: self.unit.unwrap_or_else(|| "unit".to_string()),
            current_stock: self.current_stock.unwrap_or(0.0),
            minimum_stock: self.minimum_stock.unwrap_or(0.0),
            unit_cost: self.unit_cost.unwrap_or(0.0),
            supplier: self.supplier,
            status: StockStatus::Adequate,
            created_at: now,
            updated_at: now,
        };
        material.refresh_status();
        Ok(material)
    }
}

impl UpdateMaterial {
    pub fn apply(self, material: &mut Material) -> Result<()> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.text("name", name, 200);
        }
        v.optional_text("category", self.category.as_deref(), 100);
        v.optional_text("unit", self.unit.as_deref(), 30);
        v.optional_text("supplier", self.supplier.as_deref(), 200);
        v.non_negative("current_stock", self.current_stock);
        v.non_negative("minimum_stock", self.minimum_stock);
        v.non_negative("unit_cost", self.unit_cost);
        v.finish()?;

        if let Some(name) = self.name {
            material.name = name.trim().to_string();
        }
        if self.category.is_some() {
            material.category = self.category;
        }
        if let Some(unit) = self.unit {
            material.unit = unit;
        }
        if let Some(current) = self.current_stock {
            material.current_stock = current;
        }
        if let Some(minimum) = self.minimum_stock {
            material.minimum_stock = minimum;
        }
        if let Some(cost) = self.unit_cost {
            material.unit_cost = cost;
        }
        if self.supplier.is_some() {
            material.supplier = self.supplier;
        }
        material.refresh_status();
        material.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status_thresholds() {
        assert_eq!(StockStatus::from_stock(100.0, 100.0), StockStatus::Adequate);
        assert_eq!(StockStatus::from_stock(99.0, 100.0), StockStatus::Low);
        assert_eq!(StockStatus::from_stock(50.0, 100.0), StockStatus::Low);
        assert_eq!(StockStatus::from_stock(49.9, 100.0), StockStatus::Critical);
        assert_eq!(StockStatus::from_stock(0.0, 100.0), StockStatus::Critical);
        assert_eq!(StockStatus::from_stock(0.0, 0.0), StockStatus::Adequate);
    }

    #[test]
    fn test_status_follows_stock_updates() {
        let mut material = CreateMaterial {
            name: "Rebar".into(),
            current_stock: Some(500.0),
            minimum_stock: Some(200.0),
            unit_cost: Some(2.5),
            ..Default::default()
        }
        .into_material("p1")
        .unwrap();
        assert_eq!(material.status, StockStatus::Adequate);
        assert_eq!(material.inventory_value(), 1250.0);

        UpdateMaterial {
            current_stock: Some(80.0),
            ..Default::default()
        }
        .apply(&mut material)
        .unwrap();
        assert_eq!(material.status, StockStatus::Critical);
    }

    #[test]
    fn test_negative_stock_rejected() {
        let result = CreateMaterial {
            name: "Cement".into(),
            current_stock: Some(-1.0),
            ..Default::default()
        }
        .into_material("p1");
        assert!(result.is_err());
    }
}
