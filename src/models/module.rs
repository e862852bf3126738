// src/models/module.rs

use serde::{Deserialize, Serialize};

/// A learning module as listed by GET /modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Completion percentage, 0..=100.
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub progress: u32,
}

/// A category inside a module, as returned by GET /modules/:id/categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub progress: u32,
}

/// Body of the category-progress endpoint.
#[derive(Debug, Deserialize)]
pub struct CategoryProgress {
    #[serde(default)]
    pub progress: u32,
}
