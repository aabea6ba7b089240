//! Category descriptors and the entries returned by the categories endpoint.

use serde::{Deserialize, Serialize};

/// Value of the synthetic "everything" entry.
pub const ALL_CATEGORY: &str = "all";
/// Value of the synthetic curated entry.
pub const PROMOTED_CATEGORY: &str = "promoted";

/// Curated display mapping for a raw category value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDescriptor {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display position; lower comes first.
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CategoryDescriptor {
    pub fn new(value: impl Into<String>, label: impl Into<String>, order: i64) -> Self {
        Self { value: value.into(), label: label.into(), description: None, order, is_active: true }
    }
}

/// One entry of the public category list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryEntry {
    pub fn all() -> Self {
        Self {
            value: ALL_CATEGORY.to_string(),
            label: "All".to_string(),
            description: Some("Browse all shared agents".to_string()),
        }
    }

    pub fn promoted() -> Self {
        Self {
            value: PROMOTED_CATEGORY.to_string(),
            label: "Top Picks".to_string(),
            description: Some("Recommended by the curators".to_string()),
        }
    }

    /// Entry for a category value with no descriptor: the raw value is the label.
    pub fn raw(value: impl Into<String>) -> Self {
        let value = value.into();
        Self { label: value.clone(), value, description: None }
    }
}

impl From<CategoryDescriptor> for CategoryEntry {
    fn from(d: CategoryDescriptor) -> Self {
        Self { value: d.value, label: d.label, description: d.description }
    }
}
