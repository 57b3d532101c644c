//! Tool catalog
//!
//! The catalog is owned by the surrounding application (a backend store);
//! the engine only reads it. Tool records are used as templates for action
//! nodes dropped onto the canvas.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::catalog::{ALL_CATEGORIES, MAX_RESULTS};
use crate::error::Result;

/// A selectable tool from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Image URL
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub rating: f32,
}

/// Search and category filter for browsing tools
#[derive(Debug, Clone, Default)]
pub struct ToolQuery {
    /// Case-insensitive substring of the tool name; empty matches all
    pub search: String,
    /// Category name; `None` or `"All"` matches all
    pub category: Option<String>,
}

impl ToolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Check whether a tool passes this filter
    pub fn matches(&self, tool: &ToolRecord) -> bool {
        let category_ok = match self.category.as_deref() {
            None | Some(ALL_CATEGORIES) => true,
            Some(category) => tool.category == category,
        };
        let search = self.search.trim();
        let search_ok =
            search.is_empty() || tool.name.to_lowercase().contains(&search.to_lowercase());
        category_ok && search_ok
    }
}

/// Ordered, read-only set of tool records
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolRecord>,
    max_results: usize,
}

impl ToolCatalog {
    pub fn new(tools: Vec<ToolRecord>) -> Self {
        Self {
            tools,
            max_results: MAX_RESULTS,
        }
    }

    /// Cap the number of tools a filtered listing returns
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// All tools, in catalog order
    pub fn tools(&self) -> &[ToolRecord] {
        &self.tools
    }

    pub fn get(&self, id: &str) -> Option<&ToolRecord> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Tools matching `query`, in catalog order, capped at the result limit
    pub fn filter(&self, query: &ToolQuery) -> Vec<&ToolRecord> {
        self.tools
            .iter()
            .filter(|t| query.matches(t))
            .take(self.max_results)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Source of tool records
///
/// Abstracts the backend store that owns the catalog.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch the tool records, in display order
    async fn fetch_tools(&self) -> Result<Vec<ToolRecord>>;
}

/// Provider over an in-memory list
pub struct StaticCatalog {
    tools: Vec<ToolRecord>,
}

impl StaticCatalog {
    pub fn new(tools: Vec<ToolRecord>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn fetch_tools(&self) -> Result<Vec<ToolRecord>> {
        Ok(self.tools.clone())
    }
}

/// Provider reading a JSON array of tool records from disk
///
/// Entries that do not parse as a tool record are skipped with a warning.
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CatalogProvider for JsonFileCatalog {
    async fn fetch_tools(&self) -> Result<Vec<ToolRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let entries: Vec<serde_json::Value> = serde_json::from_str(&content)?;

        let mut tools = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<ToolRecord>(entry) {
                Ok(tool) => tools.push(tool),
                Err(e) => {
                    log::warn!(
                        "Skipping catalog entry {} in {:?}: {}",
                        index,
                        self.path,
                        e
                    );
                }
            }
        }
        log::debug!("Loaded {} tools from {:?}", tools.len(), self.path);
        Ok(tools)
    }
}
