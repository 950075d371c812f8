//! In-memory product catalog loaded from JSON files.
//!
//! Each `*.json` file in the catalog directory holds a JSON array of product
//! records. Files are read in file-name order and records are kept in file
//! order then array order; that order is the catalog iteration order used
//! for stable result ordering downstream.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use grocer_core::error::{GrocerError, Result};
use grocer_core::types::ProductRecord;

/// Read-only product catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    products: Vec<ProductRecord>,
}

impl CatalogStore {
    /// Build a catalog from records already in memory.
    ///
    /// Fails on duplicate product ids.
    pub fn from_records(records: Vec<ProductRecord>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id.as_str()) {
                return Err(GrocerError::Catalog(format!(
                    "duplicate product id '{}'",
                    record.id
                )));
            }
        }
        Ok(Self { products: records })
    }

    /// Load every `*.json` file in `dir`.
    ///
    /// A missing directory yields an empty catalog with a warning. Any file
    /// that cannot be read or parsed, a negative price, or a duplicate id
    /// fails the whole load.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            warn!(dir = %dir.display(), "Catalog directory not found, starting with empty catalog");
            return Ok(Self::default());
        }

        let files = json_files(dir)?;
        if files.is_empty() {
            warn!(dir = %dir.display(), "No catalog files found");
        }

        let mut records = Vec::new();
        for file in &files {
            let mut batch = load_file(file)?;
            debug!(file = %file.display(), count = batch.len(), "Catalog file loaded");
            records.append(&mut batch);
        }

        let store = Self::from_records(records)?;
        info!(
            dir = %dir.display(),
            files = files.len(),
            products = store.len(),
            "Catalog loaded"
        );
        Ok(store)
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Unique vendor names in first-seen order.
    pub fn vendors(&self) -> Vec<String> {
        unique(self.products.iter().map(|p| p.vendor.as_str()))
    }

    /// Unique categories in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        unique(self.products.iter().map(|p| p.category.as_str()))
    }

    /// Unique tags in first-seen order.
    pub fn tags(&self) -> Vec<String> {
        unique(
            self.products
                .iter()
                .flat_map(|p| p.tags.iter().map(String::as_str)),
        )
    }

    /// Unique brands in first-seen order.
    pub fn brands(&self) -> Vec<String> {
        unique(self.products.iter().map(|p| p.brand.as_str()))
    }
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn load_file(path: &Path) -> Result<Vec<ProductRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GrocerError::Catalog(format!("failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| GrocerError::Catalog(format!("failed to parse {}: {}", path.display(), e)))
}

/// Case-sensitive uniqueness; the catalog's own spelling is canonical.
fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| !v.trim().is_empty())
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
