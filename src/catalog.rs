use dashmap::DashMap;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Category, Company, Template};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

// Category names for the fallback generator
pub trait CategoryLookup: Send + Sync {
    fn category_display_name(&self, category_id: &str) -> Result<Option<String>, CatalogError>;
}

// On-disk layout of the seed file
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub templates: Vec<Template>,
}

// Read-only view over categories, companies and templates, keyed by id
#[derive(Default)]
pub struct Catalog {
    categories: DashMap<String, Category>,
    companies: DashMap<String, Company>,
    templates: DashMap<String, Template>,
}

impl Catalog {
    pub fn from_seed(seed: CatalogSeed) -> Self {
        let catalog = Self::default();
        for category in seed.categories {
            catalog.categories.insert(category.id.clone(), category);
        }
        for company in seed.companies {
            catalog.companies.insert(company.id.clone(), company);
        }
        for template in seed.templates {
            catalog.templates.insert(template.id.clone(), template);
        }
        catalog
    }

    // A missing file yields an empty catalog; a malformed one is an error
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "catalog file not found, starting empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let catalog = Self::from_seed(serde_json::from_str(&raw)?);
        info!(
            categories = catalog.categories.len(),
            companies = catalog.companies.len(),
            templates = catalog.templates.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn company(&self, id: &str) -> Option<Company> {
        self.companies.get(id).map(|c| c.clone())
    }

    pub fn template(&self, id: &str) -> Option<Template> {
        self.templates.get(id).map(|t| t.clone())
    }

    // Sorted by id
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self.categories.iter().map(|c| c.value().clone()).collect();
        categories.sort_by(|a, b| a.id.cmp(&b.id));
        categories
    }
}

impl CategoryLookup for Catalog {
    fn category_display_name(&self, category_id: &str) -> Result<Option<String>, CatalogError> {
        Ok(self.categories.get(category_id).map(|c| c.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_seed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{
                "categories": [
                    { "id": "cat-2", "name": "Giardinaggio" },
                    { "id": "cat-1", "name": "Elettronica" }
                ],
                "companies": [{ "id": "co-1", "name": "Acme", "category": "cat-1" }],
                "templates": [{ "id": "tpl-1", "name": "Base", "content": "Ciao [Nome Azienda]" }]
            }"#,
        )
        .unwrap();

        let catalog = Catalog::load(&path).unwrap();

        assert_eq!(catalog.company("co-1").unwrap().name, "Acme");
        assert_eq!(catalog.template("tpl-1").unwrap().content, "Ciao [Nome Azienda]");
        assert_eq!(catalog.category_display_name("cat-1").unwrap().as_deref(), Some("Elettronica"));
        assert_eq!(catalog.category_display_name("cat-9").unwrap(), None);

        let ids: Vec<String> = catalog.categories().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["cat-1", "cat-2"]);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::load(&dir.path().join("absent.json")).unwrap();
        assert!(catalog.company("co-1").is_none());
        assert!(catalog.categories().is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(Catalog::load(&path), Err(CatalogError::Parse(_))));
    }
}
