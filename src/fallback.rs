use tracing::error;

use crate::catalog::{CatalogError, CategoryLookup};
use crate::models::{Company, Template};

pub const DEFAULT_CATEGORY_NAME: &str = "prodotti";
pub const SIGNATURE: &str = "Team C-Recenzione";

/// Fill the template placeholders without the generation backend.
///
/// A failed category lookup is logged and the template body is returned
/// untouched.
pub fn generate_fallback(company: &Company, template: &Template, categories: &dyn CategoryLookup) -> String {
    match substitute(company, template, categories) {
        Ok(text) => text,
        Err(e) => {
            error!(company = %company.name, error = %e, "fallback substitution failed");
            template.content.clone()
        }
    }
}

fn substitute(company: &Company, template: &Template, categories: &dyn CategoryLookup) -> Result<String, CatalogError> {
    let category_name = match company.category.as_deref() {
        Some(id) => categories.category_display_name(id)?,
        None => None,
    }
    .unwrap_or_else(|| DEFAULT_CATEGORY_NAME.to_string());

    Ok(template
        .content
        .replace("[Nome Azienda]", &company.name)
        .replace("[Categoria]", &category_name)
        .replace("[Nome]", SIGNATURE))
}
