use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use crate::cache::{CACHE_VALIDITY, FileCache};
use crate::catalog::{Catalog, CatalogSeed};
use crate::generator::ReviewRequestGenerator;
use crate::kobold::KoboldClient;
use crate::settings::{JsonFileSettings, SettingsMap, SettingsProvider};
use crate::state::AppState;

// State over a temp dir, a one-company catalog and a backend at `backend_url`
pub fn test_state(backend_url: &str) -> (Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let settings: Arc<dyn SettingsProvider> = Arc::new(JsonFileSettings::new(dir.path().join("settings.json")));
    let input: SettingsMap = serde_json::from_value(json!({ "kobold_api_url": backend_url })).unwrap();
    settings.save_settings(&input).unwrap();

    let seed: CatalogSeed = serde_json::from_value(json!({
        "categories": [{ "id": "cat-1", "name": "Elettronica" }],
        "companies": [{ "id": "co-1", "name": "Acme", "email": "info@acme.it", "category": "cat-1" }],
        "templates": [{ "id": "tpl-1", "name": "Base", "content": "Gentile [Nome Azienda], [Nome]" }]
    }))
    .unwrap();
    let catalog = Arc::new(Catalog::from_seed(seed));

    let client = KoboldClient::new(reqwest::Client::new(), settings.clone()).with_env(|_| None);
    let cache = FileCache::new(dir.path().join("ai_cache"), CACHE_VALIDITY);
    let generator = ReviewRequestGenerator::new(client, cache, catalog.clone());

    let state = Arc::new(AppState {
        generator,
        catalog,
        settings,
    });
    (state, dir)
}
