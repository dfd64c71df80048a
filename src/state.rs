use std::sync::Arc;

use crate::catalog::Catalog;
use crate::generator::ReviewRequestGenerator;
use crate::settings::SettingsProvider;

// app's shared state
pub struct AppState {
    pub generator: ReviewRequestGenerator,
    pub catalog: Arc<Catalog>,
    pub settings: Arc<dyn SettingsProvider>,
}
