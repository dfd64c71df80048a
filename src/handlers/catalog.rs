use axum::{Json, extract::State};
use std::sync::Arc;

use crate::models::Category;
use crate::state::AppState;

pub async fn categories_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Category>> {
    Json(state.catalog.categories())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::test_state;

    #[tokio::test]
    async fn lists_seeded_categories() {
        let (state, _dir) = test_state("http://127.0.0.1:9");

        let Json(categories) = categories_handler(State(state)).await;

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Elettronica");
    }
}
