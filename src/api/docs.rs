//! Docs navigation endpoint

use axum::{extract::State, Json};

use crate::docs::{compose, DocsPage};
use crate::server::state::AppState;

/// `GET /docs/config`: props of the docs page, local menu first
pub async fn docs_config(State(state): State<AppState>) -> Json<DocsPage> {
    Json(compose(&state.docs, &state.settings.docs))
}
