//! Sponsors endpoint
//!
//! `GET|POST /api/github-sponsors-webhook` runs a full aggregation and answers
//! `{ sponsors, tiers }` with the public sponsors only. The request body, if
//! any, is ignored.

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::ApiError;
use crate::schemas::{Sponsor, SponsorsResponse};
use crate::server::state::AppState;

pub async fn get_sponsors(State(state): State<AppState>) -> Result<Json<SponsorsResponse>, ApiError> {
    let started = Instant::now();

    let Some(service) = state.sponsors.clone() else {
        let err = ApiError::NotConfigured(
            "GitHub and Airtable credentials are required to list sponsors".to_string(),
        );
        state.metrics.record_aggregation(err.error_type(), 0.0);
        return Err(err);
    };

    let result = service.get_sponsors_and_tiers().await;
    let seconds = started.elapsed().as_secs_f64();

    let snapshot = match result {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let err = ApiError::from(e);
            state.metrics.record_aggregation(err.error_type(), seconds);
            return Err(err);
        }
    };

    state.metrics.record_aggregation("ok", seconds);
    state.metrics.record_tier_mirror(&snapshot.tier_mirror);

    let total = snapshot.sponsors.len();
    let sponsors: Vec<Sponsor> = snapshot
        .sponsors
        .into_iter()
        .filter(Sponsor::is_public)
        .collect();

    tracing::debug!(
        public = sponsors.len(),
        hidden = total - sponsors.len(),
        "Filtered sponsors"
    );

    Ok(Json(SponsorsResponse {
        sponsors,
        tiers: snapshot.tiers,
    }))
}
