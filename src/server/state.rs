//! Application state container
//!
//! Shared resources passed to every handler via Axum's state extraction.

use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::docs::DocsConfig;
use crate::middleware::Metrics;
use crate::services::{
    AirtableClient, AirtableClientConfig, GithubService, GithubServiceConfig, SponsorTables,
    SponsorsService,
};

/// Shared application state
///
/// Cheap to clone; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,

    /// `None` when the GitHub or Airtable credentials are missing
    pub sponsors: Option<Arc<SponsorsService>>,

    /// Shared docs configuration, read at startup
    pub docs: Arc<DocsConfig>,

    pub metrics: Arc<Metrics>,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Build the upstream clients from the settings and read the docs config
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let sponsors = build_sponsors_service(&settings)?;
        if sponsors.is_none() {
            tracing::warn!("Sponsor services disabled: missing GitHub or Airtable credentials");
        }

        let docs = DocsConfig::load(settings.docs.config_path.as_deref())?;

        let state = Self::from_parts(settings, sponsors, docs)?;

        tracing::info!("Application state initialized successfully");

        Ok(state)
    }

    /// Assemble a state from already built parts
    pub fn from_parts(
        settings: Settings,
        sponsors: Option<SponsorsService>,
        docs: DocsConfig,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            settings: Arc::new(settings),
            sponsors: sponsors.map(Arc::new),
            docs: Arc::new(docs),
            metrics: Arc::new(Metrics::new()?),
            start_time: Instant::now(),
        })
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn sponsors_enabled(&self) -> bool {
        self.sponsors.is_some()
    }
}

impl FromRef<AppState> for Arc<Metrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

fn build_sponsors_service(settings: &Settings) -> anyhow::Result<Option<SponsorsService>> {
    let (Some(token), Some(api_key), Some(base_id)) = (
        settings.github.auth_token.as_ref(),
        settings.airtable.api_key.as_ref(),
        settings.airtable.base_id.as_ref(),
    ) else {
        return Ok(None);
    };

    tracing::debug!(
        graphql_url = %settings.github.graphql_url,
        airtable_url = %settings.airtable.base_url,
        base_id = %base_id,
        "Creating upstream clients"
    );

    let github = GithubService::new(
        GithubServiceConfig::new(token.clone())
            .with_graphql_url(settings.github.graphql_url.clone())
            .with_user_agent(settings.github.user_agent.clone())
            .with_timeout(settings.http_timeout_seconds),
    )?;

    let airtable = AirtableClient::new(
        AirtableClientConfig::new(api_key.clone(), base_id.clone())
            .with_base_url(settings.airtable.base_url.clone())
            .with_timeout(settings.http_timeout_seconds),
    )?;

    Ok(Some(SponsorsService::new(
        Arc::new(github),
        Arc::new(airtable),
        SponsorTables {
            sponsors: settings.airtable.sponsors_table.clone(),
            tiers: settings.airtable.tiers_table.clone(),
        },
    )))
}
