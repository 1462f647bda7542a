//! GitHub service for the Sponsors GraphQL API
//!
//! Runs the two sponsorship queries with the token configured at startup.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::schemas::github::{
    GraphQlRequest, GraphQlResponse, SponsorshipPage, SponsorshipsVariables, SponsorshipsViewer,
    TiersViewer, ViewerData, SPONSORSHIPS_QUERY, TIERS_QUERY,
};
use crate::schemas::Tier;
use crate::services::external::{ExternalServiceError, SponsorshipSource, Upstream};

/// Sponsorship edges requested per page (the API maximum)
pub const SPONSORSHIPS_PAGE_SIZE: u32 = 100;

/// Configuration for the GitHub service
#[derive(Debug, Clone)]
pub struct GithubServiceConfig {
    pub auth_token: String,
    pub graphql_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl GithubServiceConfig {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            graphql_url: "https://api.github.com/graphql".to_string(),
            user_agent: "docs-sponsors".to_string(),
            timeout_seconds: 30,
        }
    }

    pub fn with_graphql_url(mut self, url: impl Into<String>) -> Self {
        self.graphql_url = url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Client for the GitHub GraphQL endpoint
#[derive(Clone)]
pub struct GithubService {
    client: Client,
    config: GithubServiceConfig,
}

impl GithubService {
    pub fn new(config: GithubServiceConfig) -> Result<Self, ExternalServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|source| ExternalServiceError::Http {
                service: Upstream::Github,
                source,
            })?;

        Ok(Self { client, config })
    }

    /// Execute a query and return its `data`, failing on GraphQL errors
    async fn query<V, T>(&self, query: &str, variables: V) -> Result<T, ExternalServiceError>
    where
        V: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let http_err = |source| ExternalServiceError::Http {
            service: Upstream::Github,
            source,
        };

        let response = self
            .client
            .post(&self.config.graphql_url)
            .header("Authorization", format!("bearer {}", self.config.auth_token))
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        let body = response.text().await.map_err(http_err)?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "GitHub GraphQL request failed");
            return Err(ExternalServiceError::Status {
                service: Upstream::Github,
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: GraphQlResponse<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse GitHub GraphQL response");
            ExternalServiceError::unexpected(Upstream::Github, e.to_string())
        })?;

        if !parsed.errors.is_empty() {
            return Err(ExternalServiceError::GraphQl(
                parsed.errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        parsed
            .data
            .ok_or_else(|| ExternalServiceError::unexpected(Upstream::Github, "response has no data"))
    }
}

#[async_trait]
impl SponsorshipSource for GithubService {
    async fn fetch_tiers(&self) -> Result<Vec<Tier>, ExternalServiceError> {
        let data: ViewerData<TiersViewer> = self.query(TIERS_QUERY, serde_json::json!({})).await?;

        let node = data
            .viewer
            .sponsorships_as_maintainer
            .nodes
            .into_iter()
            .next()
            .ok_or_else(|| {
                ExternalServiceError::unexpected(
                    Upstream::Github,
                    "viewer has no sponsorships as maintainer",
                )
            })?;

        let listing = node.sponsorable.sponsors_listing.ok_or_else(|| {
            ExternalServiceError::unexpected(Upstream::Github, "sponsorable has no sponsors listing")
        })?;

        tracing::debug!(tiers = listing.tiers.nodes.len(), "Fetched GitHub tiers");

        Ok(listing.tiers.nodes)
    }

    async fn fetch_sponsorships_page(
        &self,
        cursor: Option<&str>,
    ) -> Result<SponsorshipPage, ExternalServiceError> {
        let variables = SponsorshipsVariables {
            first: SPONSORSHIPS_PAGE_SIZE,
            cursor,
        };
        let data: ViewerData<SponsorshipsViewer> =
            self.query(SPONSORSHIPS_QUERY, variables).await?;

        Ok(data.viewer.sponsorships_as_maintainer.into())
    }
}
