//! External collaborators of the sponsor aggregation
//!
//! The aggregation engine only talks to the two upstream services through the
//! traits in this module. `GithubService` and `AirtableClient` are the HTTP
//! implementations; tests plug in in-memory fakes.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::schemas::airtable::{Fields, Record, RecordPage};
use crate::schemas::github::SponsorshipPage;
use crate::schemas::Tier;

// ============================================================================
// Error Types
// ============================================================================

/// Upstream service an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Github,
    Airtable,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Github => write!(f, "GitHub"),
            Upstream::Airtable => write!(f, "Airtable"),
        }
    }
}

/// Any failure from the GitHub GraphQL API or the Airtable store.
///
/// None of these are retried; they propagate to the HTTP boundary.
#[derive(Error, Debug)]
pub enum ExternalServiceError {
    #[error("{service} request failed: {source}")]
    Http {
        service: Upstream,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}: {message}")]
    Status {
        service: Upstream,
        status: u16,
        message: String,
    },

    #[error("GitHub GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("unexpected {service} response: {detail}")]
    UnexpectedResponse { service: Upstream, detail: String },
}

impl ExternalServiceError {
    pub fn unexpected(service: Upstream, detail: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            service,
            detail: detail.into(),
        }
    }

    /// The upstream service this error came from
    pub fn service(&self) -> Upstream {
        match self {
            Self::Http { service, .. }
            | Self::Status { service, .. }
            | Self::UnexpectedResponse { service, .. } => *service,
            Self::GraphQl(_) => Upstream::Github,
        }
    }
}

// ============================================================================
// Sponsorship source
// ============================================================================

/// Read access to the sponsorships of the maintainer behind the configured token
#[async_trait]
pub trait SponsorshipSource: Send + Sync {
    /// The complete tier list of the sponsors listing (not paginated).
    async fn fetch_tiers(&self) -> Result<Vec<Tier>, ExternalServiceError>;

    /// One page of sponsorships starting after `cursor`.
    async fn fetch_sponsorships_page(
        &self,
        cursor: Option<&str>,
    ) -> Result<SponsorshipPage, ExternalServiceError>;
}

// ============================================================================
// Record store
// ============================================================================

/// Tabular store holding the sponsor metadata and the tier mirror
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// One page of `table`, starting at `offset`.
    async fn list_page(
        &self,
        table: &str,
        offset: Option<&str>,
    ) -> Result<RecordPage, ExternalServiceError>;

    /// Partial update of a single record.
    async fn update_fields(
        &self,
        table: &str,
        record_id: &str,
        fields: Fields,
    ) -> Result<(), ExternalServiceError>;

    async fn destroy(&self, table: &str, record_id: &str) -> Result<(), ExternalServiceError>;

    /// Creates every record of `records`. Implementations split the batch as
    /// the backend requires.
    async fn create(&self, table: &str, records: Vec<Fields>) -> Result<(), ExternalServiceError>;

    /// Every record of `table`, reading pages sequentially until the store
    /// stops returning an offset.
    async fn list_all(&self, table: &str) -> Result<Vec<Record>, ExternalServiceError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.list_page(table, offset.as_deref()).await?;
            pages += 1;
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        tracing::debug!(table = %table, pages, records = records.len(), "Read table");

        Ok(records)
    }
}
