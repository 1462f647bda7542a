//! GitHub GraphQL API models
//!
//! Request envelope and the response shapes of the two sponsorship queries.

use serde::{Deserialize, Serialize};

use super::sponsors::{PrivacyLevel, Tier};

// ============================================================================
// Queries
// ============================================================================

/// Full tier list of the sponsorable behind the token. Tiers are not paginated.
pub const TIERS_QUERY: &str = r#"
query {
  viewer {
    sponsorshipsAsMaintainer(first: 1) {
      nodes {
        sponsorable {
          sponsorsListing {
            tiers(first: 100) {
              nodes {
                id
                name
                description
                descriptionHTML
                monthlyPriceInCents
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// One page of sponsorships, private ones included.
pub const SPONSORSHIPS_QUERY: &str = r#"
query ($first: Int!, $cursor: String) {
  viewer {
    sponsorshipsAsMaintainer(first: $first, after: $cursor, includePrivate: true) {
      pageInfo {
        hasNextPage
        endCursor
      }
      edges {
        node {
          createdAt
          sponsor {
            name
            login
          }
          tier {
            id
            monthlyPriceInCents
          }
          privacyLevel
        }
      }
    }
  }
}
"#;

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SponsorshipsVariables<'a> {
    pub first: u32,
    pub cursor: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct ViewerData<T> {
    pub viewer: T,
}

// ============================================================================
// Tiers
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TiersViewer {
    pub sponsorships_as_maintainer: MaintainerNodes,
}

#[derive(Debug, Deserialize)]
pub struct MaintainerNodes {
    #[serde(default)]
    pub nodes: Vec<MaintainerNode>,
}

#[derive(Debug, Deserialize)]
pub struct MaintainerNode {
    pub sponsorable: Sponsorable,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sponsorable {
    pub sponsors_listing: Option<SponsorsListing>,
}

#[derive(Debug, Deserialize)]
pub struct SponsorsListing {
    pub tiers: TierNodes,
}

#[derive(Debug, Deserialize)]
pub struct TierNodes {
    #[serde(default)]
    pub nodes: Vec<Tier>,
}

// ============================================================================
// Sponsorships
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipsViewer {
    pub sponsorships_as_maintainer: SponsorshipConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<SponsorshipEdge>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SponsorshipEdge {
    pub node: SponsorshipNode,
}

/// A single sponsorship. `sponsor` is null for accounts that were deleted or
/// anonymized upstream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipNode {
    pub created_at: String,
    pub sponsor: Option<SponsorAccount>,
    pub tier: Option<TierRef>,
    pub privacy_level: PrivacyLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SponsorAccount {
    pub name: Option<String>,
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierRef {
    pub id: String,
    pub monthly_price_in_cents: i64,
}

/// One page of sponsorships handed to the aggregation engine
#[derive(Debug, Clone, Default)]
pub struct SponsorshipPage {
    pub nodes: Vec<SponsorshipNode>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl From<SponsorshipConnection> for SponsorshipPage {
    fn from(conn: SponsorshipConnection) -> Self {
        Self {
            nodes: conn.edges.into_iter().map(|e| e.node).collect(),
            has_next_page: conn.page_info.has_next_page,
            end_cursor: conn.page_info.end_cursor,
        }
    }
}
