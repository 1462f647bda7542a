//! Services module
//!
//! Contains the sponsor aggregation logic and the upstream integrations.

pub mod airtable;
pub mod external;
pub mod github;
pub mod sponsors;

pub use airtable::{AirtableClient, AirtableClientConfig};
pub use external::{ExternalServiceError, RecordStore, SponsorshipSource, Upstream};
pub use github::{GithubService, GithubServiceConfig};
pub use sponsors::{
    merge_and_sort, plan_tier_mirror, SponsorTables, SponsorsError, SponsorsService,
    SponsorsSnapshot, TierMirrorPlan, TierMirrorReport,
};
