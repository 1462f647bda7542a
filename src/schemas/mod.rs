//! Wire and domain models
//!
//! Serde types for the GitHub GraphQL API, the Airtable REST API, and the
//! sponsor/tier records served by this application.

pub mod airtable;
pub mod github;
pub mod sponsors;

pub use sponsors::{
    ParsedOverride, PrivacyLevel, Sponsor, SponsorMetaOverride, SponsorsResponse, Tier, TierRecord,
    TierRecordFields,
};
