//! Sponsor and tier models
//!
//! These are the records returned by the sponsors endpoint. Field names follow
//! the JSON the docs site already consumes (`monthlyPriceInCents`, `logoURL`, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Tier
// ============================================================================

/// A sponsorship pricing level, as listed by the GitHub sponsors listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "descriptionHTML", default)]
    pub description_html: Option<String>,
    pub monthly_price_in_cents: i64,
}

// ============================================================================
// Sponsor
// ============================================================================

/// Upstream-declared visibility of a sponsorship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivacyLevel {
    Public,
    Private,
}

impl PrivacyLevel {
    /// Parse a hand-entered cell; case and surrounding blanks are ignored
    pub fn from_cell(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Some(PrivacyLevel::Public),
            "PRIVATE" => Some(PrivacyLevel::Private),
            _ => None,
        }
    }
}

/// A sponsor entry of the aggregated list.
///
/// Entries built from GitHub always carry `tierId`, `createdAt` and
/// `privacyLevel`; entries appended from a meta override carry whatever the
/// curated row provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sponsor {
    pub name: Option<String>,
    pub login: String,
    pub tier_id: Option<String>,
    pub created_at: Option<String>,
    pub monthly_price_in_cents: i64,
    pub privacy_level: Option<PrivacyLevel>,
    #[serde(rename = "logoURL", skip_serializing_if = "Option::is_none", default)]
    pub logo_url: Option<String>,
    #[serde(rename = "linkURL", skip_serializing_if = "Option::is_none", default)]
    pub link_url: Option<String>,
}

impl Sponsor {
    pub fn is_public(&self) -> bool {
        self.privacy_level == Some(PrivacyLevel::Public)
    }

    /// Copy of this sponsor with the display links taken from `meta`.
    ///
    /// Identity fields (`name`, `tierId`, `createdAt`, `monthlyPriceInCents`)
    /// are never touched by an override.
    pub fn with_overrides(&self, meta: &SponsorMetaOverride) -> Sponsor {
        Sponsor {
            logo_url: meta.logo_url.clone(),
            link_url: meta.link_url.clone(),
            ..self.clone()
        }
    }
}

// ============================================================================
// Meta override
// ============================================================================

/// Manually curated display data for a sponsor, stored in the sponsors table.
///
/// Only `logoURL`/`linkURL` are applied to a matching GitHub sponsor. The other
/// optional fields describe legacy or offline sponsors that have no live
/// GitHub sponsorship and are appended as standalone entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorMetaOverride {
    pub login: String,
    pub logo_url: Option<String>,
    pub link_url: Option<String>,
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub monthly_price_in_cents: Option<i64>,
    pub privacy_level: Option<PrivacyLevel>,
}

/// An override read from a curated row, with the names of the cells that
/// held an unusable value and were left unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOverride {
    pub meta: SponsorMetaOverride,
    pub invalid_fields: Vec<&'static str>,
}

impl SponsorMetaOverride {
    /// Read an override from the fields of a sponsors table row.
    ///
    /// Returns `None` only when the row has no usable `login`. Every other
    /// cell is read on its own: a malformed value leaves that field unset
    /// and the rest of the row is kept.
    pub fn from_fields(fields: &Map<String, Value>) -> Option<ParsedOverride> {
        let login = fields
            .get("login")
            .and_then(Value::as_str)
            .filter(|login| !login.trim().is_empty())?
            .to_string();

        let mut invalid_fields = Vec::new();
        let mut text = |key: &'static str| match fields.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                invalid_fields.push(key);
                None
            }
        };

        let logo_url = text("logoURL");
        let link_url = text("linkURL");
        let name = text("name");
        let created_at = text("createdAt");

        let monthly_price_in_cents = match fields.get("monthlyPriceInCents") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let cents = price_cell(value);
                if cents.is_none() {
                    invalid_fields.push("monthlyPriceInCents");
                }
                cents
            }
        };

        // Anything but a recognised level stays unset, which is not public
        let privacy_level = match fields.get("privacyLevel") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let level = value.as_str().and_then(PrivacyLevel::from_cell);
                if level.is_none() {
                    invalid_fields.push("privacyLevel");
                }
                level
            }
        };

        Some(ParsedOverride {
            meta: SponsorMetaOverride {
                login,
                logo_url,
                link_url,
                name,
                created_at,
                monthly_price_in_cents,
                privacy_level,
            },
            invalid_fields,
        })
    }
}

/// Whole cents from a number or numeric text cell; fractions are rounded
fn price_cell(value: &Value) -> Option<i64> {
    if let Some(cents) = value.as_i64() {
        return Some(cents);
    }
    let cents = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (cents.is_finite() && cents.abs() < i64::MAX as f64).then(|| cents.round() as i64)
}

impl From<SponsorMetaOverride> for Sponsor {
    fn from(meta: SponsorMetaOverride) -> Self {
        Sponsor {
            name: meta.name,
            login: meta.login,
            tier_id: None,
            created_at: meta.created_at,
            monthly_price_in_cents: meta.monthly_price_in_cents.unwrap_or(0),
            privacy_level: meta.privacy_level,
            logo_url: meta.logo_url,
            link_url: meta.link_url,
        }
    }
}

// ============================================================================
// Tier mirror
// ============================================================================

/// Fields of a row of the tier mirror table. Rows are matched to upstream
/// tiers by `id` only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRecordFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Tier> for TierRecordFields {
    fn from(tier: &Tier) -> Self {
        Self {
            id: Some(tier.id.clone()),
            name: Some(tier.name.clone()),
        }
    }
}

/// A row of the tier mirror table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierRecord {
    /// Store-assigned row id (not the tier id)
    pub record_id: String,
    pub fields: TierRecordFields,
}

// ============================================================================
// Response
// ============================================================================

/// Body of the sponsors endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorsResponse {
    pub sponsors: Vec<Sponsor>,
    pub tiers: Vec<Tier>,
}
