//! Sponsor aggregation service
//!
//! Builds the `{ sponsors, tiers }` snapshot served by the sponsors endpoint
//! and keeps the tier mirror table in step with the GitHub tier list.
//!
//! Per request:
//! 1. fetch the tiers and reconcile the tier mirror (completes first);
//! 2. fetch every sponsorship page and every sponsor meta override
//!    concurrently;
//! 3. merge the overrides into the sponsors and sort.
//!
//! Nothing is cached between requests.

use futures::future::join_all;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::schemas::airtable::{Fields, Record};
use crate::schemas::github::SponsorshipNode;
use crate::schemas::{Sponsor, SponsorMetaOverride, Tier, TierRecord, TierRecordFields};
use crate::services::external::{ExternalServiceError, RecordStore, SponsorshipSource};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum SponsorsError {
    #[error(transparent)]
    External(#[from] ExternalServiceError),

    /// Some tier mirror writes were applied before others failed. Every planned
    /// write is idempotent, so the next reconciliation converges the mirror.
    #[error("tier mirror partially reconciled ({applied} applied, {failed} failed): {source}")]
    ReconciliationConflict {
        applied: usize,
        failed: usize,
        #[source]
        source: ExternalServiceError,
    },
}

// ============================================================================
// Tier mirror planning
// ============================================================================

/// Writes needed to make the tier mirror match the upstream tier list.
///
/// A matched row is only written when its name differs. Rows that already
/// hold the upstream name are listed in `unchanged` and get no write, rather
/// than being rewritten with the same value on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierMirrorPlan {
    /// `(record_id, new name)` for matched rows whose name differs
    pub updates: Vec<(String, String)>,
    /// Matched rows that already hold the upstream name
    pub unchanged: Vec<String>,
    /// Rows with no upstream tier, or duplicating an already matched id
    pub destroys: Vec<String>,
    /// Upstream tiers without a row
    pub creates: Vec<TierRecordFields>,
}

impl TierMirrorPlan {
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty() && self.destroys.is_empty() && self.creates.is_empty()
    }
}

/// Match stored rows to upstream tiers by `id`.
///
/// Rows are visited in read order; the first row claiming a tier id keeps it,
/// later rows with the same id are destroyed.
pub fn plan_tier_mirror(records: &[TierRecord], tiers: &[Tier]) -> TierMirrorPlan {
    let by_id: HashMap<&str, &Tier> = tiers.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut matched: HashSet<&str> = HashSet::new();
    let mut plan = TierMirrorPlan::default();

    for record in records {
        let tier = record
            .fields
            .id
            .as_deref()
            .and_then(|id| by_id.get(id).copied())
            .filter(|tier| !matched.contains(tier.id.as_str()));

        match tier {
            Some(tier) => {
                matched.insert(tier.id.as_str());
                if record.fields.name.as_deref() == Some(tier.name.as_str()) {
                    plan.unchanged.push(record.record_id.clone());
                } else {
                    plan.updates.push((record.record_id.clone(), tier.name.clone()));
                }
            }
            None => plan.destroys.push(record.record_id.clone()),
        }
    }

    // Upstream order, and each id once even if the upstream list repeats it
    let mut created: HashSet<&str> = HashSet::new();
    plan.creates = tiers
        .iter()
        .filter(|t| !matched.contains(t.id.as_str()) && created.insert(t.id.as_str()))
        .map(TierRecordFields::from)
        .collect();

    plan
}

/// Outcome of a tier mirror reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierMirrorReport {
    pub updated: usize,
    pub unchanged: usize,
    pub destroyed: usize,
    pub created: usize,
}

impl TierMirrorReport {
    pub fn changes(&self) -> usize {
        self.updated + self.destroyed + self.created
    }
}

// ============================================================================
// Merge and sort
// ============================================================================

/// Project sponsorship nodes into sponsors, dropping nodes whose account is
/// gone. Order is preserved.
pub fn project_sponsors(nodes: Vec<SponsorshipNode>) -> Vec<Sponsor> {
    nodes
        .into_iter()
        .filter_map(|node| {
            let account = node.sponsor?;
            let (tier_id, price) = match node.tier {
                Some(tier) => (Some(tier.id), tier.monthly_price_in_cents),
                None => (None, 0),
            };
            Some(Sponsor {
                name: account.name,
                login: account.login,
                tier_id,
                created_at: Some(node.created_at),
                monthly_price_in_cents: price,
                privacy_level: Some(node.privacy_level),
                logo_url: None,
                link_url: None,
            })
        })
        .collect()
}

/// Higher price first, then earlier `createdAt` (undated last), then login.
pub fn compare_sponsors(a: &Sponsor, b: &Sponsor) -> Ordering {
    b.monthly_price_in_cents
        .cmp(&a.monthly_price_in_cents)
        .then_with(|| match (&a.created_at, &b.created_at) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.login.cmp(&b.login))
}

/// Apply meta overrides to the sponsor list and sort it.
///
/// An override whose login matches a sponsor replaces that sponsor's display
/// links; any other override is appended as a sponsor of its own. Logins stay
/// unique: repeated upstream logins keep their first entry, and a repeated
/// override updates the entry appended for the first one.
pub fn merge_and_sort(sponsors: Vec<Sponsor>, overrides: Vec<SponsorMetaOverride>) -> Vec<Sponsor> {
    let mut merged: Vec<Sponsor> = Vec::with_capacity(sponsors.len() + overrides.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for sponsor in sponsors {
        if index.contains_key(&sponsor.login) {
            tracing::debug!(login = %sponsor.login, "Dropping repeated sponsor login");
            continue;
        }
        index.insert(sponsor.login.clone(), merged.len());
        merged.push(sponsor);
    }

    for meta in overrides {
        match index.get(&meta.login) {
            Some(&i) => merged[i] = merged[i].with_overrides(&meta),
            None => {
                index.insert(meta.login.clone(), merged.len());
                merged.push(Sponsor::from(meta));
            }
        }
    }

    merged.sort_by(compare_sponsors);
    merged
}

// ============================================================================
// Sponsors Service
// ============================================================================

/// Table names of the two store tables the service reads and writes
#[derive(Debug, Clone)]
pub struct SponsorTables {
    pub sponsors: String,
    pub tiers: String,
}

impl Default for SponsorTables {
    fn default() -> Self {
        Self {
            sponsors: "sponsors".to_string(),
            tiers: "tiers".to_string(),
        }
    }
}

/// Result of one aggregation run
#[derive(Debug, Clone)]
pub struct SponsorsSnapshot {
    /// Merged and sorted; private sponsors included
    pub sponsors: Vec<Sponsor>,
    pub tiers: Vec<Tier>,
    pub tier_mirror: TierMirrorReport,
}

/// Aggregates sponsors and tiers from GitHub and the record store
#[derive(Clone)]
pub struct SponsorsService {
    github: Arc<dyn SponsorshipSource>,
    store: Arc<dyn RecordStore>,
    tables: SponsorTables,
}

impl SponsorsService {
    pub fn new(
        github: Arc<dyn SponsorshipSource>,
        store: Arc<dyn RecordStore>,
        tables: SponsorTables,
    ) -> Self {
        Self {
            github,
            store,
            tables,
        }
    }

    pub async fn fetch_tiers(&self) -> Result<Vec<Tier>, ExternalServiceError> {
        self.github.fetch_tiers().await
    }

    /// Make the tier mirror hold exactly one row per upstream tier.
    ///
    /// Updates and destroys run concurrently and are all awaited before the
    /// outcome is decided. New tiers are created only when every update and
    /// destroy succeeded.
    pub async fn reconcile_tier_mirror(
        &self,
        tiers: &[Tier],
    ) -> Result<TierMirrorReport, SponsorsError> {
        let table = self.tables.tiers.as_str();
        let records: Vec<TierRecord> = self
            .store
            .list_all(table)
            .await?
            .into_iter()
            .map(tier_record)
            .collect();

        let plan = plan_tier_mirror(&records, tiers);

        tracing::debug!(
            rows = records.len(),
            tiers = tiers.len(),
            updates = plan.updates.len(),
            destroys = plan.destroys.len(),
            creates = plan.creates.len(),
            "Planned tier mirror reconciliation"
        );

        let updates = plan.updates.iter().map(|(record_id, name)| {
            let mut fields = Fields::new();
            fields.insert("name".to_string(), Value::String(name.clone()));
            self.store.update_fields(table, record_id, fields)
        });
        let destroys = plan
            .destroys
            .iter()
            .map(|record_id| self.store.destroy(table, record_id));

        let (update_results, destroy_results) =
            futures::join!(join_all(updates), join_all(destroys));

        let attempted = update_results.len() + destroy_results.len();
        let mut failures: Vec<ExternalServiceError> = update_results
            .into_iter()
            .chain(destroy_results)
            .filter_map(Result::err)
            .collect();

        if !failures.is_empty() {
            let failed = failures.len();
            let applied = attempted - failed;
            let source = failures.swap_remove(0);

            tracing::error!(applied, failed, error = %source, "Tier mirror reconciliation failed");

            return Err(if applied == 0 {
                SponsorsError::External(source)
            } else {
                SponsorsError::ReconciliationConflict {
                    applied,
                    failed,
                    source,
                }
            });
        }

        let created = plan.creates.len();
        if created > 0 {
            let rows = plan.creates.iter().map(tier_fields).collect();
            self.store.create(table, rows).await.map_err(|source| {
                if attempted > 0 {
                    SponsorsError::ReconciliationConflict {
                        applied: attempted,
                        failed: created,
                        source,
                    }
                } else {
                    SponsorsError::External(source)
                }
            })?;
        }

        let report = TierMirrorReport {
            updated: plan.updates.len(),
            unchanged: plan.unchanged.len(),
            destroyed: plan.destroys.len(),
            created,
        };

        if report.changes() > 0 {
            tracing::info!(
                updated = report.updated,
                destroyed = report.destroyed,
                created = report.created,
                "Reconciled tier mirror"
            );
        }

        Ok(report)
    }

    /// Every sponsor across all pages, in upstream order.
    ///
    /// Stops when the upstream reports no further page or gives no cursor.
    /// A failing page discards everything fetched so far.
    pub async fn fetch_all_sponsors(&self) -> Result<Vec<Sponsor>, ExternalServiceError> {
        let mut sponsors = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        let mut dropped = 0usize;

        loop {
            let page = self.github.fetch_sponsorships_page(cursor.as_deref()).await?;
            pages += 1;

            let edges = page.nodes.len();
            let projected = project_sponsors(page.nodes);
            dropped += edges - projected.len();
            sponsors.extend(projected);

            match (page.has_next_page, page.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(pages, sponsors = sponsors.len(), dropped, "Fetched GitHub sponsors");

        Ok(sponsors)
    }

    /// Every curated override row of the sponsors table. Rows without a
    /// usable `login` are skipped; a malformed optional cell only unsets that
    /// field.
    pub async fn fetch_sponsor_meta_overrides(
        &self,
    ) -> Result<Vec<SponsorMetaOverride>, ExternalServiceError> {
        let records = self.store.list_all(&self.tables.sponsors).await?;

        let overrides = records
            .into_iter()
            .filter_map(|record| {
                let Some(parsed) = SponsorMetaOverride::from_fields(&record.fields) else {
                    tracing::warn!(record_id = %record.id, "Skipping sponsor override without login");
                    return None;
                };
                if !parsed.invalid_fields.is_empty() {
                    tracing::warn!(
                        record_id = %record.id,
                        login = %parsed.meta.login,
                        fields = ?parsed.invalid_fields,
                        "Ignoring malformed sponsor override fields"
                    );
                }
                Some(parsed.meta)
            })
            .collect();

        Ok(overrides)
    }

    /// Run the full aggregation.
    ///
    /// Two phases, in order: (1) tiers are fetched and the tier mirror is
    /// reconciled; (2) only then are sponsors and overrides fetched, in
    /// parallel, and merged. A failure in either phase fails the whole call.
    pub async fn get_sponsors_and_tiers(&self) -> Result<SponsorsSnapshot, SponsorsError> {
        let started = Instant::now();

        let tiers = self.fetch_tiers().await?;
        let tier_mirror = self.reconcile_tier_mirror(&tiers).await?;

        let (sponsors, overrides) =
            tokio::try_join!(self.fetch_all_sponsors(), self.fetch_sponsor_meta_overrides())?;

        let override_count = overrides.len();
        let sponsors = merge_and_sort(sponsors, overrides);

        tracing::info!(
            tiers = tiers.len(),
            sponsors = sponsors.len(),
            overrides = override_count,
            duration_ms = started.elapsed().as_millis() as u64,
            "Aggregated sponsors"
        );

        Ok(SponsorsSnapshot {
            sponsors,
            tiers,
            tier_mirror,
        })
    }
}

fn tier_record(record: Record) -> TierRecord {
    let text = |key: &str| record.fields.get(key).and_then(Value::as_str).map(String::from);
    TierRecord {
        fields: TierRecordFields {
            id: text("id"),
            name: text("name"),
        },
        record_id: record.id.clone(),
    }
}

fn tier_fields(fields: &TierRecordFields) -> Fields {
    match serde_json::to_value(fields) {
        Ok(Value::Object(map)) => map,
        _ => Fields::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================
