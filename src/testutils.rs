//! In-process stand-ins for the GitHub GraphQL API and the Airtable REST API
//!
//! `MockUpstream` binds an axum server on an ephemeral local port so the real
//! HTTP clients can be exercised without network access.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::schemas::airtable::Record;

type Shared = Arc<Mutex<MockState>>;

#[derive(Default)]
struct MockState {
    tiers: Vec<Value>,
    without_maintainer: bool,
    sponsorships: Vec<Value>,
    page_size: usize,
    tables: HashMap<String, Vec<Record>>,
    failing_records: HashSet<String>,
    next_record: usize,
    create_calls: usize,
    write_calls: usize,
}

impl MockState {
    fn new_record_id(&mut self) -> String {
        self.next_record += 1;
        format!("rec{:05}", self.next_record)
    }
}

/// Builder for a `MockUpstream`
pub struct MockUpstreamBuilder {
    state: MockState,
}

impl MockUpstreamBuilder {
    /// Maximum page size served by both APIs, whatever the client asks for
    pub fn page_size(mut self, size: usize) -> Self {
        self.state.page_size = size;
        self
    }

    pub fn tier(mut self, id: &str, name: &str, monthly_price_in_cents: i64) -> Self {
        self.state.tiers.push(json!({
            "id": id,
            "name": name,
            "description": format!("{name} tier"),
            "descriptionHTML": format!("<p>{name} tier</p>"),
            "monthlyPriceInCents": monthly_price_in_cents,
        }));
        self
    }

    /// The viewer maintains no sponsorships, so the tiers query has no node
    pub fn without_maintainer(mut self) -> Self {
        self.state.without_maintainer = true;
        self
    }

    pub fn sponsor(mut self, login: &str, tier_id: &str, price: i64, created_at: &str) -> Self {
        self.state.sponsorships.push(json!({
            "createdAt": created_at,
            "sponsor": { "name": login.to_uppercase(), "login": login },
            "tier": { "id": tier_id, "monthlyPriceInCents": price },
            "privacyLevel": "PUBLIC",
        }));
        self
    }

    pub fn private_sponsor(mut self, login: &str, tier_id: &str, price: i64, created_at: &str) -> Self {
        self.state.sponsorships.push(json!({
            "createdAt": created_at,
            "sponsor": { "name": null, "login": login },
            "tier": { "id": tier_id, "monthlyPriceInCents": price },
            "privacyLevel": "PRIVATE",
        }));
        self
    }

    /// A sponsorship whose account no longer exists
    pub fn ghost_sponsorship(mut self, created_at: &str) -> Self {
        self.state.sponsorships.push(json!({
            "createdAt": created_at,
            "sponsor": null,
            "tier": { "id": "T_ghost", "monthlyPriceInCents": 100 },
            "privacyLevel": "PUBLIC",
        }));
        self
    }

    pub fn record(mut self, table: &str, fields: Value) -> Self {
        let id = self.state.new_record_id();
        let fields = fields.as_object().cloned().unwrap_or_default();
        self.state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(Record { id, fields });
        self
    }

    /// Writes to the record at `index` of `table` answer 500
    pub fn failing_record(mut self, table: &str, index: usize) -> Self {
        let id = self.state.tables[table][index].id.clone();
        self.state.failing_records.insert(id);
        self
    }

    pub async fn spawn(self) -> MockUpstream {
        let mut state = self.state;
        if state.page_size == 0 {
            state.page_size = 100;
        }
        let state: Shared = Arc::new(Mutex::new(state));

        let app = Router::new()
            .route("/graphql", axum::routing::post(graphql))
            .route("/v0/:base/:table", get(list_records).post(create_records))
            .route(
                "/v0/:base/:table/:record",
                patch(update_record).delete(destroy_record),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockUpstream {
            addr,
            state,
            handle,
        }
    }
}

/// A running mock of both upstream APIs
pub struct MockUpstream {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl MockUpstream {
    pub const GITHUB_TOKEN: &'static str = "ghp_mock_token";
    pub const AIRTABLE_KEY: &'static str = "pat_mock_key";
    pub const AIRTABLE_BASE: &'static str = "appMOCK";

    pub fn builder() -> MockUpstreamBuilder {
        MockUpstreamBuilder {
            state: MockState::default(),
        }
    }

    pub fn graphql_url(&self) -> String {
        format!("http://{}/graphql", self.addr)
    }

    pub fn airtable_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Current content of `table`
    pub fn table(&self, table: &str) -> Vec<Record> {
        let state = self.state.lock().unwrap();
        state.tables.get(table).cloned().unwrap_or_default()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    /// Successful updates and destroys
    pub fn write_calls(&self) -> usize {
        self.state.lock().unwrap().write_calls
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ============================================================================
// GitHub GraphQL
// ============================================================================

async fn graphql(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let expected = format!("bearer {}", MockUpstream::GITHUB_TOKEN);
    if header(&headers, "authorization") != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Bad credentials" })),
        )
            .into_response();
    }

    let query = body["query"].as_str().unwrap_or_default();
    let state = state.lock().unwrap();

    if query.contains("sponsorsListing") {
        let nodes = if state.without_maintainer {
            json!([])
        } else {
            json!([{ "sponsorable": { "sponsorsListing": { "tiers": { "nodes": state.tiers } } } }])
        };
        return Json(json!({
            "data": { "viewer": { "sponsorshipsAsMaintainer": { "nodes": nodes } } }
        }))
        .into_response();
    }

    let start = body["variables"]["cursor"]
        .as_str()
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(0);
    let first = body["variables"]["first"].as_u64().unwrap_or(100) as usize;
    let total = state.sponsorships.len();
    let start = start.min(total);
    let end = (start + first.min(state.page_size)).min(total);

    let edges: Vec<Value> = state.sponsorships[start..end]
        .iter()
        .map(|node| json!({ "node": node }))
        .collect();

    Json(json!({
        "data": {
            "viewer": {
                "sponsorshipsAsMaintainer": {
                    "pageInfo": {
                        "hasNextPage": end < total,
                        "endCursor": if end > start { Value::from(end.to_string()) } else { Value::Null },
                    },
                    "edges": edges,
                }
            }
        }
    }))
    .into_response()
}

// ============================================================================
// Airtable
// ============================================================================

#[derive(Deserialize)]
struct ListParams {
    #[serde(rename = "pageSize")]
    page_size: Option<usize>,
    offset: Option<String>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn airtable_guard(headers: &HeaderMap, base: &str) -> Option<Response> {
    let expected = format!("Bearer {}", MockUpstream::AIRTABLE_KEY);
    if header(headers, "authorization") != Some(expected.as_str()) {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "type": "AUTHENTICATION_REQUIRED", "message": "Authentication required" } })),
            )
                .into_response(),
        );
    }
    if base != MockUpstream::AIRTABLE_BASE {
        return Some(not_found());
    }
    None
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "NOT_FOUND" }))).into_response()
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": { "type": "SERVER_ERROR", "message": "Try again" } })),
    )
        .into_response()
}

async fn list_records(
    State(state): State<Shared>,
    Path((base, table)): Path<(String, String)>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = airtable_guard(&headers, &base) {
        return rejection;
    }

    let state = state.lock().unwrap();
    let records = state.tables.get(&table).cloned().unwrap_or_default();
    let start = params
        .offset
        .and_then(|o| o.parse::<usize>().ok())
        .unwrap_or(0)
        .min(records.len());
    let size = params.page_size.unwrap_or(100).min(state.page_size);
    let end = (start + size).min(records.len());

    let mut body = json!({ "records": records[start..end] });
    if end < records.len() {
        body["offset"] = Value::from(end.to_string());
    }
    Json(body).into_response()
}

async fn create_records(
    State(state): State<Shared>,
    Path((base, table)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = airtable_guard(&headers, &base) {
        return rejection;
    }

    let new_records = body["records"].as_array().cloned().unwrap_or_default();
    if new_records.is_empty() || new_records.len() > 10 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": { "type": "INVALID_RECORDS", "message": "Create between 1 and 10 records" } })),
        )
            .into_response();
    }

    let mut state = state.lock().unwrap();
    state.create_calls += 1;

    let mut created = Vec::new();
    for record in new_records {
        let id = state.new_record_id();
        let fields = record["fields"].as_object().cloned().unwrap_or_default();
        created.push(Record { id, fields });
    }
    state
        .tables
        .entry(table)
        .or_default()
        .extend(created.iter().cloned());

    Json(json!({ "records": created })).into_response()
}

async fn update_record(
    State(state): State<Shared>,
    Path((base, table, record)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = airtable_guard(&headers, &base) {
        return rejection;
    }

    let mut state = state.lock().unwrap();
    if state.failing_records.contains(&record) {
        return server_error();
    }

    let Some(row) = state
        .tables
        .get_mut(&table)
        .and_then(|rows| rows.iter_mut().find(|r| r.id == record))
    else {
        return not_found();
    };

    if let Some(fields) = body["fields"].as_object() {
        for (key, value) in fields {
            row.fields.insert(key.clone(), value.clone());
        }
    }
    let updated = row.clone();
    state.write_calls += 1;

    Json(json!(updated)).into_response()
}

async fn destroy_record(
    State(state): State<Shared>,
    Path((base, table, record)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = airtable_guard(&headers, &base) {
        return rejection;
    }

    let mut state = state.lock().unwrap();
    if state.failing_records.contains(&record) {
        return server_error();
    }

    let Some(rows) = state.tables.get_mut(&table) else {
        return not_found();
    };
    let before = rows.len();
    rows.retain(|r| r.id != record);
    if rows.len() == before {
        return not_found();
    }
    state.write_calls += 1;

    Json(json!({ "id": record, "deleted": true })).into_response()
}
