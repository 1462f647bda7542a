//! Airtable client
//!
//! REST access to the Airtable base that stores the sponsor metadata and the
//! tier mirror. Lists are paginated by an opaque `offset`; creates are limited
//! to ten records per request.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

use crate::schemas::airtable::{
    AirtableErrorBody, CreateRecordsRequest, Fields, ListRecordsResponse, NewRecord, RecordPage,
    UpdateRecordRequest,
};
use crate::services::external::{ExternalServiceError, RecordStore, Upstream};

/// Records per list page (the API maximum)
pub const LIST_PAGE_SIZE: u32 = 100;

/// Records per create request (the API maximum)
pub const CREATE_BATCH_SIZE: usize = 10;

/// Configuration for the Airtable client
#[derive(Debug, Clone)]
pub struct AirtableClientConfig {
    pub api_key: String,
    pub base_id: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl AirtableClientConfig {
    pub fn new(api_key: impl Into<String>, base_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_id: base_id.into(),
            base_url: "https://api.airtable.com".to_string(),
            timeout_seconds: 30,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Client for a single Airtable base
#[derive(Clone)]
pub struct AirtableClient {
    client: Client,
    config: AirtableClientConfig,
}

impl AirtableClient {
    pub fn new(config: AirtableClientConfig) -> Result<Self, ExternalServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(http_error)?;

        Ok(Self { client, config })
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/v0/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.base_id,
            table
        )
    }

    fn record_url(&self, table: &str, record_id: &str) -> String {
        format!("{}/{}", self.table_url(table), record_id)
    }

    /// Send an authenticated request, turning non-2xx answers into errors
    async fn send(&self, request: RequestBuilder) -> Result<Response, ExternalServiceError> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AirtableErrorBody>(&body)
            .map(|e| e.error.to_string())
            .unwrap_or(body);

        tracing::warn!(status = status.as_u16(), error = %message, "Airtable request failed");

        Err(ExternalServiceError::Status {
            service: Upstream::Airtable,
            status: status.as_u16(),
            message,
        })
    }
}

fn http_error(source: reqwest::Error) -> ExternalServiceError {
    ExternalServiceError::Http {
        service: Upstream::Airtable,
        source,
    }
}

#[async_trait]
impl RecordStore for AirtableClient {
    async fn list_page(
        &self,
        table: &str,
        offset: Option<&str>,
    ) -> Result<RecordPage, ExternalServiceError> {
        let mut query = vec![("pageSize", LIST_PAGE_SIZE.to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let response = self
            .send(self.client.get(self.table_url(table)).query(&query))
            .await?;

        let list: ListRecordsResponse = response.json().await.map_err(|e| {
            ExternalServiceError::unexpected(Upstream::Airtable, format!("list {}: {}", table, e))
        })?;

        Ok(list.into())
    }

    async fn update_fields(
        &self,
        table: &str,
        record_id: &str,
        fields: Fields,
    ) -> Result<(), ExternalServiceError> {
        self.send(
            self.client
                .patch(self.record_url(table, record_id))
                .json(&UpdateRecordRequest { fields }),
        )
        .await?;

        tracing::debug!(table = %table, record_id = %record_id, "Updated record");
        Ok(())
    }

    async fn destroy(&self, table: &str, record_id: &str) -> Result<(), ExternalServiceError> {
        self.send(self.client.delete(self.record_url(table, record_id)))
            .await?;

        tracing::debug!(table = %table, record_id = %record_id, "Destroyed record");
        Ok(())
    }

    async fn create(&self, table: &str, records: Vec<Fields>) -> Result<(), ExternalServiceError> {
        let total = records.len();
        let mut remaining = records.into_iter().peekable();

        while remaining.peek().is_some() {
            let batch: Vec<NewRecord> = remaining
                .by_ref()
                .take(CREATE_BATCH_SIZE)
                .map(|fields| NewRecord { fields })
                .collect();

            self.send(
                self.client
                    .post(self.table_url(table))
                    .json(&CreateRecordsRequest { records: batch }),
            )
            .await?;
        }

        tracing::debug!(table = %table, records = total, "Created records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::MockUpstream;
    use serde_json::json;

    fn client_for(mock: &MockUpstream) -> AirtableClient {
        AirtableClient::new(
            AirtableClientConfig::new(MockUpstream::AIRTABLE_KEY, MockUpstream::AIRTABLE_BASE)
                .with_base_url(mock.airtable_url()),
        )
        .unwrap()
    }

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_urls() {
        let client = AirtableClient::new(
            AirtableClientConfig::new("key", "appBASE").with_base_url("https://api.airtable.com/"),
        )
        .unwrap();
        assert_eq!(client.table_url("tiers"), "https://api.airtable.com/v0/appBASE/tiers");
        assert_eq!(
            client.record_url("tiers", "rec1"),
            "https://api.airtable.com/v0/appBASE/tiers/rec1"
        );
    }

    #[tokio::test]
    async fn test_list_all_follows_offsets() {
        let mut builder = MockUpstream::builder().page_size(2);
        for i in 0..5 {
            builder = builder.record("sponsors", json!({ "login": format!("user{i}") }));
        }
        let mock = builder.spawn().await;
        let client = client_for(&mock);

        let first = client.list_page("sponsors", None).await.unwrap();
        assert_eq!(first.records.len(), 2);
        assert!(first.offset.is_some());

        let all = client.list_all("sponsors").await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[4].fields["login"], "user4");
    }

    #[tokio::test]
    async fn test_create_splits_into_batches_of_ten() {
        let mock = MockUpstream::builder().spawn().await;
        let client = client_for(&mock);

        let records: Vec<Fields> = (0..23)
            .map(|i| fields(json!({ "id": format!("T_{i}"), "name": format!("Tier {i}") })))
            .collect();

        // The mock rejects create requests above ten records
        client.create("tiers", records).await.unwrap();

        assert_eq!(mock.table("tiers").len(), 23);
        assert_eq!(mock.create_calls(), 3);
    }

    #[tokio::test]
    async fn test_update_and_destroy() {
        let mock = MockUpstream::builder()
            .record("tiers", json!({ "id": "T_1", "name": "Silver" }))
            .record("tiers", json!({ "id": "T_2", "name": "Old" }))
            .spawn()
            .await;
        let client = client_for(&mock);

        let rows = client.list_all("tiers").await.unwrap();
        client
            .update_fields("tiers", &rows[0].id, fields(json!({ "name": "Gold" })))
            .await
            .unwrap();
        client.destroy("tiers", &rows[1].id).await.unwrap();

        let after = mock.table("tiers");
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].fields["name"], "Gold");
        assert_eq!(after[0].fields["id"], "T_1");
    }

    #[tokio::test]
    async fn test_missing_record_is_external_error() {
        let mock = MockUpstream::builder().spawn().await;
        let client = client_for(&mock);

        let err = client.destroy("tiers", "recMISSING").await.unwrap_err();
        match err {
            ExternalServiceError::Status { service, status, message } => {
                assert_eq!(service, Upstream::Airtable);
                assert_eq!(status, 404);
                assert_eq!(message, "NOT_FOUND");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_key_rejected() {
        let mock = MockUpstream::builder().spawn().await;
        let client = AirtableClient::new(
            AirtableClientConfig::new("bad", MockUpstream::AIRTABLE_BASE)
                .with_base_url(mock.airtable_url()),
        )
        .unwrap();

        let err = client.list_all("tiers").await.unwrap_err();
        assert!(matches!(err, ExternalServiceError::Status { status: 401, .. }));
    }
}
