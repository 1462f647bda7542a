//! Airtable REST API models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form cell values of a record. Airtable omits empty cells.
pub type Fields = Map<String, Value>;

/// A table row as returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

/// `GET /v0/{base}/{table}` response; `offset` is present while more pages remain
#[derive(Debug, Deserialize)]
pub struct ListRecordsResponse {
    #[serde(default)]
    pub records: Vec<Record>,
    pub offset: Option<String>,
}

/// One page of records handed to callers of the store
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub offset: Option<String>,
}

impl From<ListRecordsResponse> for RecordPage {
    fn from(resp: ListRecordsResponse) -> Self {
        Self {
            records: resp.records,
            offset: resp.offset,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewRecord {
    pub fields: Fields,
}

/// `POST /v0/{base}/{table}` body
#[derive(Debug, Serialize)]
pub struct CreateRecordsRequest {
    pub records: Vec<NewRecord>,
}

/// `PATCH /v0/{base}/{table}/{record}` body
#[derive(Debug, Serialize)]
pub struct UpdateRecordRequest {
    pub fields: Fields,
}

/// Airtable reports errors either as `{"error": "NOT_FOUND"}` or as
/// `{"error": {"type": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct AirtableErrorBody {
    pub error: AirtableError,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AirtableError {
    Code(String),
    Detailed {
        #[serde(rename = "type")]
        error_type: String,
        #[serde(default)]
        message: Option<String>,
    },
}

impl std::fmt::Display for AirtableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AirtableError::Code(code) => write!(f, "{}", code),
            AirtableError::Detailed {
                error_type,
                message: Some(message),
            } => write!(f, "{}: {}", error_type, message),
            AirtableError::Detailed { error_type, .. } => write!(f, "{}", error_type),
        }
    }
}
