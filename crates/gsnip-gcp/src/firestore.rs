//! Cloud Firestore client (document get / set).
//!
//! API base: `https://firestore.googleapis.com/v1`

use crate::client::GcpClient;
use crate::error::{GcpError, GcpResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SERVICE: &str = "firestore";
const V1: &str = "/v1";

/// Firestore's limit on a document id, in bytes.
const MAX_DOCUMENT_ID_BYTES: usize = 1_500;

/// Characters escaped when a document id is placed in a request path.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

// ── Types ───────────────────────────────────────────────────────────────

/// A typed Firestore field value (subset used by this workspace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    NullValue(Option<String>),
    BooleanValue(bool),
    /// int64 encoded as a decimal string.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
}

impl FieldValue {
    pub fn string(s: impl Into<String>) -> Self {
        Self::StringValue(s.into())
    }

    pub fn integer(n: i64) -> Self {
        Self::IntegerValue(n.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::IntegerValue(s) => s.parse().ok(),
            Self::DoubleValue(d) => Some(*d as i64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Random 20-character document id, the same shape Firestore generates.
pub fn new_document_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

/// Whether `id` names a document directly inside a collection: one path
/// segment, not `.` or `..`, and not a reserved `__name__` id.
pub fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_DOCUMENT_ID_BYTES
        && !id.contains('/')
        && id != "."
        && id != ".."
        && !(id.len() >= 4 && id.starts_with("__") && id.ends_with("__"))
}

fn document_path(project: &str, collection: &str, id: &str) -> GcpResult<String> {
    if !is_valid_document_id(id) {
        return Err(GcpError::invalid_argument(
            SERVICE,
            &format!("invalid document id {:?}", id),
        ));
    }
    Ok(format!(
        "{}/projects/{}/databases/(default)/documents/{}/{}",
        V1,
        project,
        collection,
        utf8_percent_encode(id, PATH_SEGMENT)
    ))
}

// ── Firestore Client ────────────────────────────────────────────────────

pub struct FirestoreClient;

impl FirestoreClient {
    pub async fn get_document(
        client: &GcpClient,
        project: &str,
        collection: &str,
        id: &str,
    ) -> GcpResult<Document> {
        let path = document_path(project, collection, id)
            .map_err(|e| e.with_method("documents.get"))?;
        client
            .get(SERVICE, &path, &[])
            .await
            .map_err(|e| e.with_method("documents.get"))
    }

    /// Create or overwrite a document (`DocumentRef.Set` semantics).
    pub async fn set_document(
        client: &GcpClient,
        project: &str,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, FieldValue>,
    ) -> GcpResult<Document> {
        let path = document_path(project, collection, id)
            .map_err(|e| e.with_method("documents.patch"))?;
        let body = Document { fields, ..Default::default() };
        client
            .patch(SERVICE, &path, &body, &[])
            .await
            .map_err(|e| e.with_method("documents.patch"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_values_use_tagged_json() {
        let mut doc = Document::default();
        doc.fields.insert("Greetings".into(), FieldValue::string("Hola Mundo"));
        doc.fields.insert("Views".into(), FieldValue::integer(3));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "fields": {
                    "Greetings": { "stringValue": "Hola Mundo" },
                    "Views": { "integerValue": "3" }
                }
            })
        );
    }

    #[test]
    fn reads_server_document() {
        let doc: Document = serde_json::from_str(
            r#"{
                "name": "projects/p/databases/(default)/documents/hello-views/abc123",
                "fields": {
                    "Views": {"integerValue": "7"},
                    "Greetings": {"stringValue": "Ciao Mondo"}
                },
                "createTime": "2024-01-01T00:00:00Z",
                "updateTime": "2024-01-02T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(doc.field("Views").and_then(FieldValue::as_i64), Some(7));
        assert_eq!(doc.field("Greetings").and_then(FieldValue::as_str), Some("Ciao Mondo"));
    }

    #[test]
    fn generated_ids_are_alphanumeric() {
        let id = new_document_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, new_document_id());
    }

    #[test]
    fn document_paths() {
        assert_eq!(
            document_path("p", "hello-views", "x").unwrap(),
            "/v1/projects/p/databases/(default)/documents/hello-views/x"
        );
        assert_eq!(
            document_path("p", "hello-views", "a b?c#d%e").unwrap(),
            "/v1/projects/p/databases/(default)/documents/hello-views/a%20b%3Fc%23d%25e"
        );
    }

    #[test]
    fn rejects_ids_that_leave_the_collection() {
        for id in ["", ".", "..", "a/../../users/admin", "users/admin", "__name__"] {
            assert!(!is_valid_document_id(id), "{:?}", id);
            let err = document_path("p", "hello-views", id).unwrap_err();
            assert_eq!(err.status, "INVALID_ARGUMENT");
        }
        assert!(is_valid_document_id(&new_document_id()));
        assert!(is_valid_document_id("a..b"));
        assert!(!is_valid_document_id(&"x".repeat(1_501)));
    }
}
