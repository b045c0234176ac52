//! Cloud Datastore client (transactions, lookup, commit).
//!
//! API base: `https://datastore.googleapis.com/v1`

use crate::client::GcpClient;
use crate::error::GcpResult;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SERVICE: &str = "datastore";
const V1: &str = "/v1";

// ── Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionId {
    #[serde(default)]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathElement {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// int64 encoded as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,
    #[serde(default)]
    pub path: Vec<PathElement>,
}

impl Key {
    /// Root key with a string name, like `datastore.NameKey(kind, name, nil)`.
    pub fn named(project: &str, kind: &str, name: &str) -> Self {
        Self {
            partition_id: Some(PartitionId {
                project_id: project.to_string(),
                namespace_id: None,
            }),
            path: vec![PathElement {
                kind: kind.to_string(),
                name: Some(name.to_string()),
                id: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl Entity {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

/// A property value. Exactly one of the typed fields is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integer_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_value: Option<Box<Entity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_value: Option<ArrayValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_from_indexes: Option<bool>,
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Self { string_value: Some(s.into()), ..Default::default() }
    }

    pub fn timestamp(t: DateTime<Utc>) -> Self {
        Self {
            timestamp_value: Some(t.to_rfc3339_opts(SecondsFormat::Nanos, true)),
            ..Default::default()
        }
    }

    pub fn entity(e: Entity) -> Self {
        Self { entity_value: Some(Box::new(e)), ..Default::default() }
    }

    pub fn array(values: Vec<Value>) -> Self {
        Self { array_value: Some(ArrayValue { values }), ..Default::default() }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.string_value.as_deref()
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_value
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        self.entity_value.as_deref()
    }

    /// Array elements; an absent or null array reads as empty.
    pub fn as_array(&self) -> &[Value] {
        self.array_value.as_ref().map(|a| a.values.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Mutation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upsert: Option<Entity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Key>,
}

impl Mutation {
    pub fn upsert(entity: Entity) -> Self {
        Self { upsert: Some(entity), delete: None }
    }
}

#[derive(Debug, Deserialize)]
struct BeginTransactionResponse {
    transaction: String,
}

#[derive(Debug, Deserialize)]
struct EntityResult {
    entity: Entity,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    found: Vec<EntityResult>,
}

// ── Datastore Client ────────────────────────────────────────────────────

pub struct DatastoreClient;

impl DatastoreClient {
    /// Start a read-write transaction, returning its opaque handle.
    pub async fn begin_transaction(client: &GcpClient, project: &str) -> GcpResult<String> {
        let path = format!("{}/projects/{}:beginTransaction", V1, project);
        let body = serde_json::json!({ "transactionOptions": { "readWrite": {} } });
        let resp: BeginTransactionResponse = client
            .post(SERVICE, &path, &body)
            .await
            .map_err(|e| e.with_method("projects.beginTransaction"))?;
        Ok(resp.transaction)
    }

    /// Look up one entity, optionally inside a transaction. `None` when missing.
    pub async fn lookup(
        client: &GcpClient,
        project: &str,
        key: &Key,
        transaction: Option<&str>,
    ) -> GcpResult<Option<Entity>> {
        let path = format!("{}/projects/{}:lookup", V1, project);
        let mut body = serde_json::json!({ "keys": [key] });
        if let Some(tx) = transaction {
            body["readOptions"] = serde_json::json!({ "transaction": tx });
        }
        let resp: LookupResponse = client
            .post(SERVICE, &path, &body)
            .await
            .map_err(|e| e.with_method("projects.lookup"))?;
        Ok(resp.found.into_iter().next().map(|r| r.entity))
    }

    /// Commit mutations in a transaction. Conflicts surface as `ABORTED`.
    pub async fn commit(
        client: &GcpClient,
        project: &str,
        transaction: &str,
        mutations: Vec<Mutation>,
    ) -> GcpResult<()> {
        let path = format!("{}/projects/{}:commit", V1, project);
        let body = serde_json::json!({
            "mode": "TRANSACTIONAL",
            "transaction": transaction,
            "mutations": mutations,
        });
        let _: serde_json::Value = client
            .post(SERVICE, &path, &body)
            .await
            .map_err(|e| e.with_method("projects.commit"))?;
        Ok(())
    }

    pub async fn rollback(client: &GcpClient, project: &str, transaction: &str) -> GcpResult<()> {
        let path = format!("{}/projects/{}:rollback", V1, project);
        let body = serde_json::json!({ "transaction": transaction });
        let _: serde_json::Value = client
            .post(SERVICE, &path, &body)
            .await
            .map_err(|e| e.with_method("projects.rollback"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn nested_entity_json() {
        let expiry = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut inner = Entity::default();
        inner.properties.insert("ID".into(), Value::string("proj-1"));
        inner.properties.insert("LeaseExpiry".into(), Value::timestamp(expiry));

        let mut pool = Entity {
            key: Some(Key::named("meta", "Pool", "pool")),
            ..Default::default()
        };
        pool.properties.insert("Projects".into(), Value::array(vec![Value::entity(inner)]));

        let json = serde_json::to_value(&pool).unwrap();
        assert_eq!(json["key"]["path"][0]["kind"], "Pool");
        assert_eq!(json["key"]["partitionId"]["projectId"], "meta");
        let first = &json["properties"]["Projects"]["arrayValue"]["values"][0]["entityValue"];
        assert_eq!(first["properties"]["ID"]["stringValue"], "proj-1");
        assert_eq!(
            first["properties"]["LeaseExpiry"]["timestampValue"],
            "2023-11-14T22:13:20.000000000Z"
        );

        let back: Entity = serde_json::from_value(json).unwrap();
        let projects = back.property("Projects").unwrap().as_array();
        let e = projects[0].as_entity().unwrap();
        assert_eq!(e.property("LeaseExpiry").unwrap().as_timestamp(), Some(expiry));
    }

    #[test]
    fn empty_array_reads_as_empty() {
        let v: Value = serde_json::from_str(r#"{"arrayValue":{}}"#).unwrap();
        assert!(v.as_array().is_empty());
        assert!(Value::default().as_array().is_empty());
    }
}
