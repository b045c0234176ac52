//! Where session documents live.

use crate::error::SessionResult;
use async_trait::async_trait;
use gsnip_gcp::firestore::{new_document_id, Document, FieldValue, FirestoreClient};
use gsnip_gcp::GcpClient;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_COLLECTION: &str = "hello-views";

const GREETINGS_FIELD: &str = "Greetings";
const VIEWS_FIELD: &str = "Views";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub greeting: String,
    pub views: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fresh document id for a new session.
    fn new_id(&self) -> String;

    /// `None` when no session document has that id.
    async fn load(&self, id: &str) -> SessionResult<Option<Session>>;

    async fn save(&self, id: &str, session: &Session) -> SessionResult<()>;
}

// ── Firestore ───────────────────────────────────────────────────────────

pub struct FirestoreSessionStore {
    client: Arc<GcpClient>,
    project: String,
    collection: String,
}

impl FirestoreSessionStore {
    pub fn new(
        client: Arc<GcpClient>,
        project: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            client,
            project: project.into(),
            collection: collection.into(),
        }
    }
}

fn to_fields(session: &Session) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();
    fields.insert(GREETINGS_FIELD.to_string(), FieldValue::string(&session.greeting));
    fields.insert(VIEWS_FIELD.to_string(), FieldValue::integer(session.views));
    fields
}

fn from_document(doc: &Document) -> Session {
    Session {
        greeting: doc
            .field(GREETINGS_FIELD)
            .and_then(FieldValue::as_str)
            .unwrap_or_default()
            .to_string(),
        views: doc.field(VIEWS_FIELD).and_then(FieldValue::as_i64).unwrap_or(0),
    }
}

#[async_trait]
impl SessionStore for FirestoreSessionStore {
    fn new_id(&self) -> String {
        new_document_id()
    }

    async fn load(&self, id: &str) -> SessionResult<Option<Session>> {
        let found =
            FirestoreClient::get_document(&self.client, &self.project, &self.collection, id).await;
        match found {
            Ok(doc) => Ok(Some(from_document(&doc))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, id: &str, session: &Session) -> SessionResult<()> {
        FirestoreClient::set_document(
            &self.client,
            &self.project,
            &self.collection,
            id,
            to_fields(session),
        )
        .await?;
        Ok(())
    }
}

// ── In-memory ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn new_id(&self) -> String {
        new_document_id()
    }

    async fn load(&self, id: &str) -> SessionResult<Option<Session>> {
        Ok(self.sessions.lock().await.get(id).cloned())
    }

    async fn save(&self, id: &str, session: &Session) -> SessionResult<()> {
        self.sessions.lock().await.insert(id.to_string(), session.clone());
        Ok(())
    }
}
