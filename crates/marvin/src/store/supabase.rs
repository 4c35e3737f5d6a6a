//! PostgREST client for the hosted tables
//!
//! All requests carry the service-role key, so ownership is enforced here with
//! explicit `user_id` filters rather than by row-level security.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::schema::*;
use super::{SessionStore, StoreError, StoreResult};

const PROFILES: &str = "profiles";
const SESSIONS: &str = "sessions";
const MESSAGES: &str = "messages";
const MEMORIES: &str = "memories";
const DOCUMENTS: &str = "documents";
const DOCUMENT_CHUNKS: &str = "document_chunks";

const RETURN_REPRESENTATION: &str = "return=representation";

pub struct SupabaseStore {
    rest_url: String,
    service_key: String,
    http: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Self {
        Self {
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn check(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn rows<T: DeserializeOwned>(builder: RequestBuilder) -> StoreResult<Vec<T>> {
        let response = Self::check(builder.send().await?).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn single<T: DeserializeOwned>(builder: RequestBuilder, what: &'static str) -> StoreResult<T> {
        Self::rows(builder)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::EmptyResponse(what))
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &'static str,
        body: &B,
    ) -> StoreResult<T> {
        let builder = self
            .request(Method::POST, table)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        Self::single(builder, table).await
    }

    /// Row count from `Content-Range: 0-0/<total>` (or `*/<total>`).
    async fn count(&self, table: &str, filters: &[(&str, String)]) -> StoreResult<u64> {
        let response = self
            .request(Method::GET, table)
            .header("Prefer", "count=exact")
            .query(&[("select", "id"), ("limit", "1")])
            .query(filters)
            .send()
            .await?;
        let response = Self::check(response).await?;

        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| StoreError::Decode(format!("missing row count for {table}")))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

/// Treat a rejected id filter like a lookup that matched nothing.
fn or_no_match<T>(result: StoreResult<T>, no_match: T) -> StoreResult<T> {
    match result {
        Err(e) if e.is_rejected_filter() => {
            debug!("Filter rejected by backend, treating as no match: {}", e);
            Ok(no_match)
        }
        other => other,
    }
}

fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl SessionStore for SupabaseStore {
    async fn get_session(&self, user_id: &str, session_id: &str) -> StoreResult<Option<Session>> {
        let builder = self.request(Method::GET, SESSIONS).query(&[
            ("select", "*".to_string()),
            ("id", eq(session_id)),
            ("user_id", eq(user_id)),
        ]);
        let rows: Vec<Session> = or_no_match(Self::rows(builder).await, Vec::new())?;
        Ok(rows.into_iter().next())
    }

    async fn list_sessions(&self, user_id: &str) -> StoreResult<Vec<Session>> {
        let builder = self.request(Method::GET, SESSIONS).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(user_id)),
            ("order", "started_at.desc".to_string()),
        ]);
        Self::rows(builder).await
    }

    async fn create_session(&self, session: NewSession) -> StoreResult<Session> {
        self.insert(SESSIONS, &session).await
    }

    async fn deactivate_sessions(&self, user_id: &str) -> StoreResult<u64> {
        let builder = self
            .request(Method::PATCH, SESSIONS)
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("user_id", eq(user_id)), ("is_active", "eq.true".to_string())])
            .json(&json!({ "is_active": false }));
        let rows: Vec<serde_json::Value> = Self::rows(builder).await?;
        debug!("Deactivated {} session(s) for user {}", rows.len(), user_id);
        Ok(rows.len() as u64)
    }

    async fn list_messages(&self, session_id: &str) -> StoreResult<Vec<Message>> {
        let builder = self.request(Method::GET, MESSAGES).query(&[
            ("select", "*".to_string()),
            ("session_id", eq(session_id)),
            ("order", "created_at.asc".to_string()),
        ]);
        Self::rows(builder).await
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<Message> {
        self.insert(MESSAGES, &message).await
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        let builder = self
            .request(Method::GET, PROFILES)
            .query(&[("select", "*".to_string()), ("user_id", eq(user_id))]);
        let rows: Vec<Profile> = Self::rows(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_profile(&self, user_id: &str, update: ProfileUpdate) -> StoreResult<Profile> {
        let mut body = serde_json::to_value(&update).map_err(|e| StoreError::Decode(e.to_string()))?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("user_id".to_string(), json!(user_id));
            fields.insert("updated_at".to_string(), json!(Utc::now()));
        }

        let builder = self
            .request(Method::POST, PROFILES)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .query(&[("on_conflict", "user_id")])
            .json(&body);
        Self::single(builder, PROFILES).await
    }

    async fn list_memories(&self, user_id: &str) -> StoreResult<Vec<Memory>> {
        let builder = self.request(Method::GET, MEMORIES).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(user_id)),
            ("order", "created_at.desc".to_string()),
        ]);
        Self::rows(builder).await
    }

    async fn insert_memory(&self, memory: NewMemory) -> StoreResult<Memory> {
        self.insert(MEMORIES, &memory).await
    }

    async fn delete_memory(&self, user_id: &str, memory_id: &str) -> StoreResult<bool> {
        let builder = self
            .request(Method::DELETE, MEMORIES)
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("id", eq(memory_id)), ("user_id", eq(user_id))]);
        let rows: Vec<serde_json::Value> = or_no_match(Self::rows(builder).await, Vec::new())?;
        Ok(!rows.is_empty())
    }

    async fn list_documents(&self, user_id: &str) -> StoreResult<Vec<Document>> {
        let builder = self.request(Method::GET, DOCUMENTS).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(user_id)),
            ("order", "created_at.desc".to_string()),
        ]);
        Self::rows(builder).await
    }

    async fn insert_document(&self, document: NewDocument) -> StoreResult<Document> {
        self.insert(DOCUMENTS, &document).await
    }

    async fn insert_chunks(&self, chunks: Vec<NewDocumentChunk>) -> StoreResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let builder = self
            .request(Method::POST, DOCUMENT_CHUNKS)
            .header("Prefer", "return=minimal")
            .json(&chunks);
        Self::check(builder.send().await?).await?;
        Ok(chunks.len())
    }

    async fn list_chunks(&self, user_id: &str) -> StoreResult<Vec<DocumentChunk>> {
        let builder = self
            .request(Method::GET, DOCUMENT_CHUNKS)
            .query(&[("select", "*".to_string()), ("user_id", eq(user_id))]);
        Self::rows(builder).await
    }

    async fn delete_document(&self, user_id: &str, document_id: &str) -> StoreResult<bool> {
        let chunks = self
            .request(Method::DELETE, DOCUMENT_CHUNKS)
            .query(&[("document_id", eq(document_id)), ("user_id", eq(user_id))]);
        if or_no_match(Self::check(chunks.send().await?).await.map(Some), None)?.is_none() {
            return Ok(false);
        }

        let builder = self
            .request(Method::DELETE, DOCUMENTS)
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("id", eq(document_id)), ("user_id", eq(user_id))]);
        let rows: Vec<serde_json::Value> = Self::rows(builder).await?;
        Ok(!rows.is_empty())
    }

    async fn counts(&self, messages_since: DateTime<Utc>) -> StoreResult<StoreCounts> {
        let active = [("is_active", "eq.true".to_string())];
        let recent = [("created_at", format!("gte.{}", messages_since.to_rfc3339()))];
        let (profiles, active_sessions, messages_since, documents) = tokio::try_join!(
            self.count(PROFILES, &[]),
            self.count(SESSIONS, &active),
            self.count(MESSAGES, &recent),
            self.count(DOCUMENTS, &[]),
        )?;

        Ok(StoreCounts {
            profiles,
            active_sessions,
            messages_since,
            documents,
        })
    }

    async fn recent_profiles(&self, limit: usize) -> StoreResult<Vec<Profile>> {
        let builder = self.request(Method::GET, PROFILES).query(&[
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ]);
        Self::rows(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const KEY: &str = "service-key";

    fn store(server: &mockito::ServerGuard) -> SupabaseStore {
        SupabaseStore::new(&server.url(), KEY, Duration::from_secs(5))
    }

    fn session_row(id: &str, user_id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": user_id,
            "title": "Neue Unterhaltung",
            "started_at": "2024-05-01T10:00:00+00:00",
            "is_active": true
        })
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-0/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-0/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[tokio::test]
    async fn test_get_session_filters_by_owner() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/sessions")
            .match_header("apikey", KEY)
            .match_header("authorization", "Bearer service-key")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "eq.s1".into()),
                Matcher::UrlEncoded("user_id".into(), "eq.alice".into()),
            ]))
            .with_status(200)
            .with_body(json!([session_row("s1", "alice")]).to_string())
            .create_async()
            .await;

        let session = store(&server).get_session("alice", "s1").await.unwrap();
        assert_eq!(session.map(|s| s.id), Some("s1".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_session_missing_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/sessions")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        assert!(store(&server).get_session("bob", "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_session_with_malformed_id_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/sessions")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.not-a-uuid".into()))
            .with_status(400)
            .with_body(r#"{"code":"22P02","message":"invalid input syntax for type uuid: \"not-a-uuid\""}"#)
            .create_async()
            .await;

        assert!(store(&server).get_session("alice", "not-a-uuid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_document_with_malformed_id_matches_nothing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/rest/v1/document_chunks")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"code":"22P02"}"#)
            .create_async()
            .await;
        let documents = server
            .mock("DELETE", "/rest/v1/documents")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        assert!(!store(&server).delete_document("alice", "nope").await.unwrap());
        documents.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_messages_orders_ascending() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/messages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("session_id".into(), "eq.s1".into()),
                Matcher::UrlEncoded("order".into(), "created_at.asc".into()),
            ]))
            .with_status(200)
            .with_body(
                json!([{
                    "id": "m1",
                    "session_id": "s1",
                    "role": "user",
                    "content": "Hallo",
                    "created_at": "2024-05-01T10:00:00+00:00"
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let messages = store(&server).list_messages("s1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_insert_message_asks_for_representation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/messages")
            .match_header("prefer", RETURN_REPRESENTATION)
            .match_body(Matcher::PartialJson(json!({
                "session_id": "s1",
                "role": "user",
                "content": "Hallo"
            })))
            .with_status(201)
            .with_body(
                json!([{
                    "id": "m1",
                    "session_id": "s1",
                    "role": "user",
                    "content": "Hallo",
                    "created_at": "2024-05-01T10:00:00+00:00"
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let message = store(&server)
            .insert_message(NewMessage::user("s1", "Hallo"))
            .await
            .unwrap();
        assert_eq!(message.id, "m1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/sessions")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = store(&server).list_sessions("alice").await.unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 500, ref body } if body == "boom"));
    }

    #[tokio::test]
    async fn test_delete_memory_reports_missing_row() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/rest/v1/memories")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "eq.mem-1".into()),
                Matcher::UrlEncoded("user_id".into(), "eq.bob".into()),
            ]))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        assert!(!store(&server).delete_memory("bob", "mem-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_profile_merges_on_user_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/profiles")
            .match_query(Matcher::UrlEncoded("on_conflict".into(), "user_id".into()))
            .match_header("prefer", "resolution=merge-duplicates,return=representation")
            .match_body(Matcher::PartialJson(json!({ "user_id": "alice", "name": "Alice" })))
            .with_status(201)
            .with_body(
                json!([{
                    "id": "p1",
                    "user_id": "alice",
                    "name": "Alice",
                    "created_at": "2024-05-01T10:00:00+00:00",
                    "updated_at": "2024-05-02T10:00:00+00:00"
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let profile = store(&server)
            .upsert_profile(
                "alice",
                ProfileUpdate {
                    name: Some("Alice".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.name.as_deref(), Some("Alice"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_counts_read_content_range() {
        let mut server = mockito::Server::new_async().await;
        for (table, total) in [("profiles", 3), ("sessions", 2), ("messages", 7), ("documents", 1)] {
            server
                .mock("GET", format!("/rest/v1/{table}").as_str())
                .match_query(Matcher::Any)
                .match_header("prefer", "count=exact")
                .with_status(200)
                .with_header("content-range", &format!("0-0/{total}"))
                .with_body("[]")
                .create_async()
                .await;
        }

        let counts = store(&server).counts(Utc::now()).await.unwrap();
        assert_eq!(
            counts,
            StoreCounts {
                profiles: 3,
                active_sessions: 2,
                messages_since: 7,
                documents: 1,
            }
        );
    }
}
