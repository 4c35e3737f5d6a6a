//! Session store - persistence for sessions, messages, profiles, memories and documents
//!
//! Everything lives in the hosted backend; `SupabaseStore` talks to its REST
//! interface. `InMemoryStore` backs development mode and tests.

pub mod schema;
pub mod supabase;
pub mod in_memory;

pub use schema::*;
pub use supabase::SupabaseStore;
pub use in_memory::InMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("backend returned no row for {0}")]
    EmptyResponse(&'static str),
}

impl StoreError {
    /// The backend refused the filter values themselves, e.g. an id that is
    /// not a UUID. No row can match such a filter.
    pub fn is_rejected_filter(&self) -> bool {
        matches!(self, Self::Status { status: 400, .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row-level access to everything a user owns.
///
/// Lookups that take a `user_id` only ever return rows owned by that user; a
/// row that exists for somebody else is indistinguishable from a missing one.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, user_id: &str, session_id: &str) -> StoreResult<Option<Session>>;

    /// Newest first by `started_at`.
    async fn list_sessions(&self, user_id: &str) -> StoreResult<Vec<Session>>;

    async fn create_session(&self, session: NewSession) -> StoreResult<Session>;

    /// Clear `is_active` on every active session of the user; returns how many changed.
    async fn deactivate_sessions(&self, user_id: &str) -> StoreResult<u64>;

    /// Oldest first by `created_at`.
    async fn list_messages(&self, session_id: &str) -> StoreResult<Vec<Message>>;

    async fn insert_message(&self, message: NewMessage) -> StoreResult<Message>;

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>>;

    /// Insert or merge on `user_id`, stamping `updated_at`.
    async fn upsert_profile(&self, user_id: &str, update: ProfileUpdate) -> StoreResult<Profile>;

    /// Newest first by `created_at`.
    async fn list_memories(&self, user_id: &str) -> StoreResult<Vec<Memory>>;

    async fn insert_memory(&self, memory: NewMemory) -> StoreResult<Memory>;

    /// `false` when nothing owned by the user matched.
    async fn delete_memory(&self, user_id: &str, memory_id: &str) -> StoreResult<bool>;

    /// Newest first by `created_at`.
    async fn list_documents(&self, user_id: &str) -> StoreResult<Vec<Document>>;

    async fn insert_document(&self, document: NewDocument) -> StoreResult<Document>;

    async fn insert_chunks(&self, chunks: Vec<NewDocumentChunk>) -> StoreResult<usize>;

    async fn list_chunks(&self, user_id: &str) -> StoreResult<Vec<DocumentChunk>>;

    /// Removes the document and its chunks; `false` when nothing owned by the user matched.
    async fn delete_document(&self, user_id: &str, document_id: &str) -> StoreResult<bool>;

    async fn counts(&self, messages_since: DateTime<Utc>) -> StoreResult<StoreCounts>;

    /// Most recently created profiles across all users.
    async fn recent_profiles(&self, limit: usize) -> StoreResult<Vec<Profile>>;
}
