use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::schema::*;
use super::{SessionStore, StoreResult};

/// Process-local store with the same ownership and ordering rules as the
/// hosted backend. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    sessions: Arc<DashMap<String, Session>>,
    messages: Arc<DashMap<String, Vec<Message>>>,
    profiles: Arc<DashMap<String, Profile>>,
    memories: Arc<DashMap<String, Memory>>,
    documents: Arc<DashMap<String, Document>>,
    chunks: Arc<DashMap<String, Vec<DocumentChunk>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get_session(&self, user_id: &str, session_id: &str) -> StoreResult<Option<Session>> {
        Ok(self
            .sessions
            .get(session_id)
            .filter(|session| session.user_id == user_id)
            .map(|session| session.clone()))
    }

    async fn list_sessions(&self, user_id: &str) -> StoreResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    async fn create_session(&self, session: NewSession) -> StoreResult<Session> {
        let stored = Session {
            id: new_id(),
            user_id: session.user_id,
            title: Some(session.title),
            started_at: session.started_at,
            ended_at: None,
            message_count: 0,
            total_tokens: 0,
            session_type: session.session_type,
            is_active: session.is_active,
        };
        self.sessions.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn deactivate_sessions(&self, user_id: &str) -> StoreResult<u64> {
        let mut changed = 0;
        for mut entry in self.sessions.iter_mut() {
            if entry.user_id == user_id && entry.is_active {
                entry.is_active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn list_messages(&self, session_id: &str) -> StoreResult<Vec<Message>> {
        Ok(self
            .messages
            .get(session_id)
            .map(|history| history.clone())
            .unwrap_or_default())
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<Message> {
        let stored = Message {
            id: new_id(),
            session_id: message.session_id,
            role: message.role,
            content: message.content,
            tokens: message.tokens,
            model: message.model,
            temperature: message.temperature,
            created_at: Utc::now(),
            metadata: message.metadata,
        };
        self.messages
            .entry(stored.session_id.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        Ok(self.profiles.get(user_id).map(|profile| profile.clone()))
    }

    async fn upsert_profile(&self, user_id: &str, update: ProfileUpdate) -> StoreResult<Profile> {
        let now = Utc::now();
        let mut entry = self.profiles.entry(user_id.to_string()).or_insert_with(|| Profile {
            id: new_id(),
            user_id: user_id.to_string(),
            name: None,
            year_of_birth: None,
            birth_time: None,
            birth_place: None,
            hd_type: None,
            hd_strategy: None,
            hd_authority: None,
            astro_sun_sign: None,
            astro_moon_sign: None,
            astro_rising_sign: None,
            consent_data_processing: false,
            consent_timestamp: None,
            privacy_level: PrivacyLevel::default(),
            created_at: now,
            updated_at: now,
        });
        update.apply_to(&mut entry);
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn list_memories(&self, user_id: &str) -> StoreResult<Vec<Memory>> {
        let mut memories: Vec<Memory> = self
            .memories
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        memories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(memories)
    }

    async fn insert_memory(&self, memory: NewMemory) -> StoreResult<Memory> {
        let now = Utc::now();
        let stored = Memory {
            id: new_id(),
            user_id: memory.user_id,
            title: memory.title,
            content: memory.content,
            tags: memory.tags,
            category: memory.category,
            importance_score: memory.importance_score,
            last_referenced: memory.last_referenced,
            created_at: now,
            updated_at: now,
            is_active: true,
        };
        self.memories.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete_memory(&self, user_id: &str, memory_id: &str) -> StoreResult<bool> {
        Ok(self
            .memories
            .remove_if(memory_id, |_, memory| memory.user_id == user_id)
            .is_some())
    }

    async fn list_documents(&self, user_id: &str) -> StoreResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .documents
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn insert_document(&self, document: NewDocument) -> StoreResult<Document> {
        let stored = Document {
            id: new_id(),
            user_id: document.user_id,
            filename: document.filename,
            content: document.content,
            chunk_count: document.chunk_count,
            file_size: document.file_size,
            file_type: document.file_type,
            created_at: Utc::now(),
        };
        self.documents.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn insert_chunks(&self, chunks: Vec<NewDocumentChunk>) -> StoreResult<usize> {
        let count = chunks.len();
        let now = Utc::now();
        for chunk in chunks {
            let stored = DocumentChunk {
                id: new_id(),
                document_id: chunk.document_id,
                user_id: chunk.user_id,
                content: chunk.content,
                chunk_index: chunk.chunk_index,
                token_count: chunk.token_count,
                embedding: chunk.embedding,
                created_at: now,
            };
            self.chunks
                .entry(stored.document_id.clone())
                .or_default()
                .push(stored);
        }
        Ok(count)
    }

    async fn list_chunks(&self, user_id: &str) -> StoreResult<Vec<DocumentChunk>> {
        Ok(self
            .chunks
            .iter()
            .flat_map(|entry| entry.value().clone())
            .filter(|chunk| chunk.user_id == user_id)
            .collect())
    }

    async fn delete_document(&self, user_id: &str, document_id: &str) -> StoreResult<bool> {
        let removed = self
            .documents
            .remove_if(document_id, |_, document| document.user_id == user_id)
            .is_some();
        if removed {
            self.chunks.remove(document_id);
        }
        Ok(removed)
    }

    async fn counts(&self, messages_since: DateTime<Utc>) -> StoreResult<StoreCounts> {
        let messages_since = self
            .messages
            .iter()
            .map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|message| message.created_at >= messages_since)
                    .count() as u64
            })
            .sum();

        Ok(StoreCounts {
            profiles: self.profiles.len() as u64,
            active_sessions: self.sessions.iter().filter(|entry| entry.is_active).count() as u64,
            messages_since,
            documents: self.documents.len() as u64,
        })
    }

    async fn recent_profiles(&self, limit: usize) -> StoreResult<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self
            .profiles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        profiles.truncate(limit);
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_session(user_id: &str) -> NewSession {
        NewSession {
            user_id: user_id.to_string(),
            title: "Neue Unterhaltung".to_string(),
            started_at: Utc::now(),
            session_type: SessionType::Chat,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_session_lookup_is_scoped_to_owner() {
        let store = InMemoryStore::new();
        let session = store.create_session(new_session("alice")).await.unwrap();

        assert!(store.get_session("alice", &session.id).await.unwrap().is_some());
        assert!(store.get_session("bob", &session.id).await.unwrap().is_none());
        assert!(store.get_session("alice", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_messages_keep_insertion_order() {
        let store = InMemoryStore::new();
        let session = store.create_session(new_session("alice")).await.unwrap();

        for content in ["eins", "zwei", "drei"] {
            store.insert_message(NewMessage::user(&session.id, content)).await.unwrap();
        }

        let contents: Vec<String> = store
            .list_messages(&session.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["eins", "zwei", "drei"]);
    }

    #[tokio::test]
    async fn test_deactivate_only_touches_owner() {
        let store = InMemoryStore::new();
        store.create_session(new_session("alice")).await.unwrap();
        store.create_session(new_session("alice")).await.unwrap();
        let bobs = store.create_session(new_session("bob")).await.unwrap();

        assert_eq!(store.deactivate_sessions("alice").await.unwrap(), 2);
        assert_eq!(store.deactivate_sessions("alice").await.unwrap(), 0);
        assert!(store.get_session("bob", &bobs.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_upsert_profile_creates_then_merges() {
        let store = InMemoryStore::new();
        let created = store
            .upsert_profile("alice", ProfileUpdate { name: Some("Alice".into()), ..Default::default() })
            .await
            .unwrap();
        let merged = store
            .upsert_profile("alice", ProfileUpdate { year_of_birth: Some(1990), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(created.id, merged.id);
        assert_eq!(merged.name.as_deref(), Some("Alice"));
        assert_eq!(merged.year_of_birth, Some(1990));
        assert!(merged.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_delete_memory_requires_owner() {
        let store = InMemoryStore::new();
        let memory = store
            .insert_memory(NewMemory {
                user_id: "alice".into(),
                title: "Ziel".into(),
                content: "Mehr Ruhe".into(),
                tags: vec![],
                category: None,
                importance_score: 5,
                last_referenced: Utc::now(),
            })
            .await
            .unwrap();

        assert!(!store.delete_memory("bob", &memory.id).await.unwrap());
        assert!(store.delete_memory("alice", &memory.id).await.unwrap());
        assert!(store.list_memories("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_document_drops_chunks() {
        let store = InMemoryStore::new();
        let document = store
            .insert_document(NewDocument {
                user_id: "alice".into(),
                filename: "notizen.txt".into(),
                content: "Text".into(),
                chunk_count: 1,
                file_size: 4,
                file_type: "text/plain".into(),
            })
            .await
            .unwrap();
        store
            .insert_chunks(vec![NewDocumentChunk {
                document_id: document.id.clone(),
                user_id: "alice".into(),
                content: "Text".into(),
                chunk_index: 0,
                token_count: 1,
                embedding: None,
            }])
            .await
            .unwrap();

        assert_eq!(store.list_chunks("alice").await.unwrap().len(), 1);
        assert!(store.delete_document("alice", &document.id).await.unwrap());
        assert!(store.list_chunks("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counts() {
        let store = InMemoryStore::new();
        let session = store.create_session(new_session("alice")).await.unwrap();
        store.insert_message(NewMessage::user(&session.id, "hallo")).await.unwrap();
        store.upsert_profile("alice", ProfileUpdate::default()).await.unwrap();

        let counts = store.counts(Utc::now() - chrono::Duration::hours(1)).await.unwrap();
        assert_eq!(counts.profiles, 1);
        assert_eq!(counts.active_sessions, 1);
        assert_eq!(counts.messages_since, 1);
        assert_eq!(counts.documents, 0);
    }
}
