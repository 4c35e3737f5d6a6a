//! Typed rows of the hosted backend tables
//!
//! Row structs mirror what PostgREST returns; `New*` structs are insert
//! payloads and skip server-defaulted columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    Chat,
    Onboarding,
    Assessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    Minimal,
    #[default]
    Standard,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Goal,
    Insight,
    Pattern,
    Trigger,
    Strength,
}

/// Identity resolved from an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub year_of_birth: Option<i32>,
    #[serde(default)]
    pub birth_time: Option<String>,
    #[serde(default)]
    pub birth_place: Option<String>,
    #[serde(default)]
    pub hd_type: Option<String>,
    #[serde(default)]
    pub hd_strategy: Option<String>,
    #[serde(default)]
    pub hd_authority: Option<String>,
    #[serde(default)]
    pub astro_sun_sign: Option<String>,
    #[serde(default)]
    pub astro_moon_sign: Option<String>,
    #[serde(default)]
    pub astro_rising_sign: Option<String>,
    #[serde(default)]
    pub consent_data_processing: bool,
    #[serde(default)]
    pub consent_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub privacy_level: PrivacyLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile for upserts; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_of_birth: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hd_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hd_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hd_authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub astro_sun_sign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub astro_moon_sign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub astro_rising_sign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_data_processing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy_level: Option<PrivacyLevel>,
}

impl ProfileUpdate {
    /// Overwrite the fields of `profile` that this update sets.
    pub fn apply_to(&self, profile: &mut Profile) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    profile.$field = Some(value.clone());
                })*
            };
        }
        merge!(
            name, year_of_birth, birth_time, birth_place, hd_type, hd_strategy,
            hd_authority, astro_sun_sign, astro_moon_sign, astro_rising_sign,
            consent_timestamp
        );
        if let Some(consent) = self.consent_data_processing {
            profile.consent_data_processing = consent;
        }
        if let Some(level) = self.privacy_level {
            profile.privacy_level = level;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_count: i64,
    #[serde(default)]
    pub total_tokens: i64,
    #[serde(default)]
    pub session_type: SessionType,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSession {
    pub user_id: String,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub session_type: SessionType,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub tokens: Option<i64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMessage {
    pub session_id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl NewMessage {
    pub fn user(session_id: &str, content: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            role: Role::User,
            content: content.to_string(),
            tokens: None,
            model: None,
            temperature: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<MemoryCategory>,
    #[serde(default)]
    pub importance_score: i32,
    pub last_referenced: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMemory {
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<MemoryCategory>,
    pub importance_score: i32,
    pub last_referenced: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub content: String,
    #[serde(default)]
    pub chunk_count: i32,
    pub file_size: i64,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDocument {
    pub user_id: String,
    pub filename: String,
    pub content: String,
    pub chunk_count: i32,
    pub file_size: i64,
    pub file_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub user_id: String,
    pub content: String,
    pub chunk_index: i32,
    #[serde(default)]
    pub token_count: i32,
    #[serde(default, deserialize_with = "deserialize_embedding")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDocumentChunk {
    pub document_id: String,
    pub user_id: String,
    pub content: String,
    pub chunk_index: i32,
    pub token_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Raw counts behind the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub profiles: u64,
    pub active_sessions: u64,
    pub messages_since: u64,
    pub documents: u64,
}

fn default_true() -> bool {
    true
}

/// pgvector columns come back from PostgREST as a string like `"[0.1,0.2]"`;
/// accept that as well as a plain JSON array.
fn deserialize_embedding<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawEmbedding {
        Array(Vec<f32>),
        Text(String),
    }

    match Option::<RawEmbedding>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawEmbedding::Array(values)) => Ok(Some(values)),
        Some(RawEmbedding::Text(text)) => serde_json::from_str::<Vec<f32>>(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
