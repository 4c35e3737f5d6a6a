//! Memory endpoints - the user's saved goals, insights and patterns

use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::envelope::{ApiJson, ApiResponse};
use super::error::ApiError;
use super::extract::AuthenticatedUser;
use crate::shared_state::AppState;
use crate::store::{Memory, MemoryCategory, NewMemory};
use crate::utils::TextUtils;

pub const DEFAULT_IMPORTANCE: i32 = 5;

/// Tags arrive either as a list or as the raw comma-separated form field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Text(String),
}

impl Default for TagsInput {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl TagsInput {
    pub fn into_tags(self) -> Vec<String> {
        match self {
            Self::List(tags) => tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            Self::Text(raw) => TextUtils::parse_tags(&raw),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMemoryRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: TagsInput,
    #[serde(default)]
    pub category: Option<MemoryCategory>,
}

pub async fn list_memories(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<ApiResponse<Vec<Memory>>, ApiError> {
    let memories = state
        .store
        .list_memories(&user.id)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Laden der Erinnerungen", e))?;

    Ok(ApiResponse::ok(memories))
}

pub async fn create_memory(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(request): ApiJson<CreateMemoryRequest>,
) -> Result<ApiResponse<Memory>, ApiError> {
    if request.title.trim().is_empty() || request.content.trim().is_empty() {
        return Err(ApiError::validation("Titel und Inhalt sind erforderlich"));
    }

    let memory = state
        .store
        .insert_memory(NewMemory {
            user_id: user.id.clone(),
            title: request.title,
            content: request.content,
            tags: request.tags.into_tags(),
            category: request.category,
            importance_score: DEFAULT_IMPORTANCE,
            last_referenced: Utc::now(),
        })
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Speichern der Erinnerung", e))?;

    info!("Stored memory {} for user {}", memory.id, user.id);
    Ok(ApiResponse::ok(memory).with_message("Erinnerung erfolgreich hinzugefügt"))
}

pub async fn delete_memory(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(memory_id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    let deleted = state
        .store
        .delete_memory(&user.id, &memory_id)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Löschen der Erinnerung", e))?;

    if !deleted {
        return Err(ApiError::not_found("Erinnerung nicht gefunden"));
    }

    info!("Deleted memory {} for user {}", memory_id, user.id);
    Ok(ApiResponse::done("Erinnerung erfolgreich gelöscht"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_from_list_or_text() {
        let from_list: CreateMemoryRequest = serde_json::from_value(serde_json::json!({
            "title": "Ziel",
            "content": "Mehr Ruhe",
            "tags": [" ruhe ", "", "alltag"]
        }))
        .unwrap();
        assert_eq!(from_list.tags.into_tags(), vec!["ruhe", "alltag"]);

        let from_text: CreateMemoryRequest = serde_json::from_value(serde_json::json!({
            "title": "Ziel",
            "content": "Mehr Ruhe",
            "tags": "ruhe, alltag,"
        }))
        .unwrap();
        assert_eq!(from_text.tags.into_tags(), vec!["ruhe", "alltag"]);
    }

    #[test]
    fn test_missing_tags_default_empty() {
        let request: CreateMemoryRequest =
            serde_json::from_value(serde_json::json!({ "title": "a", "content": "b" })).unwrap();
        assert!(request.tags.into_tags().is_empty());
        assert_eq!(request.category, None);
    }
}
