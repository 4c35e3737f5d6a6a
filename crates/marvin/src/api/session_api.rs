//! Session endpoints

use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::envelope::{ApiJsonOrDefault, ApiResponse};
use super::error::ApiError;
use super::extract::AuthenticatedUser;
use crate::shared_state::AppState;
use crate::store::{Message, NewSession, Session, SessionType};
use crate::utils::text_utils::DEFAULT_SESSION_TITLE;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub title: Option<String>,
    /// Clear `is_active` on the caller's other sessions first.
    #[serde(default)]
    pub deactivate_others: bool,
}

/// List the caller's sessions, newest first.
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<ApiResponse<Vec<Session>>, ApiError> {
    let sessions = state
        .store
        .list_sessions(&user.id)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Laden der Sessions", e))?;

    info!("Found {} sessions for user {}", sessions.len(), user.id);
    Ok(ApiResponse::ok(sessions))
}

pub async fn create_session(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJsonOrDefault(request): ApiJsonOrDefault<CreateSessionRequest>,
) -> Result<ApiResponse<Session>, ApiError> {

    if request.deactivate_others {
        let deactivated = state
            .store
            .deactivate_sessions(&user.id)
            .await
            .map_err(|e| ApiError::upstream("Fehler beim Erstellen der Session", e))?;
        info!("Deactivated {} session(s) for user {}", deactivated, user.id);
    }

    let title = request
        .title
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string());
    let session = state
        .store
        .create_session(NewSession {
            user_id: user.id.clone(),
            title,
            started_at: Utc::now(),
            session_type: SessionType::Chat,
            is_active: true,
        })
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Erstellen der Session", e))?;

    info!("Created session {} for user {}", session.id, user.id);
    Ok(ApiResponse::ok(session))
}

/// Messages of one of the caller's sessions, oldest first.
pub async fn list_session_messages(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<String>,
) -> Result<ApiResponse<Vec<Message>>, ApiError> {
    state
        .store
        .get_session(&user.id, &session_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::not_found("Session nicht gefunden"))?;

    let messages = state
        .store
        .list_messages(&session_id)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Laden der Nachrichten", e))?;

    Ok(ApiResponse::ok(messages))
}
