//! Chat turn endpoint

use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};
use validator::Validate;

use super::envelope::{ApiJson, ApiResponse};
use super::error::ApiError;
use super::extract::AuthenticatedUser;
use crate::classifier::{detect_consciousness_level, extract_insights, ConsciousnessLevel, Insights};
use crate::completion::FALLBACK_REPLY;
use crate::conversation::{assemble_with_context, format_rag_context, user_context};
use crate::metrics;
use crate::retrieval::{rank_chunks, RagSource};
use crate::shared_state::AppState;
use crate::store::{NewMessage, Role};

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(required, length(min = 1))]
    pub message: Option<String>,
    #[validate(required, length(min = 1))]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub session_id: String,
    pub consciousness_level: ConsciousnessLevel,
    pub insights: Insights,
    pub rag_sources: Vec<RagSource>,
}

/// Run one chat turn: persist the user message, ask the model, persist the reply.
///
/// A failure after the user message is stored leaves it stored.
pub async fn chat(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<ChatRequest>,
) -> Result<ApiResponse<ChatResponse>, ApiError> {
    const MISSING_FIELDS: &str = "Nachricht und Session-ID sind erforderlich";

    payload
        .validate()
        .map_err(|_| ApiError::validation(MISSING_FIELDS))?;
    let (Some(message), Some(session_id)) = (payload.message, payload.session_id) else {
        return Err(ApiError::validation(MISSING_FIELDS));
    };

    info!("Chat turn for session {} by user {}", session_id, user.id);

    state
        .store
        .get_session(&user.id, &session_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::not_found("Session nicht gefunden"))?;

    let history = state
        .store
        .list_messages(&session_id)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Laden der Nachrichten", e))?;
    debug!("Loaded {} prior messages", history.len());

    state
        .store
        .insert_message(NewMessage::user(&session_id, &message))
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Speichern der Nachricht", e))?;

    let rag_sources = if state.config.rag_enabled {
        retrieve_context(&state, &user.id, &message).await
    } else {
        Vec::new()
    };
    let context = format_rag_context(&rag_sources);
    let entries = assemble_with_context(
        &state.config.system_prompt,
        context.as_deref(),
        &history,
        &message,
    );

    let options = &state.config.completion;
    let started = Instant::now();
    let completion = state
        .completion
        .complete(&entries, options)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Generieren der Antwort", e))?;
    metrics::observe_completion(started.elapsed().as_secs_f64());

    let reply = if completion.content.trim().is_empty() {
        FALLBACK_REPLY.to_string()
    } else {
        completion.content
    };

    let prior_user_turns = user_context(&history);
    let context = (!prior_user_turns.is_empty()).then_some(prior_user_turns.as_str());
    let consciousness_level = detect_consciousness_level(&message, context);
    let insights = extract_insights(&message, &reply);

    state
        .store
        .insert_message(NewMessage {
            session_id: session_id.clone(),
            role: Role::Assistant,
            content: reply.clone(),
            tokens: Some(i64::from(completion.usage.completion_tokens)),
            model: Some(completion.model),
            temperature: Some(options.temperature),
            metadata: Some(json!({ "consciousness_level": consciousness_level })),
        })
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Speichern der AI-Antwort", e))?;

    Ok(ApiResponse::ok(ChatResponse {
        message: reply,
        session_id,
        consciousness_level,
        insights,
        rag_sources,
    }))
}

/// Top document snippets for `message`; empty on any failure.
async fn retrieve_context(state: &AppState, user_id: &str, message: &str) -> Vec<RagSource> {
    let query = match state.completion.embed(message).await {
        Ok(embedding) => embedding,
        Err(e) => {
            warn!("Skipping retrieval, embedding failed: {}", e);
            return Vec::new();
        }
    };

    let chunks = match state.store.list_chunks(user_id).await {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!("Skipping retrieval, failed to load chunks: {}", e);
            return Vec::new();
        }
    };
    if chunks.is_empty() {
        return Vec::new();
    }

    let filenames: HashMap<String, String> = match state.store.list_documents(user_id).await {
        Ok(documents) => documents.into_iter().map(|d| (d.id, d.filename)).collect(),
        Err(e) => {
            warn!("Failed to load document names: {}", e);
            HashMap::new()
        }
    };

    let ranked = rank_chunks(
        &query,
        &chunks,
        state.config.rag_top_k,
        state.config.rag_min_similarity,
    );
    debug!("Retrieved {} of {} chunks", ranked.len(), chunks.len());

    ranked
        .into_iter()
        .map(|(chunk, similarity)| RagSource {
            content: chunk.content.clone(),
            source: filenames
                .get(&chunk.document_id)
                .cloned()
                .unwrap_or_else(|| chunk.document_id.clone()),
            similarity,
        })
        .collect()
}
