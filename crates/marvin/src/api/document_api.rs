//! Document endpoints - text uploads chunked for retrieval

use axum::extract::{Query, State};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::envelope::{ApiJson, ApiResponse};
use super::error::ApiError;
use super::extract::AuthenticatedUser;
use crate::retrieval::{chunk_text, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::shared_state::AppState;
use crate::store::{Document, NewDocument, NewDocumentChunk};
use crate::utils::TextUtils;

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_FILE_TYPE: &str = "text/plain";
/// Embedding requests in flight per upload.
pub const EMBEDDING_CONCURRENCY: usize = 8;

const UPLOAD_FAILED: &str = "Fehler beim Hochladen des Dokuments.";

#[derive(Debug, Deserialize)]
pub struct UploadDocumentRequest {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub file_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDocumentQuery {
    pub id: Option<String>,
}

pub async fn list_documents(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<ApiResponse<Vec<Document>>, ApiError> {
    let documents = state
        .store
        .list_documents(&user.id)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Laden der Dokumente", e))?;

    Ok(ApiResponse::ok(documents))
}

/// Store a text document and its chunks. Chunks are embedded when retrieval
/// is enabled; a failed embedding leaves that chunk without a vector.
pub async fn upload_document(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(request): ApiJson<UploadDocumentRequest>,
) -> Result<ApiResponse<Document>, ApiError> {
    if request.filename.trim().is_empty() || request.content.trim().is_empty() {
        return Err(ApiError::validation("Bitte wählen Sie eine Datei aus."));
    }
    if request.content.len() > MAX_DOCUMENT_BYTES {
        return Err(ApiError::validation("Datei ist zu groß (max. 10 MB)"));
    }

    let chunks = chunk_text(&request.content, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP);
    let file_size = request.content.len();
    info!(
        "Uploading {} ({}) for user {} as {} chunk(s)",
        request.filename,
        TextUtils::format_file_size(file_size as u64),
        user.id,
        chunks.len()
    );

    let embeddings: Vec<Option<Vec<f32>>> = if state.config.rag_enabled {
        stream::iter(chunks.iter().cloned())
            .map(|chunk| {
                let state = state.clone();
                async move { embed_chunk(&state, &chunk).await }
            })
            .buffered(EMBEDDING_CONCURRENCY)
            .collect()
            .await
    } else {
        vec![None; chunks.len()]
    };

    let document = state
        .store
        .insert_document(NewDocument {
            user_id: user.id.clone(),
            filename: request.filename.trim().to_string(),
            content: request.content,
            chunk_count: i32::try_from(chunks.len()).map_err(ApiError::internal)?,
            file_size: i64::try_from(file_size).map_err(ApiError::internal)?,
            file_type: request
                .file_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string()),
        })
        .await
        .map_err(|e| ApiError::upstream(UPLOAD_FAILED, e))?;

    let rows: Vec<NewDocumentChunk> = chunks
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(index, (content, embedding))| NewDocumentChunk {
            document_id: document.id.clone(),
            user_id: user.id.clone(),
            token_count: TextUtils::estimate_tokens(&content) as i32,
            chunk_index: index as i32,
            content,
            embedding,
        })
        .collect();

    let stored = state
        .store
        .insert_chunks(rows)
        .await
        .map_err(|e| ApiError::upstream(UPLOAD_FAILED, e))?;
    debug!("Stored {} chunks for document {}", stored, document.id);

    Ok(ApiResponse::ok(document).with_message("Dokument erfolgreich hochgeladen und verarbeitet!"))
}

async fn embed_chunk(state: &AppState, chunk: &str) -> Option<Vec<f32>> {
    match state.completion.embed(chunk).await {
        Ok(embedding) => Some(embedding),
        Err(e) => {
            warn!("Storing chunk without embedding: {}", e);
            None
        }
    }
}

pub async fn delete_document(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<DeleteDocumentQuery>,
) -> Result<ApiResponse<()>, ApiError> {
    let document_id = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Dokument-ID ist erforderlich"))?;

    let deleted = state
        .store
        .delete_document(&user.id, &document_id)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Löschen des Dokuments.", e))?;

    if !deleted {
        return Err(ApiError::not_found("Dokument nicht gefunden"));
    }

    info!("Deleted document {} for user {}", document_id, user.id);
    Ok(ApiResponse::done("Dokument erfolgreich gelöscht!"))
}
