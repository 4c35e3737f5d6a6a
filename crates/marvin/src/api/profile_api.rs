//! Profile and onboarding endpoints

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::envelope::{ApiJson, ApiResponse};
use super::error::{ApiError, INVALID_REQUEST};
use super::extract::AuthenticatedUser;
use crate::shared_state::AppState;
use crate::store::{Profile, ProfileUpdate};

#[derive(Debug, Deserialize, Validate)]
pub struct OnboardingRequest {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1900, max = 2100))]
    pub year_of_birth: Option<i32>,
    #[serde(default)]
    pub birth_time: Option<String>,
    #[serde(default)]
    pub birth_place: Option<String>,
    #[serde(default)]
    pub consent_data_processing: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The caller's profile; `data` is absent when none exists yet.
pub async fn get_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<ApiResponse<Profile>, ApiError> {
    let profile = state
        .store
        .get_profile(&user.id)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Laden des Profils", e))?;

    Ok(ApiResponse {
        success: true,
        data: profile,
        error: None,
        message: None,
    })
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<ApiResponse<Profile>, ApiError> {
    let profile = state
        .store
        .upsert_profile(&user.id, update)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Speichern des Profils", e))?;

    info!("Updated profile for user {}", user.id);
    Ok(ApiResponse::ok(profile).with_message("Profil erfolgreich aktualisiert"))
}

/// First-run profile capture; refuses to store anything without consent.
pub async fn onboarding(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(request): ApiJson<OnboardingRequest>,
) -> Result<ApiResponse<Profile>, ApiError> {
    if !request.consent_data_processing {
        return Err(ApiError::validation(
            "Bitte stimmen Sie der Datenverarbeitung zu, um fortzufahren.",
        ));
    }
    request
        .validate()
        .map_err(|_| ApiError::validation(INVALID_REQUEST))?;

    let update = ProfileUpdate {
        name: non_blank(request.name),
        year_of_birth: request.year_of_birth,
        birth_time: non_blank(request.birth_time),
        birth_place: non_blank(request.birth_place),
        consent_data_processing: Some(true),
        consent_timestamp: Some(Utc::now()),
        ..Default::default()
    };

    let profile = state
        .store
        .upsert_profile(&user.id, update)
        .await
        .map_err(|e| ApiError::upstream("Fehler beim Speichern Ihrer Profilinformationen.", e))?;

    info!("Completed onboarding for user {}", user.id);
    Ok(ApiResponse::ok(profile))
}
