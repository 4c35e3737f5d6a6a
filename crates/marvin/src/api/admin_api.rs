//! Admin dashboard endpoints, restricted to `ADMIN_USER_IDS`

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::envelope::ApiResponse;
use super::error::ApiError;
use super::extract::AdminUser;
use crate::shared_state::AppState;
use crate::store::Profile;

const ADMIN_LOAD_FAILED: &str = "Fehler beim Laden der Admin-Daten";
pub const RECENT_USERS_LIMIT: usize = 20;

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub active_sessions: u64,
    pub messages_today: u64,
    pub uploaded_files: u64,
    pub system_status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AdminUserSummary {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl From<Profile> for AdminUserSummary {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.user_id,
            name: profile.name.unwrap_or_else(|| "Unbekannt".to_string()),
            created_at: profile.created_at,
            last_login: profile.updated_at,
        }
    }
}

/// Start of the current UTC day.
fn start_of_today() -> DateTime<Utc> {
    let now = Utc::now();
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

pub async fn stats(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<ApiResponse<AdminStats>, ApiError> {
    info!("Admin stats requested by {}", admin.id);

    let counts = state
        .store
        .counts(start_of_today())
        .await
        .map_err(|e| ApiError::upstream(ADMIN_LOAD_FAILED, e))?;

    Ok(ApiResponse::ok(AdminStats {
        total_users: counts.profiles,
        active_sessions: counts.active_sessions,
        messages_today: counts.messages_since,
        uploaded_files: counts.documents,
        system_status: "healthy",
    }))
}

/// Most recently created profiles.
pub async fn users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<ApiResponse<Vec<AdminUserSummary>>, ApiError> {
    let profiles = state
        .store
        .recent_profiles(RECENT_USERS_LIMIT)
        .await
        .map_err(|e| ApiError::upstream(ADMIN_LOAD_FAILED, e))?;

    Ok(ApiResponse::ok(
        profiles.into_iter().map(AdminUserSummary::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_of_today_is_midnight() {
        let midnight = start_of_today();
        assert_eq!(midnight.date_naive(), Utc::now().date_naive());
        assert_eq!(midnight.time(), chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }
}
