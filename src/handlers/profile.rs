use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::auth::with_session_cookie,
    middleware::auth::VerifiedUser,
    models::profile::{CompleteProfilePayload, ProfileRecord},
};

#[derive(Debug, Serialize)]
pub struct CompleteProfileResponse {
    pub profile: ProfileRecord,
    pub token: String,
}

// O novo token já sai com hasProfile = true
pub async fn complete_profile(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    jar: CookieJar,
    Json(payload): Json<CompleteProfilePayload>,
) -> Result<(CookieJar, Json<CompleteProfileResponse>), AppError> {
    let (profile, token) = app_state.profile_service.complete_profile(claims.id, payload).await?;
    Ok((with_session_cookie(jar, &token), Json(CompleteProfileResponse { profile, token })))
}

pub async fn get_profile(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
) -> Result<Json<ProfileRecord>, AppError> {
    let profile = app_state.profile_service.get_profile(claims.id).await?;
    Ok(Json(profile))
}
