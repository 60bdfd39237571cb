use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::{AuthenticatedUser, VerifiedUser, SESSION_COOKIE},
        rbac::{AdminRole, RequireRole},
    },
    models::auth::{
        AuthResponse, LoginUserPayload, RegisterUserPayload, RoleSwitchResponse, SwitchRolePayload, User,
        VerifyEmailQuery,
    },
};

/// Devolve o token no corpo e também no cookie de sessão.
pub fn with_session_cookie(jar: CookieJar, token: &str) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

fn session_response(jar: CookieJar, token: String) -> (CookieJar, Json<AuthResponse>) {
    (with_session_cookie(jar, &token), Json(AuthResponse { token }))
}

// Handler de registro
pub async fn register(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let token = app_state
        .auth_service
        .register_user(&payload.email, &payload.password, payload.role)
        .await?;

    Ok(session_response(jar, token))
}

// Handler de login
pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginUserPayload>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let token = app_state.auth_service.login_user(&payload.email, &payload.password).await?;

    Ok(session_response(jar, token))
}

// GET /api/auth/verify-email?token=...
pub async fn verify_email(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let token = app_state.auth_service.verify_email(&query.token).await?;
    Ok(session_response(jar, token))
}

pub async fn logout(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

// Reemite o token a partir do estado atual no banco
pub async fn refresh(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let token = app_state.auth_service.refresh_session(claims.id).await?;
    Ok(session_response(jar, token))
}

// Handler da rota protegida /me
pub async fn get_me(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<User>, AppError> {
    let user = app_state.auth_service.find_user(claims.id).await?;
    Ok(Json(user))
}

// --- Simulação de papel ---

pub async fn switch_role(
    State(app_state): State<AppState>,
    admin: RequireRole<AdminRole>,
    jar: CookieJar,
    Json(payload): Json<SwitchRolePayload>,
) -> Result<(CookieJar, Json<RoleSwitchResponse>), AppError> {
    let response = app_state.role_service.switch_role(admin.claims.id, payload.role).await?;
    Ok((with_session_cookie(jar, &response.token), Json(response)))
}

pub async fn restore_role(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RoleSwitchResponse>), AppError> {
    let response = app_state.role_service.restore_role(claims.id).await?;
    Ok((with_session_cookie(jar, &response.token), Json(response)))
}
