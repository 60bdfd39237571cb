// Decisões do guard expostas para o front-end e as páginas protegidas

use axum::{
    extract::{Query, State},
    http::{HeaderMap, Uri},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppState,
    middleware::{
        auth::extract_token,
        guard::{evaluate, GuardDecision},
    },
};

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub path: String,
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

// GET /api/session/access?path=/seller/products
pub async fn check_access(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AccessQuery>,
) -> Json<GuardDecision> {
    let claims = extract_token(&headers).and_then(|token| app_state.tokens.decode_session(&token));
    Json(evaluate(claims.as_ref(), &query.path, query.callback_url.as_deref()))
}

#[derive(Debug, Serialize)]
pub struct PageShell {
    pub page: String,
}

/// Só é alcançado depois que o guard liberou a página.
pub async fn page_shell(uri: Uri) -> Json<PageShell> {
    Json(PageShell { page: uri.path().to_string() })
}
