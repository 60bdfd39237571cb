// src/middleware/guard.rs
//
// Guard das páginas: decide, só com as claims e o caminho, se a requisição segue
// ou é redirecionada. Nunca falha; token ruim conta como ausência de sessão.

use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{
    config::AppState,
    middleware::auth::extract_token,
    models::auth::{Role, SessionClaims},
};

pub const SIGNIN_PAGE: &str = "/auth/signin";
pub const SIGNUP_PAGE: &str = "/auth/signup";
pub const VERIFY_EMAIL_PAGE: &str = "/auth/verify-email";
pub const COMPLETE_PROFILE_PAGE: &str = "/auth/complete-profile";
pub const DASHBOARD_PAGE: &str = "/dashboard";
pub const FORBIDDEN_PAGE: &str = "/forbidden";

const AUTH_PAGES: [&str; 4] = [SIGNIN_PAGE, SIGNUP_PAGE, VERIFY_EMAIL_PAGE, COMPLETE_PROFILE_PAGE];

const ROLE_PREFIXES: [(&str, Role); 4] = [
    ("/admin", Role::Admin),
    ("/seller", Role::Seller),
    ("/support", Role::Support),
    ("/delivery", Role::Delivery),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "target", rename_all = "lowercase")]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// `/admin` casa com `/admin` e `/admin/x`, mas não com `/administrator`.
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn path_only(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Forma canônica usada por todas as regras: sem query nem fragmento, barra invertida vira `/`,
/// barras repetidas colapsam e segmentos `.`/`..` são resolvidos.
pub fn normalize_path(raw: &str) -> String {
    let path = path_only(raw).replace('\\', "/");
    let mut collapsed = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        collapsed.push('/');
        collapsed.push_str(segment);
    }
    if collapsed.is_empty() {
        collapsed.push('/');
    }
    Url::parse("http://guard")
        .and_then(|base| base.join(&collapsed))
        .map(|url| url.path().to_string())
        .unwrap_or(collapsed)
}

fn is_auth_page(path: &str) -> bool {
    let path = path_only(path).trim_end_matches('/');
    AUTH_PAGES.contains(&path)
}

pub fn required_role(path: &str) -> Option<Role> {
    ROLE_PREFIXES
        .iter()
        .find(|(prefix, _)| has_prefix(path, prefix))
        .map(|(_, role)| *role)
}

/// Só aceita caminhos locais (`/x`, nunca `//host` ou `/\host`) que não sejam páginas de auth.
pub fn sanitize_callback(callback: Option<&str>) -> Option<String> {
    let callback = callback?.trim();
    let mut chars = callback.chars();
    if chars.next() != Some('/') || matches!(chars.next(), Some('/') | Some('\\')) {
        return None;
    }
    if callback.chars().any(char::is_control) || is_auth_page(callback) {
        return None;
    }
    Some(callback.to_string())
}

/// `target?callbackUrl=<path>`, exceto quando o caminho já é uma página de auth.
fn redirect_with_callback(target: &str, path: &str) -> GuardDecision {
    if path.starts_with("/auth/") || is_auth_page(path) {
        return GuardDecision::Redirect(target.to_string());
    }
    let location = Url::parse_with_params(&format!("http://guard{}", target), &[("callbackUrl", path)])
        .ok()
        .and_then(|url| url.query().map(|q| format!("{}?{}", url.path(), q)))
        .unwrap_or_else(|| target.to_string());
    GuardDecision::Redirect(location)
}

/// Ordem fixa; a primeira regra que casar decide.
pub fn evaluate(claims: Option<&SessionClaims>, path: &str, callback: Option<&str>) -> GuardDecision {
    let path = normalize_path(path);
    let path = path.as_str();

    // 1. Sem sessão: só as páginas públicas de auth
    let Some(claims) = claims else {
        if path == SIGNIN_PAGE || path == SIGNUP_PAGE {
            return GuardDecision::Allow;
        }
        return GuardDecision::Redirect(SIGNIN_PAGE.to_string());
    };

    // 2. E-mail não verificado
    if !claims.is_verified {
        if path == VERIFY_EMAIL_PAGE {
            return GuardDecision::Allow;
        }
        return redirect_with_callback(VERIFY_EMAIL_PAGE, path);
    }

    // 3. Verificado, sem perfil
    if !claims.has_profile {
        if path == COMPLETE_PROFILE_PAGE {
            return GuardDecision::Allow;
        }
        return redirect_with_callback(COMPLETE_PROFILE_PAGE, path);
    }

    // Sessão completa não tem o que fazer nas páginas de auth
    if is_auth_page(path) {
        let target = sanitize_callback(callback).unwrap_or_else(|| DASHBOARD_PAGE.to_string());
        return GuardDecision::Redirect(target);
    }

    // 4. Prefixo de papel
    if let Some(role) = required_role(path) {
        if !claims.role_view().satisfies(role) {
            return GuardDecision::Redirect(FORBIDDEN_PAGE.to_string());
        }
    }

    // 5.
    GuardDecision::Allow
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

// O middleware em si, montado nos prefixos de página
pub async fn page_guard(State(app_state): State<AppState>, request: Request, next: Next) -> Response {
    let claims = extract_token(request.headers()).and_then(|token| app_state.tokens.decode_session(&token));
    let callback = Query::<CallbackQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.callback_url);
    let path = request.uri().path().to_string();

    match evaluate(claims.as_ref(), &path, callback.as_deref()) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect(target) => {
            tracing::debug!("Guard: {} -> {}", path, target);
            Redirect::temporary(&target).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn claims(role: Role, original_role: Option<Role>, is_verified: bool, has_profile: bool) -> SessionClaims {
        SessionClaims {
            id: Uuid::nil(),
            role,
            is_verified,
            has_profile,
            original_role,
            exp: usize::MAX,
            iat: 0,
        }
    }

    fn ready(role: Role, original_role: Option<Role>) -> SessionClaims {
        claims(role, original_role, true, true)
    }

    fn redirect(target: &str) -> GuardDecision {
        GuardDecision::Redirect(target.to_string())
    }

    #[test]
    fn anonymous_users_reach_only_signin_and_signup() {
        assert_eq!(evaluate(None, SIGNIN_PAGE, None), GuardDecision::Allow);
        assert_eq!(evaluate(None, SIGNUP_PAGE, None), GuardDecision::Allow);
        assert_eq!(evaluate(None, "/dashboard", None), redirect(SIGNIN_PAGE));
        assert_eq!(evaluate(None, VERIFY_EMAIL_PAGE, None), redirect(SIGNIN_PAGE));
    }

    #[test]
    fn unverified_redirect_carries_callback() {
        let c = claims(Role::Seller, None, false, false);
        assert_eq!(
            evaluate(Some(&c), "/seller/products", None),
            redirect("/auth/verify-email?callbackUrl=%2Fseller%2Fproducts")
        );
        // Sem callback quando a origem já é página de auth
        assert_eq!(evaluate(Some(&c), SIGNIN_PAGE, None), redirect(VERIFY_EMAIL_PAGE));
        assert_eq!(evaluate(Some(&c), VERIFY_EMAIL_PAGE, None), GuardDecision::Allow);
    }

    #[test]
    fn missing_profile_goes_to_complete_profile() {
        let c = claims(Role::Customer, None, true, false);
        assert_eq!(
            evaluate(Some(&c), "/dashboard", None),
            redirect("/auth/complete-profile?callbackUrl=%2Fdashboard")
        );
        assert_eq!(evaluate(Some(&c), COMPLETE_PROFILE_PAGE, None), GuardDecision::Allow);
    }

    #[test]
    fn complete_session_bounces_off_auth_pages() {
        let c = ready(Role::Customer, None);
        assert_eq!(evaluate(Some(&c), SIGNIN_PAGE, None), redirect(DASHBOARD_PAGE));
        assert_eq!(
            evaluate(Some(&c), COMPLETE_PROFILE_PAGE, Some("/dashboard/orders")),
            redirect("/dashboard/orders")
        );
        // Callback apontando para auth ou para outro host é descartado
        assert_eq!(evaluate(Some(&c), SIGNIN_PAGE, Some("/auth/signin")), redirect(DASHBOARD_PAGE));
        assert_eq!(evaluate(Some(&c), SIGNIN_PAGE, Some("//evil.example")), redirect(DASHBOARD_PAGE));
        assert_eq!(evaluate(Some(&c), SIGNIN_PAGE, Some("https://evil.example")), redirect(DASHBOARD_PAGE));
    }

    #[test]
    fn role_prefixes_are_segment_aware() {
        let seller = ready(Role::Seller, None);
        assert_eq!(evaluate(Some(&seller), "/seller", None), GuardDecision::Allow);
        assert_eq!(evaluate(Some(&seller), "/seller/orders", None), GuardDecision::Allow);
        assert_eq!(evaluate(Some(&seller), "/admin", None), redirect(FORBIDDEN_PAGE));
        assert_eq!(evaluate(Some(&seller), "/administrator", None), GuardDecision::Allow);
        assert_eq!(evaluate(Some(&seller), "/delivery/today", None), redirect(FORBIDDEN_PAGE));
    }

    #[test]
    fn query_fragment_and_slashes_do_not_skip_role_check() {
        let seller = ready(Role::Seller, None);
        for path in [
            "/admin?tab=users",
            "/admin#users",
            "//admin",
            "///admin/users",
            "/admin/",
            "/\\admin",
            "/seller/../admin",
            "/admin/./users?x=1#y",
        ] {
            assert_eq!(evaluate(Some(&seller), path, None), redirect(FORBIDDEN_PAGE), "{}", path);
        }
        assert_eq!(evaluate(Some(&seller), "/seller?tab=orders", None), GuardDecision::Allow);
        assert_eq!(evaluate(None, "/auth/signin?callbackUrl=%2Fadmin", None), GuardDecision::Allow);
    }

    #[test]
    fn normalized_path_is_canonical() {
        assert_eq!(normalize_path("//admin//users/?a=1#b"), "/admin/users");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/seller/../../admin"), "/admin");
        assert_eq!(normalize_path("/auth/signin/"), SIGNIN_PAGE);
    }

    #[test]
    fn simulating_admin_keeps_admin_area() {
        let simulating = ready(Role::Seller, Some(Role::Admin));
        assert_eq!(evaluate(Some(&simulating), "/admin/users", None), GuardDecision::Allow);
        assert_eq!(evaluate(Some(&simulating), "/seller/products", None), GuardDecision::Allow);
        assert_eq!(evaluate(Some(&simulating), "/support", None), redirect(FORBIDDEN_PAGE));
    }

    #[test]
    fn decision_serializes_for_access_endpoint() {
        assert_eq!(serde_json::to_value(GuardDecision::Allow).unwrap(), serde_json::json!({"decision": "allow"}));
        assert_eq!(
            serde_json::to_value(redirect("/forbidden")).unwrap(),
            serde_json::json!({"decision": "redirect", "target": "/forbidden"})
        );
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Customer),
            Just(Role::Seller),
            Just(Role::Delivery),
            Just(Role::Support),
            Just(Role::Admin),
        ]
    }

    fn any_page() -> impl Strategy<Value = String> {
        let base = prop::sample::select(vec![
            "", "/dashboard", "/admin", "/seller", "/support", "/delivery", "/auth", "/auth/signin",
            "/auth/signup", "/auth/complete-profile", "/administrator", "/products",
        ]);
        (base, "[a-z0-9/-]{0,12}").prop_map(|(b, rest)| format!("{}/{}", b, rest))
    }

    proptest! {
        #[test]
        fn unverified_always_lands_on_verification(
            role in any_role(),
            original in prop::option::of(any_role()),
            has_profile in any::<bool>(),
            path in any_page(),
        ) {
            let c = claims(role, original, false, has_profile);
            let decision = evaluate(Some(&c), &path, None);
            if normalize_path(&path) == VERIFY_EMAIL_PAGE {
                prop_assert_eq!(decision, GuardDecision::Allow);
            } else {
                match decision {
                    GuardDecision::Redirect(target) => prop_assert!(target.starts_with(VERIFY_EMAIL_PAGE)),
                    GuardDecision::Allow => prop_assert!(false, "unverified allowed on {}", path),
                }
            }
        }

        #[test]
        fn admin_simulation_follows_role_view(suffix in "[a-z0-9/]{0,12}") {
            let admin_with_seller = ready(Role::Admin, Some(Role::Seller));
            prop_assert_eq!(evaluate(Some(&admin_with_seller), &format!("/admin/{}", suffix), None), GuardDecision::Allow);
            prop_assert_eq!(
                evaluate(Some(&admin_with_seller), &format!("/seller/{}", suffix), None),
                redirect(FORBIDDEN_PAGE)
            );
        }

        #[test]
        fn anonymous_never_passes_protected_prefixes(path in any_page()) {
            let canonical = normalize_path(&path);
            if required_role(&canonical).is_some() || has_prefix(&canonical, DASHBOARD_PAGE) {
                prop_assert_eq!(evaluate(None, &path, None), redirect(SIGNIN_PAGE));
            }
        }

        #[test]
        fn bounce_target_is_always_local_and_outside_auth(callback in ".{0,24}") {
            let c = ready(Role::Customer, None);
            match evaluate(Some(&c), SIGNIN_PAGE, Some(&callback)) {
                GuardDecision::Redirect(target) => {
                    prop_assert!(target.starts_with('/'));
                    prop_assert!(!target.starts_with("//"));
                    prop_assert!(!is_auth_page(&target));
                }
                GuardDecision::Allow => prop_assert!(false, "auth page allowed for complete session"),
            }
        }

        #[test]
        fn decorated_admin_paths_stay_forbidden_for_sellers(
            slashes in 1usize..4,
            rest in "[a-z0-9/]{0,8}",
            tail in prop::sample::select(vec!["", "?tab=1", "#top", "?a=b#c"]),
        ) {
            let seller = ready(Role::Seller, None);
            let path = format!("{}admin/{}{}", "/".repeat(slashes), rest, tail);
            prop_assert_eq!(evaluate(Some(&seller), &path, None), redirect(FORBIDDEN_PAGE));
        }

        #[test]
        fn guard_never_panics(path in ".{0,40}", verified in any::<bool>(), profile in any::<bool>(), role in any_role()) {
            let c = claims(role, None, verified, profile);
            let _ = evaluate(Some(&c), &path, Some(&path));
            let _ = evaluate(None, &path, None);
        }
    }
}
