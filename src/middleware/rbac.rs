// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    middleware::auth::VerifiedUser,
    models::auth::{Role, SessionClaims},
};

/// 1. O Trait que define o papel exigido
pub trait RoleDef: Send + Sync + 'static {
    fn role() -> Role;
}

/// 2. O Extractor (Guardião). Carrega as claims já verificadas.
pub struct RequireRole<T> {
    pub claims: SessionClaims,
    _role: PhantomData<T>,
}

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A. Sessão verificada (401 / 403)
        let VerifiedUser(claims) = VerifiedUser::from_request_parts(parts, state).await?;

        // B. Papel, com a precedência de admin
        let required = T::role();
        if !claims.role_view().satisfies(required) {
            return Err(AppError::Forbidden(format!(
                "Você precisa do papel '{}' para realizar esta ação.",
                required
            )));
        }

        Ok(RequireRole { claims, _role: PhantomData })
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

pub struct AdminRole;
impl RoleDef for AdminRole {
    fn role() -> Role { Role::Admin }
}

pub struct SellerRole;
impl RoleDef for SellerRole {
    fn role() -> Role { Role::Seller }
}

pub struct DeliveryRole;
impl RoleDef for DeliveryRole {
    fn role() -> Role { Role::Delivery }
}
