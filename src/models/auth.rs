// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

// --- Papéis ---
// Os rótulos são os mesmos do tipo `user_role` no Postgres e das claims do JWT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Seller,
    Delivery,
    Support,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Seller => "seller",
            Role::Delivery => "delivery",
            Role::Support => "support",
            Role::Admin => "admin",
        }
    }

    /// Papéis que o próprio usuário pode escolher no cadastro.
    pub fn is_self_selectable(&self) -> bool {
        matches!(self, Role::Customer | Role::Seller | Role::Delivery)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Visão de papel (simulação de papel) ---
// `effective` é o papel em uso; `original` guarda o papel verdadeiro enquanto um
// admin simula outro papel.
//
// Precedência:
// - acesso de admin: effective == Admin OU original == Admin
// - qualquer outro papel: somente effective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleView {
    pub effective: Role,
    pub original: Option<Role>,
}

impl RoleView {
    pub fn new(effective: Role, original: Option<Role>) -> Self {
        Self { effective, original }
    }

    pub fn is_admin(&self) -> bool {
        self.effective == Role::Admin || self.original == Some(Role::Admin)
    }

    pub fn is_simulating(&self) -> bool {
        self.original.is_some_and(|r| r != self.effective)
    }

    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Role::Admin => self.is_admin(),
            other => self.effective == other,
        }
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub role: Role,
    pub original_role: Option<Role>,
    pub is_verified: bool,
    pub has_profile: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role_view(&self) -> RoleView {
        RoleView::new(self.role, self.original_role)
    }
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    pub role: Option<Role>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

// Claims da sessão, exatamente os campos que o guard avalia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub id: Uuid,
    pub role: Role,
    pub is_verified: bool,
    pub has_profile: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_role: Option<Role>,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

impl SessionClaims {
    pub fn role_view(&self) -> RoleView {
        RoleView::new(self.role, self.original_role)
    }
}

// Token de verificação de e-mail: subject = id do usuário
#[derive(Debug, Serialize, Deserialize)]
pub struct EmailTokenClaims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Deserialize)]
pub struct SwitchRolePayload {
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSwitchResponse {
    pub token: String,
    pub role: Role,
    pub original_role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulating_admin_keeps_admin_access_but_not_other_roles() {
        let view = RoleView::new(Role::Seller, Some(Role::Admin));
        assert!(view.is_admin());
        assert!(view.satisfies(Role::Admin));
        assert!(view.satisfies(Role::Seller));
        assert!(!view.satisfies(Role::Support));
        assert!(view.is_simulating());
    }

    #[test]
    fn admin_with_seller_backup_cannot_enter_seller_area() {
        let view = RoleView::new(Role::Admin, Some(Role::Seller));
        assert!(view.satisfies(Role::Admin));
        assert!(!view.satisfies(Role::Seller));
    }

    #[test]
    fn claims_use_camel_case_wire_names() {
        let claims = SessionClaims {
            id: Uuid::nil(),
            role: Role::Delivery,
            is_verified: true,
            has_profile: false,
            original_role: Some(Role::Admin),
            exp: 10,
            iat: 1,
        };
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["role"], "delivery");
        assert_eq!(value["isVerified"], true);
        assert_eq!(value["hasProfile"], false);
        assert_eq!(value["originalRole"], "admin");
    }
}
