// src/models/profile.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    auth::Role,
    catalog::{validate_attributes, AttributeMap},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1))]
    pub label: String,
    #[validate(length(min = 1))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 1))]
    pub postal_code: String,
    #[validate(length(min = 1))]
    pub country: String,
}

// --- Perfis por papel (1:1 com o usuário) ---

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub addresses: Json<Vec<Address>>,
    pub preferences: Json<AttributeMap>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub kyc_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SupportProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub vehicle_type: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

// --- Payloads de conclusão de perfil ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileInput {
    #[validate(length(min = 1, max = 120, message = "O nome completo é obrigatório."))]
    pub full_name: String,
    #[validate(length(min = 8, max = 20, message = "Telefone inválido."))]
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(nested)]
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[validate(custom(function = "validate_attributes"))]
    #[serde(default)]
    pub preferences: AttributeMap,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfileInput {
    #[validate(length(min = 1, max = 120, message = "O nome da empresa é obrigatório."))]
    pub business_name: String,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SupportProfileInput {
    #[validate(length(min = 1, max = 120))]
    pub display_name: String,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryProfileInput {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 8, max = 20, message = "Telefone inválido."))]
    pub phone: String,
    #[validate(length(min = 1, max = 40))]
    pub vehicle_type: String,
}

/// O payload é marcado pelo papel (`{"kind": "seller", ...}`).
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CompleteProfilePayload {
    Customer(UserProfileInput),
    Seller(SellerProfileInput),
    Support(SupportProfileInput),
    Delivery(DeliveryProfileInput),
}

impl CompleteProfilePayload {
    /// Admins e clientes usam o perfil de usuário comum.
    pub fn matches_role(&self, role: Role) -> bool {
        matches!(
            (self, role),
            (CompleteProfilePayload::Customer(_), Role::Customer | Role::Admin)
                | (CompleteProfilePayload::Seller(_), Role::Seller)
                | (CompleteProfilePayload::Support(_), Role::Support)
                | (CompleteProfilePayload::Delivery(_), Role::Delivery)
        )
    }

    pub fn validate_inner(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            CompleteProfilePayload::Customer(p) => p.validate(),
            CompleteProfilePayload::Seller(p) => p.validate(),
            CompleteProfilePayload::Support(p) => p.validate(),
            CompleteProfilePayload::Delivery(p) => p.validate(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProfileRecord {
    Customer(UserProfile),
    Seller(SellerProfile),
    Support(SupportProfile),
    Delivery(DeliveryProfile),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_payload_must_match_role() {
        let payload: CompleteProfilePayload =
            serde_json::from_str(r#"{"kind":"seller","businessName":"Loja da Ana"}"#).unwrap();
        assert!(payload.matches_role(Role::Seller));
        assert!(!payload.matches_role(Role::Customer));
        assert!(payload.validate_inner().is_ok());

        let payload: CompleteProfilePayload =
            serde_json::from_str(r#"{"kind":"customer","fullName":"Root"}"#).unwrap();
        assert!(payload.matches_role(Role::Admin));
    }

    #[test]
    fn empty_delivery_phone_fails_validation() {
        let payload: CompleteProfilePayload = serde_json::from_str(
            r#"{"kind":"delivery","fullName":"Rui","phone":"","vehicleType":"bike"}"#,
        )
        .unwrap();
        assert!(payload.validate_inner().is_err());
    }
}
