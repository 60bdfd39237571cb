// src/models/shipments.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// pending -> in-transit -> delivered ; pending | in-transit -> failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shipment_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ShipmentStatus {
    Pending,
    InTransit,
    Delivered,
    Failed,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::InTransit => "in-transit",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Failed => "failed",
        }
    }

    pub fn can_transition_to(self, to: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        matches!(
            (self, to),
            (Pending, InTransit) | (InTransit, Delivered) | (Pending, Failed) | (InTransit, Failed)
        )
    }

    pub fn transition(self, to: ShipmentStatus) -> Result<ShipmentStatus, AppError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(AppError::invalid_transition("shipment", self, to))
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentEvent {
    pub status: ShipmentStatus,
    pub timestamp: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub delivery_person_id: Option<Uuid>,
    pub tracking_number: String,
    #[serde(skip_serializing)] // só o cliente recebe o OTP
    pub otp_code: String,
    pub status: ShipmentStatus,
    pub current_location: Option<Json<GeoPoint>>,
    pub events: Json<Vec<ShipmentEvent>>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub delivered_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Código de rastreio: prefixo + timestamp em base 36 + sufixo aleatório.
pub fn generate_tracking_number(now: DateTime<Utc>) -> String {
    let mut millis = now.timestamp_millis().max(0) as u64;
    let mut stamp = Vec::new();
    while millis > 0 {
        let digit = (millis % 36) as u32;
        stamp.push(std::char::from_digit(digit, 36).unwrap_or('0').to_ascii_uppercase());
        millis /= 36;
    }
    stamp.reverse();
    let stamp: String = stamp.into_iter().collect();
    let suffix = Uuid::new_v4().simple().to_string()[..5].to_uppercase();
    format!("DLG{}{}", stamp, suffix)
}

/// OTP de 6 dígitos (100000..=999999) para confirmar a entrega.
pub fn generate_delivery_otp() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let n = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    (100_000 + n % 900_000).to_string()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignShipmentPayload {
    pub delivery_person_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShipmentStatusPayload {
    pub status: ShipmentStatus,
    pub location: Option<GeoPoint>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    pub otp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipment_moves_forward_only() {
        use ShipmentStatus::*;
        assert!(Pending.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(Delivered));
        assert!(InTransit.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!InTransit.can_transition_to(Pending));
        for to in [Pending, InTransit, Delivered, Failed] {
            assert!(!Delivered.can_transition_to(to));
            assert!(!Failed.can_transition_to(to));
        }
    }

    #[test]
    fn in_transit_keeps_hyphen_on_the_wire() {
        let json = serde_json::to_string(&ShipmentStatus::InTransit).unwrap();
        assert_eq!(json, "\"in-transit\"");
    }

    #[test]
    fn generated_codes_have_expected_shape() {
        let otp = generate_delivery_otp();
        assert_eq!(otp.len(), 6);
        assert!(otp.parse::<u32>().unwrap() >= 100_000);

        let tracking = generate_tracking_number(Utc::now());
        assert!(tracking.starts_with("DLG"));
        assert!(tracking.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase()));
    }
}
