// src/models/reviews.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewPayload {
    #[validate(range(min = 1, max = 5, message = "A nota deve estar entre 1 e 5."))]
    pub rating: i16,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_outside_one_to_five_is_rejected() {
        for (rating, ok) in [(0, false), (1, true), (5, true), (6, false)] {
            let payload = CreateReviewPayload { rating, comment: None };
            assert_eq!(payload.validate().is_ok(), ok, "rating {rating}");
        }
    }
}
