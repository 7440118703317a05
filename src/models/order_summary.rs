use super::cart::CartLine;
use crate::entities::order::PaymentMethod;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// What the customer sees after a successful checkout; kept in the session
/// until the next order replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub code: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub payment_method: PaymentMethod,
    pub card_last4: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<CartLine>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}
