use crate::{
    auth::AuthUser,
    entities::{
        order::{self, PaymentMethod},
        order_line,
    },
    errors::{is_unique_violation, FormErrors, ServiceError},
    models::OrderSummary,
    session::Session,
};
use chrono::Utc;
use metrics::counter;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const ORDER_CODE_LEN: usize = 10;
const ORDER_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const EMPTY_CART: &str = "Your cart is empty.";
const CODE_ATTEMPTS: usize = 3;

static CARD_EXPIRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$").unwrap_or_else(|_| unreachable!()));

/// Shipping and payment details submitted at checkout. Absent text fields
/// decode as empty strings and the payment method is parsed during
/// validation, so every missing value is reported as a field error rather
/// than a decode failure.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CheckoutInput {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Full name is required (max 200)."))]
    pub full_name: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 20, message = "Phone is required (max 20)."))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 300, message = "Address is required (max 300)."))]
    pub address: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "City is required (max 100)."))]
    pub city: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 10, message = "Postal code is required (max 10)."))]
    pub postal_code: String,
    #[schema(example = "card")]
    pub payment_method: Option<String>,
    #[validate(length(max = 19, message = "Card number is too long."))]
    pub card_number: Option<String>,
    #[validate(regex(path = "CARD_EXPIRY_RE", message = "Use the MM/YY format."))]
    pub card_expiry: Option<String>,
    #[validate(length(max = 4, message = "CVV is too long."))]
    pub card_cvv: Option<String>,
    pub notes: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Field rules plus the card fields that become mandatory when paying by
/// card. Every failing field is reported; on success the parsed payment
/// method is returned.
pub fn validate_checkout(input: &CheckoutInput) -> Result<PaymentMethod, FormErrors> {
    let mut errors = match input.validate() {
        Ok(()) => FormErrors::new(),
        Err(e) => FormErrors::from(e),
    };

    let method = match input.payment_method.as_deref().map(str::trim) {
        None | Some("") => {
            errors.add_field("payment_method", "Choose a payment method.");
            None
        }
        Some(raw) => {
            let parsed = raw.to_lowercase().parse::<PaymentMethod>().ok();
            if parsed.is_none() {
                errors.add_field(
                    "payment_method",
                    format!("'{}' is not a valid payment method.", raw),
                );
            }
            parsed
        }
    };

    if method == Some(PaymentMethod::Card) {
        if is_blank(&input.card_number) {
            errors.add_field("card_number", "Card number is required when paying by card.");
        }
        if is_blank(&input.card_expiry) {
            errors.add_field("card_expiry", "Card expiry is required when paying by card.");
        }
        if is_blank(&input.card_cvv) {
            errors.add_field("card_cvv", "CVV is required when paying by card.");
        }
    }

    errors.into_result()?;
    method.ok_or_else(|| FormErrors::field("payment_method", "Choose a payment method."))
}

pub fn generate_order_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ORDER_CODE_LEN)
        .map(|_| ORDER_CODE_ALPHABET[rng.gen_range(0..ORDER_CODE_ALPHABET.len())] as char)
        .collect()
}

fn card_last4(input: &CheckoutInput, method: PaymentMethod) -> Option<String> {
    if method != PaymentMethod::Card {
        return None;
    }
    let digits: Vec<char> = input
        .card_number
        .as_deref()?
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let start = digits.len().saturating_sub(4);
    Some(digits[start..].iter().collect())
}

/// Values to pre-populate the checkout form with.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutPrefill {
    pub full_name: String,
    pub email: String,
}

/// Turns the session cart into an order. Payment is simulated: nothing
/// is charged and only the card's last four digits are kept.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn prefill(&self, user: &AuthUser) -> CheckoutPrefill {
        CheckoutPrefill {
            full_name: user.user.full_name(),
            email: user.user.email.clone(),
        }
    }

    #[instrument(skip(self, session, user, input), fields(user_id = %user.id()))]
    pub async fn checkout(
        &self,
        session: &Session,
        user: &AuthUser,
        input: CheckoutInput,
    ) -> Result<OrderSummary, ServiceError> {
        let cart = session.cart();
        if cart.is_empty() {
            return Err(FormErrors::form(EMPTY_CART).into());
        }
        let method = validate_checkout(&input)?;

        let lines: Vec<_> = cart.lines().cloned().collect();
        let total = cart.total();
        let last4 = card_last4(&input, method);
        let notes = super::non_blank(input.notes.clone());

        let mut attempt = 0;
        let (order_id, code, created_at) = loop {
            attempt += 1;
            let code = generate_order_code();
            match self
                .persist(user.id(), &code, &input, method, last4.clone(), notes.clone(), &lines, total)
                .await
            {
                Ok(order) => break (order.id, order.code, order.created_at),
                Err(ServiceError::DatabaseError(err))
                    if is_unique_violation(&err) && attempt < CODE_ATTEMPTS =>
                {
                    warn!(code = %code, "order code collision, regenerating");
                }
                Err(err) => return Err(err),
            }
        };

        let summary = OrderSummary {
            order_id,
            code,
            full_name: input.full_name,
            email: input.email,
            phone: input.phone,
            address: input.address,
            city: input.city,
            postal_code: input.postal_code,
            payment_method: method,
            card_last4: last4,
            notes,
            lines,
            total,
            created_at,
        };
        session.complete_checkout(summary.clone());

        counter!("vetclinic.checkouts", 1);
        info!(order_id = %summary.order_id, code = %summary.code, total = %summary.total, "checkout completed");
        Ok(summary)
    }

    pub fn confirmation(&self, session: &Session) -> Result<OrderSummary, ServiceError> {
        session
            .last_order()
            .ok_or_else(|| ServiceError::NotFound("No completed order in this session".to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist(
        &self,
        user_id: Uuid,
        code: &str,
        input: &CheckoutInput,
        method: PaymentMethod,
        card_last4: Option<String>,
        notes: Option<String>,
        lines: &[crate::models::CartLine],
        total: rust_decimal::Decimal,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let order_id = Uuid::new_v4();

        let order = order::ActiveModel {
            id: Set(order_id),
            code: Set(code.to_string()),
            user_id: Set(user_id),
            full_name: Set(input.full_name.clone()),
            email: Set(input.email.clone()),
            phone: Set(input.phone.clone()),
            address: Set(input.address.clone()),
            city: Set(input.city.clone()),
            postal_code: Set(input.postal_code.clone()),
            payment_method: Set(method),
            card_last4: Set(card_last4),
            notes: Set(notes),
            total: Set(total),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        for line in lines {
            order_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                line_key: Set(line.key.clone()),
                category: Set(line.type_tag),
                product_id: Set(line.product_id),
                name: Set(line.name.clone()),
                unit_price: Set(line.unit_price),
                quantity: Set(line.quantity),
                subtotal: Set(line.subtotal),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(method: PaymentMethod) -> CheckoutInput {
        CheckoutInput {
            full_name: "Ana Pérez".into(),
            email: "ana@example.com".into(),
            phone: "600000000".into(),
            address: "Calle Mayor 1".into(),
            city: "Madrid".into(),
            postal_code: "28001".into(),
            payment_method: Some(method.to_string()),
            card_number: None,
            card_expiry: None,
            card_cvv: None,
            notes: None,
        }
    }

    #[test]
    fn card_payment_requires_each_card_field() {
        let errors = validate_checkout(&input(PaymentMethod::Card)).unwrap_err();
        assert!(errors.has_field("card_number"));
        assert!(errors.has_field("card_expiry"));
        assert!(errors.has_field("card_cvv"));
    }

    #[test]
    fn cash_and_transfer_skip_card_fields() {
        assert_eq!(validate_checkout(&input(PaymentMethod::Cash)), Ok(PaymentMethod::Cash));
        assert_eq!(
            validate_checkout(&input(PaymentMethod::Transfer)),
            Ok(PaymentMethod::Transfer)
        );
    }

    #[test]
    fn expiry_must_be_month_and_year() {
        let mut form = input(PaymentMethod::Card);
        form.card_number = Some("4111 1111 1111 1111".into());
        form.card_cvv = Some("123".into());

        form.card_expiry = Some("13/29".into());
        assert!(validate_checkout(&form).unwrap_err().has_field("card_expiry"));

        form.card_expiry = Some("07/29".into());
        assert_eq!(validate_checkout(&form), Ok(PaymentMethod::Card));
        assert_eq!(card_last4(&form, PaymentMethod::Card).as_deref(), Some("1111"));
    }

    #[test]
    fn missing_shipping_fields_are_all_reported() {
        let mut form = input(PaymentMethod::Cash);
        form.full_name.clear();
        form.city.clear();
        form.email = "not-an-email".into();
        let errors = validate_checkout(&form).unwrap_err();
        assert!(errors.has_field("full_name"));
        assert!(errors.has_field("city"));
        assert!(errors.has_field("email"));
    }

    #[test]
    fn payment_method_must_be_present_and_known() {
        let mut form = input(PaymentMethod::Cash);
        form.payment_method = None;
        assert!(validate_checkout(&form).unwrap_err().has_field("payment_method"));

        form.payment_method = Some("  ".into());
        assert!(validate_checkout(&form).unwrap_err().has_field("payment_method"));

        form.payment_method = Some("bitcoin".into());
        assert!(validate_checkout(&form).unwrap_err().has_field("payment_method"));

        form.payment_method = Some("CASH".into());
        assert_eq!(validate_checkout(&form), Ok(PaymentMethod::Cash));
    }

    #[test]
    fn absent_keys_decode_to_field_errors() {
        let form: CheckoutInput =
            serde_json::from_value(serde_json::json!({ "payment_method": "cash" })).unwrap();
        let errors = validate_checkout(&form).unwrap_err();
        for field in ["full_name", "email", "phone", "address", "city", "postal_code"] {
            assert!(errors.has_field(field), "{} should be reported", field);
        }
    }

    #[test]
    fn order_codes_are_ten_uppercase_alphanumerics() {
        for _ in 0..50 {
            let code = generate_order_code();
            assert_eq!(code.len(), ORDER_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }
}
