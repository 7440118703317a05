use super::catalog::CatalogService;
use crate::{
    errors::ServiceError,
    models::{CartLine, CartView},
    session::Session,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddToCartInput {
    pub type_tag: String,
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemInput {
    #[validate(range(min = 1, message = "Quantity must be at least 1."))]
    pub quantity: i32,
}

/// Session cart operations. Prices are snapshotted from the catalog when a
/// line is first added.
#[derive(Clone)]
pub struct CartService {
    catalog: CatalogService,
}

impl CartService {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }

    pub fn view(&self, session: &Session) -> CartView {
        session.cart().view()
    }

    #[instrument(skip(self, session), fields(type_tag = %input.type_tag, product_id = %input.product_id))]
    pub async fn add(
        &self,
        session: &Session,
        input: AddToCartInput,
    ) -> Result<CartLine, ServiceError> {
        let product = self
            .catalog
            .find_for_cart(&input.type_tag, input.product_id)
            .await?;
        let line = session.update_cart(|cart| cart.add(&product, input.quantity).clone());
        info!(key = %line.key, quantity = line.quantity, "cart line added");
        Ok(line)
    }

    #[instrument(skip(self, session))]
    pub fn update(
        &self,
        session: &Session,
        key: &str,
        quantity: i32,
    ) -> Result<CartLine, ServiceError> {
        session.update_cart(|cart| cart.update(key, quantity).map(CartLine::clone))
    }

    #[instrument(skip(self, session))]
    pub fn remove(&self, session: &Session, key: &str) -> Result<CartLine, ServiceError> {
        let removed = session.update_cart(|cart| cart.remove(key))?;
        info!(key, "cart line removed");
        Ok(removed)
    }

    pub fn clear(&self, session: &Session) {
        session.update_cart(|cart| cart.clear());
    }
}
