//! Medication dispensing.
//!
//! An egress names a medication by free text. When it matches a catalogued
//! medication product the stock is decremented in the same transaction as
//! the egress row; an uncatalogued medication is recorded as-is.

use super::{icontains, non_blank};
use crate::{
    entities::{
        medication_egress::{self, Entity as MedicationEgress},
        product::{self, Entity as Product, ProductCategory},
    },
    errors::ServiceError,
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EgressInput {
    #[validate(length(min = 1, max = 200, message = "Medication is required."))]
    pub medication: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1."))]
    pub quantity: i32,
    pub consultation_id: Option<Uuid>,
    pub reason: Option<String>,
    #[validate(length(max = 200))]
    pub patient: Option<String>,
}

/// Decrements `product_id`'s stock by `quantity` in a single conditional
/// `UPDATE`, so the check and the write cannot be split by a concurrent
/// writer. Returns `false`, touching nothing, when fewer units remain.
pub async fn take_stock<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    quantity: i32,
) -> Result<bool, DbErr> {
    let result = Product::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Stock.gte(quantity))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

#[derive(Clone)]
pub struct MedicationEgressService {
    db: Arc<DatabaseConnection>,
}

impl MedicationEgressService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<medication_egress::Model>, ServiceError> {
        Ok(MedicationEgress::find()
            .order_by_desc(medication_egress::Column::DispensedAt)
            .all(&*self.db)
            .await?)
    }

    /// Records the egress, decrementing catalogued stock. Fails with
    /// [`ServiceError::InsufficientStock`] and writes nothing when the
    /// matched product holds fewer units than requested.
    #[instrument(skip(self, input), fields(medication = %input.medication, quantity = input.quantity))]
    pub async fn record(
        &self,
        vet_id: Uuid,
        input: EgressInput,
    ) -> Result<medication_egress::Model, ServiceError> {
        input.validate()?;
        let medication = input.medication.trim().to_string();

        let txn = self.db.begin().await?;

        let product = Product::find()
            .filter(product::Column::Category.eq(ProductCategory::Medication))
            .filter(icontains((product::Entity, product::Column::Name), &medication))
            .order_by_asc(product::Column::Name)
            .one(&txn)
            .await?;

        let product_id = match product {
            Some(product) => {
                if !take_stock(&txn, product.id, input.quantity).await? {
                    // Re-read: another writer may have moved the stock since the lookup.
                    let available = Product::find_by_id(product.id)
                        .one(&txn)
                        .await?
                        .map_or(0, |current| current.stock);
                    warn!(product_id = %product.id, available, "egress refused");
                    return Err(ServiceError::InsufficientStock { available });
                }
                info!(product_id = %product.id, quantity = input.quantity, "medication stock decremented");
                Some(product.id)
            }
            None => None,
        };

        let egress = medication_egress::ActiveModel {
            id: Set(Uuid::new_v4()),
            consultation_id: Set(input.consultation_id),
            product_id: Set(product_id),
            medication: Set(medication),
            quantity: Set(input.quantity),
            dispensed_at: Set(Utc::now()),
            vet_id: Set(Some(vet_id)),
            reason: Set(non_blank(input.reason)),
            patient: Set(non_blank(input.patient)),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        counter!("vetclinic.medication_egress", 1);
        info!(egress_id = %egress.id, catalogued = product_id.is_some(), "medication dispensed");
        Ok(egress)
    }
}
