//! Stock level reports over the product catalog.
//!
//! Levels are derived from the configured thresholds: below
//! `critical_stock_below` is critical, below `low_stock_below` is low,
//! anything else is normal.

use crate::{
    config::ClinicConfig,
    entities::product::{self, Entity as Product, ProductCategory},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    Critical,
    Low,
    Normal,
}

impl StockLevel {
    pub fn classify(stock: i32, clinic: &ClinicConfig) -> Self {
        if stock < clinic.critical_stock_below {
            StockLevel::Critical
        } else if stock < clinic.low_stock_below {
            StockLevel::Low
        } else {
            StockLevel::Normal
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryItem {
    pub id: Uuid,
    pub category: ProductCategory,
    pub code: String,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub level: StockLevel,
}

impl InventoryItem {
    fn new(product: &product::Model, clinic: &ClinicConfig) -> Self {
        Self {
            id: product.id,
            category: product.category,
            code: product.code.clone(),
            name: product.name.clone(),
            price: product.price,
            stock: product.stock,
            level: StockLevel::classify(product.stock, clinic),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryGroup {
    pub label: String,
    pub items: Vec<InventoryItem>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct InventoryTotals {
    pub products: usize,
    pub stock: i64,
    pub critical: usize,
    pub low: usize,
    pub normal: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryOverview {
    pub groups: Vec<InventoryGroup>,
    pub totals: InventoryTotals,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockAlerts {
    pub items: Vec<InventoryItem>,
    pub critical: usize,
    pub low: usize,
}

/// Groups products by category label, names sorted case-insensitively
/// inside each group.
pub fn build_overview(products: &[product::Model], clinic: &ClinicConfig) -> InventoryOverview {
    let mut groups: BTreeMap<&'static str, Vec<InventoryItem>> = BTreeMap::new();
    let mut totals = InventoryTotals::default();

    for product in products {
        let item = InventoryItem::new(product, clinic);
        totals.products += 1;
        totals.stock += i64::from(item.stock);
        match item.level {
            StockLevel::Critical => totals.critical += 1,
            StockLevel::Low => totals.low += 1,
            StockLevel::Normal => totals.normal += 1,
        }
        groups.entry(product.category.label()).or_default().push(item);
    }

    let groups = groups
        .into_iter()
        .map(|(label, mut items)| {
            items.sort_by_key(|item| item.name.to_lowercase());
            InventoryGroup {
                label: label.to_string(),
                items,
            }
        })
        .collect();

    InventoryOverview { groups, totals }
}

/// Products below the low-stock threshold, emptiest first.
pub fn build_alerts(products: &[product::Model], clinic: &ClinicConfig) -> StockAlerts {
    let mut items: Vec<InventoryItem> = products
        .iter()
        .filter(|p| p.stock < clinic.low_stock_below)
        .map(|p| InventoryItem::new(p, clinic))
        .collect();
    items.sort_by_key(|item| (item.stock, item.name.to_lowercase()));

    let critical = items
        .iter()
        .filter(|i| i.level == StockLevel::Critical)
        .count();
    let low = items.len() - critical;

    StockAlerts {
        items,
        critical,
        low,
    }
}

#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    clinic: ClinicConfig,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, clinic: ClinicConfig) -> Self {
        Self { db, clinic }
    }

    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<InventoryOverview, ServiceError> {
        let products = Product::find().all(&*self.db).await?;
        Ok(build_overview(&products, &self.clinic))
    }

    #[instrument(skip(self))]
    pub async fn alerts(&self) -> Result<StockAlerts, ServiceError> {
        let products = Product::find().all(&*self.db).await?;
        Ok(build_alerts(&products, &self.clinic))
    }
}
