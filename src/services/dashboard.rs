use super::local_day_bounds;
use crate::{
    entities::{
        appointment::{self, Entity as Appointment},
        consultation::{self, ConsultationStatus, Entity as Consultation},
        pet::{self, Entity as Pet},
        product::{self, CategoryGroup, Entity as Product},
    },
    errors::ServiceError,
};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

const RECENT_LIMIT: u64 = 5;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub total_products: usize,
    pub total_stock: i64,
    pub inventory_value: Decimal,
    #[schema(value_type = Object)]
    pub products_by_group: BTreeMap<CategoryGroup, usize>,
    #[schema(value_type = Vec<Object>)]
    pub recent_products: Vec<product::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VetDashboard {
    pub active_patients: u64,
    pub consultations_today: u64,
    pub pending_consultations: u64,
    pub appointments_today: u64,
    #[schema(value_type = Vec<Object>)]
    pub recent_consultations: Vec<consultation::Model>,
    #[schema(value_type = Vec<Object>)]
    pub upcoming_appointments: Vec<appointment::Model>,
}

/// KPI roll-ups for the two back-office landing pages.
#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn admin(&self) -> Result<AdminDashboard, ServiceError> {
        let products = Product::find().all(&*self.db).await?;

        let mut products_by_group = BTreeMap::new();
        for p in &products {
            *products_by_group.entry(p.category.group()).or_insert(0) += 1;
        }

        let recent_products = Product::find()
            .order_by_desc(product::Column::CreatedAt)
            .limit(RECENT_LIMIT)
            .all(&*self.db)
            .await?;

        Ok(AdminDashboard {
            total_products: products.len(),
            total_stock: products.iter().map(|p| i64::from(p.stock)).sum(),
            inventory_value: products.iter().map(|p| p.inventory_value()).sum(),
            products_by_group,
            recent_products,
        })
    }

    pub async fn vet(&self) -> Result<VetDashboard, ServiceError> {
        self.vet_on(Local::now().date_naive()).await
    }

    #[instrument(skip(self))]
    pub async fn vet_on(&self, today: NaiveDate) -> Result<VetDashboard, ServiceError> {
        let db = &*self.db;
        let (start, end) = local_day_bounds(today);

        let active_patients = Pet::find()
            .filter(pet::Column::Active.eq(true))
            .count(db)
            .await?;
        let consultations_today = Consultation::find()
            .filter(consultation::Column::ConsultedAt.gte(start))
            .filter(consultation::Column::ConsultedAt.lt(end))
            .count(db)
            .await?;
        let pending_consultations = Consultation::find()
            .filter(consultation::Column::Status.eq(ConsultationStatus::Pending))
            .count(db)
            .await?;
        let appointments_today = Appointment::find()
            .filter(appointment::Column::Date.eq(today))
            .count(db)
            .await?;

        let recent_consultations = Consultation::find()
            .order_by_desc(consultation::Column::ConsultedAt)
            .limit(RECENT_LIMIT)
            .all(db)
            .await?;
        let upcoming_appointments = Appointment::find()
            .filter(appointment::Column::Date.gte(today))
            .order_by_asc(appointment::Column::Date)
            .order_by_asc(appointment::Column::Time)
            .limit(RECENT_LIMIT)
            .all(db)
            .await?;

        Ok(VetDashboard {
            active_patients,
            consultations_today,
            pending_consultations,
            appointments_today,
            recent_consultations,
            upcoming_appointments,
        })
    }
}
