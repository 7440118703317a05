pub mod admin;
pub mod appointments;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod common;
pub mod vet;

use crate::config::AppConfig;
use crate::services::{
    appointments::AppointmentService, cart::CartService, catalog::CatalogService,
    checkout::CheckoutService, clinical_records::ClinicalRecordService,
    consultations::ConsultationService, dashboard::DashboardService, inventory::InventoryService,
    medication_egress::MedicationEgressService, patients::PatientService,
    prescriptions::PrescriptionService, treatments::TreatmentService, users::UserService,
    vaccines::VaccineService,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub appointments: Arc<AppointmentService>,
    pub inventory: Arc<InventoryService>,
    pub dashboard: Arc<DashboardService>,
    pub patients: Arc<PatientService>,
    pub records: Arc<ClinicalRecordService>,
    pub consultations: Arc<ConsultationService>,
    pub prescriptions: Arc<PrescriptionService>,
    pub vaccines: Arc<VaccineService>,
    pub treatments: Arc<TreatmentService>,
    pub egress: Arc<MedicationEgressService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        let clinic = config.clinic.clone();
        let users = UserService::new(db.clone());
        let catalog = CatalogService::new(db.clone());

        Self {
            cart: Arc::new(CartService::new(catalog.clone())),
            checkout: Arc::new(CheckoutService::new(db.clone())),
            appointments: Arc::new(AppointmentService::new(db.clone(), clinic.clone())),
            inventory: Arc::new(InventoryService::new(db.clone(), clinic.clone())),
            dashboard: Arc::new(DashboardService::new(db.clone())),
            patients: Arc::new(PatientService::new(db.clone(), users.clone(), clinic)),
            records: Arc::new(ClinicalRecordService::new(db.clone())),
            consultations: Arc::new(ConsultationService::new(db.clone())),
            prescriptions: Arc::new(PrescriptionService::new(db.clone())),
            vaccines: Arc::new(VaccineService::new(db.clone())),
            treatments: Arc::new(TreatmentService::new(db.clone())),
            egress: Arc::new(MedicationEgressService::new(db)),
            users: Arc::new(users),
            catalog: Arc::new(catalog),
        }
    }
}
