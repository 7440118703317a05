pub mod appointment;
pub mod clinical_record;
pub mod consultation;
pub mod medication_egress;
pub mod order;
pub mod order_line;
pub mod pet;
pub mod prescription;
pub mod prescription_item;
pub mod product;
pub mod treatment;
pub mod user;
pub mod vaccine;
pub mod vet_profile;
