use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_accounts_tables::Migration),
            Box::new(m20250101_000002_create_products_table::Migration),
            Box::new(m20250101_000003_create_appointments_table::Migration),
            Box::new(m20250101_000004_create_clinic_tables::Migration),
            Box::new(m20250101_000005_create_orders_tables::Migration),
        ]
    }
}

mod m20250101_000001_create_accounts_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_accounts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string_len(150)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Email).string_len(254).not_null())
                        .col(
                            ColumnDef::new(Users::FirstName)
                                .string_len(150)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Users::LastName)
                                .string_len(150)
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Users::IsSuperuser)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::IsStaff)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(VetProfiles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(VetProfiles::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VetProfiles::UserId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(VetProfiles::IsVet)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(VetProfiles::LicenseNumber).string_len(50).null())
                        .col(ColumnDef::new(VetProfiles::Phone).string_len(20).null())
                        .col(ColumnDef::new(VetProfiles::Address).text().null())
                        .col(ColumnDef::new(VetProfiles::Specialties).text().null())
                        .col(ColumnDef::new(VetProfiles::Schedule).json().not_null())
                        .col(
                            ColumnDef::new(VetProfiles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VetProfiles::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_vet_profiles_user")
                                .from(VetProfiles::Table, VetProfiles::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(VetProfiles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Users {
        Table,
        Id,
        Username,
        Email,
        FirstName,
        LastName,
        PasswordHash,
        IsSuperuser,
        IsStaff,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum VetProfiles {
        Table,
        Id,
        UserId,
        IsVet,
        LicenseNumber,
        Phone,
        Address,
        Specialties,
        Schedule,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Category).string_len(16).not_null())
                        .col(ColumnDef::new(Products::Code).string_len(50).not_null())
                        .col(ColumnDef::new(Products::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Products::Brand).string_len(100).null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::Stock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Attributes).json().not_null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Codes are unique within a category, not across the catalog.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_code")
                        .table(Products::Table)
                        .col(Products::Category)
                        .col(Products::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_name")
                        .table(Products::Table)
                        .col(Products::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Category,
        Code,
        Name,
        Brand,
        Price,
        Stock,
        Description,
        Attributes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_appointments_table {
    use super::m20250101_000001_create_accounts_tables::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_appointments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Appointments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Appointments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Appointments::OwnerId).uuid().not_null())
                        .col(ColumnDef::new(Appointments::PetName).string_len(100).not_null())
                        .col(
                            ColumnDef::new(Appointments::PetType)
                                .string_len(10)
                                .not_null()
                                .default("other"),
                        )
                        .col(ColumnDef::new(Appointments::HolderName).string_len(100).null())
                        .col(ColumnDef::new(Appointments::Date).date().not_null())
                        .col(ColumnDef::new(Appointments::Time).time().not_null())
                        .col(ColumnDef::new(Appointments::Reason).text().null())
                        .col(
                            ColumnDef::new(Appointments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_appointments_owner")
                                .from(Appointments::Table, Appointments::OwnerId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One booking per slot across the whole clinic; closes the
            // check-then-insert race left open by the service-level check.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_appointments_slot")
                        .table(Appointments::Table)
                        .col(Appointments::Date)
                        .col(Appointments::Time)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_appointments_owner")
                        .table(Appointments::Table)
                        .col(Appointments::OwnerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Appointments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Appointments {
        Table,
        Id,
        OwnerId,
        PetName,
        PetType,
        HolderName,
        Date,
        Time,
        Reason,
        CreatedAt,
    }
}

mod m20250101_000004_create_clinic_tables {
    use super::m20250101_000001_create_accounts_tables::Users;
    use super::m20250101_000003_create_appointments_table::Appointments;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_clinic_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Pets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Pets::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Pets::OwnerId).uuid().not_null())
                        .col(ColumnDef::new(Pets::Name).string_len(100).not_null())
                        .col(ColumnDef::new(Pets::Species).string_len(10).not_null())
                        .col(ColumnDef::new(Pets::Breed).string_len(100).null())
                        .col(ColumnDef::new(Pets::Sex).string_len(10).null())
                        .col(ColumnDef::new(Pets::AgeYears).integer().null())
                        .col(ColumnDef::new(Pets::Color).string_len(50).null())
                        .col(ColumnDef::new(Pets::WeightKg).decimal_len(6, 2).null())
                        .col(ColumnDef::new(Pets::Notes).text().null())
                        .col(
                            ColumnDef::new(Pets::RegisteredAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Pets::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pets_owner")
                                .from(Pets::Table, Pets::OwnerId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ClinicalRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ClinicalRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClinicalRecords::PetId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ClinicalRecords::VetId).uuid().null())
                        .col(ColumnDef::new(ClinicalRecords::History).text().null())
                        .col(ColumnDef::new(ClinicalRecords::Allergies).text().null())
                        .col(
                            ColumnDef::new(ClinicalRecords::PermanentMedications)
                                .text()
                                .null(),
                        )
                        .col(ColumnDef::new(ClinicalRecords::Notes).text().null())
                        .col(
                            ColumnDef::new(ClinicalRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClinicalRecords::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_clinical_records_pet")
                                .from(ClinicalRecords::Table, ClinicalRecords::PetId)
                                .to(Pets::Table, Pets::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_clinical_records_vet")
                                .from(ClinicalRecords::Table, ClinicalRecords::VetId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Consultations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Consultations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Consultations::AppointmentId).uuid().null())
                        .col(ColumnDef::new(Consultations::PetId).uuid().not_null())
                        .col(ColumnDef::new(Consultations::VetId).uuid().null())
                        .col(
                            ColumnDef::new(Consultations::ConsultedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Consultations::Reason).string_len(200).not_null())
                        .col(ColumnDef::new(Consultations::Symptoms).text().null())
                        .col(ColumnDef::new(Consultations::Diagnosis).text().null())
                        .col(ColumnDef::new(Consultations::Treatment).text().null())
                        .col(ColumnDef::new(Consultations::Notes).text().null())
                        .col(
                            ColumnDef::new(Consultations::Status)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Consultations::Cost)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Consultations::Paid)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_consultations_pet")
                                .from(Consultations::Table, Consultations::PetId)
                                .to(Pets::Table, Pets::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_consultations_appointment")
                                .from(Consultations::Table, Consultations::AppointmentId)
                                .to(Appointments::Table, Appointments::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_consultations_vet")
                                .from(Consultations::Table, Consultations::VetId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_consultations_pet")
                        .table(Consultations::Table)
                        .col(Consultations::PetId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Prescriptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Prescriptions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Prescriptions::ConsultationId).uuid().not_null())
                        .col(ColumnDef::new(Prescriptions::VetId).uuid().null())
                        .col(ColumnDef::new(Prescriptions::Instructions).text().null())
                        .col(ColumnDef::new(Prescriptions::ValidUntil).date().null())
                        .col(
                            ColumnDef::new(Prescriptions::IssuedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_prescriptions_consultation")
                                .from(Prescriptions::Table, Prescriptions::ConsultationId)
                                .to(Consultations::Table, Consultations::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PrescriptionItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PrescriptionItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PrescriptionItems::PrescriptionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PrescriptionItems::Medication)
                                .string_len(200)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PrescriptionItems::Dose).string_len(100).not_null())
                        .col(
                            ColumnDef::new(PrescriptionItems::Frequency)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PrescriptionItems::Duration)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PrescriptionItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(PrescriptionItems::Notes).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_prescription_items_prescription")
                                .from(PrescriptionItems::Table, PrescriptionItems::PrescriptionId)
                                .to(Prescriptions::Table, Prescriptions::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Vaccines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Vaccines::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Vaccines::PetId).uuid().not_null())
                        .col(ColumnDef::new(Vaccines::VetId).uuid().null())
                        .col(ColumnDef::new(Vaccines::Name).string_len(100).not_null())
                        .col(ColumnDef::new(Vaccines::AppliedOn).date().not_null())
                        .col(ColumnDef::new(Vaccines::NextDue).date().null())
                        .col(ColumnDef::new(Vaccines::Lot).string_len(50).null())
                        .col(ColumnDef::new(Vaccines::Notes).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_vaccines_pet")
                                .from(Vaccines::Table, Vaccines::PetId)
                                .to(Pets::Table, Pets::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Treatments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Treatments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Treatments::PetId).uuid().not_null())
                        .col(ColumnDef::new(Treatments::ConsultationId).uuid().null())
                        .col(ColumnDef::new(Treatments::VetId).uuid().null())
                        .col(ColumnDef::new(Treatments::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Treatments::Description).text().null())
                        .col(ColumnDef::new(Treatments::StartedOn).date().not_null())
                        .col(ColumnDef::new(Treatments::EndedOn).date().null())
                        .col(
                            ColumnDef::new(Treatments::Status)
                                .string_len(20)
                                .not_null()
                                .default("active"),
                        )
                        .col(ColumnDef::new(Treatments::Notes).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_treatments_pet")
                                .from(Treatments::Table, Treatments::PetId)
                                .to(Pets::Table, Pets::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_treatments_consultation")
                                .from(Treatments::Table, Treatments::ConsultationId)
                                .to(Consultations::Table, Consultations::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MedicationEgress::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MedicationEgress::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MedicationEgress::ConsultationId).uuid().null())
                        .col(ColumnDef::new(MedicationEgress::ProductId).uuid().null())
                        .col(
                            ColumnDef::new(MedicationEgress::Medication)
                                .string_len(200)
                                .not_null(),
                        )
                        .col(ColumnDef::new(MedicationEgress::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(MedicationEgress::DispensedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MedicationEgress::VetId).uuid().null())
                        .col(ColumnDef::new(MedicationEgress::Reason).text().null())
                        .col(ColumnDef::new(MedicationEgress::Patient).string_len(100).null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_medication_egress_consultation")
                                .from(MedicationEgress::Table, MedicationEgress::ConsultationId)
                                .to(Consultations::Table, Consultations::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MedicationEgress::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Treatments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Vaccines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PrescriptionItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Prescriptions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Consultations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ClinicalRecords::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Pets::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Pets {
        Table,
        Id,
        OwnerId,
        Name,
        Species,
        Breed,
        Sex,
        AgeYears,
        Color,
        WeightKg,
        Notes,
        RegisteredAt,
        Active,
    }

    #[derive(DeriveIden)]
    enum ClinicalRecords {
        Table,
        Id,
        PetId,
        VetId,
        History,
        Allergies,
        PermanentMedications,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Consultations {
        Table,
        Id,
        AppointmentId,
        PetId,
        VetId,
        ConsultedAt,
        Reason,
        Symptoms,
        Diagnosis,
        Treatment,
        Notes,
        Status,
        Cost,
        Paid,
    }

    #[derive(DeriveIden)]
    enum Prescriptions {
        Table,
        Id,
        ConsultationId,
        VetId,
        Instructions,
        ValidUntil,
        IssuedAt,
    }

    #[derive(DeriveIden)]
    enum PrescriptionItems {
        Table,
        Id,
        PrescriptionId,
        Medication,
        Dose,
        Frequency,
        Duration,
        Quantity,
        Notes,
    }

    #[derive(DeriveIden)]
    enum Vaccines {
        Table,
        Id,
        PetId,
        VetId,
        Name,
        AppliedOn,
        NextDue,
        Lot,
        Notes,
    }

    #[derive(DeriveIden)]
    enum Treatments {
        Table,
        Id,
        PetId,
        ConsultationId,
        VetId,
        Name,
        Description,
        StartedOn,
        EndedOn,
        Status,
        Notes,
    }

    #[derive(DeriveIden)]
    enum MedicationEgress {
        Table,
        Id,
        ConsultationId,
        ProductId,
        Medication,
        Quantity,
        DispensedAt,
        VetId,
        Reason,
        Patient,
    }
}

mod m20250101_000005_create_orders_tables {
    use super::m20250101_000001_create_accounts_tables::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::Code)
                                .string_len(10)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::FullName).string_len(200).not_null())
                        .col(ColumnDef::new(Orders::Email).string_len(254).not_null())
                        .col(ColumnDef::new(Orders::Phone).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::Address).string_len(300).not_null())
                        .col(ColumnDef::new(Orders::City).string_len(100).not_null())
                        .col(ColumnDef::new(Orders::PostalCode).string_len(10).not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::CardLast4).string_len(4).null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::Total).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_user")
                                .from(Orders::Table, Orders::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderLines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderLines::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(OrderLines::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderLines::LineKey).string_len(64).not_null())
                        .col(ColumnDef::new(OrderLines::Category).string_len(16).not_null())
                        .col(ColumnDef::new(OrderLines::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderLines::Name).string_len(200).not_null())
                        .col(
                            ColumnDef::new(OrderLines::UnitPrice)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderLines::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderLines::Subtotal)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_lines_order")
                                .from(OrderLines::Table, OrderLines::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        Code,
        UserId,
        FullName,
        Email,
        Phone,
        Address,
        City,
        PostalCode,
        PaymentMethod,
        CardLast4,
        Notes,
        Total,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderLines {
        Table,
        Id,
        OrderId,
        LineKey,
        Category,
        ProductId,
        Name,
        UnitPrice,
        Quantity,
        Subtotal,
    }
}
