//! Seed data script - populates the database with demo accounts and products
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates (skipping anything that already exists):
//! - `admin` / `admin123` (superuser)
//! - `veterinario1` / `vet123` with the veterinarian flag set
//! - `cliente1` / `cliente123`
//! - demo products across every catalog category

use anyhow::Context;
use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::info;

use vetclinic_api::{
    auth::Role,
    config,
    db,
    entities::product::{ProductCategory, ATTR_KIND, ATTR_MATERIAL, ATTR_SIZE},
    errors::ServiceError,
    services::{
        catalog::{CatalogService, ProductInput},
        users::{CreateUserInput, UpdateUserInput, UserService},
    },
};

#[derive(Parser, Debug)]
#[command(name = "seed-data", about = "Populate the database with demo data")]
struct Cli {
    /// Database URL; defaults to the configured `database_url`
    #[arg(long)]
    database_url: Option<String>,

    /// Skip creating the demo products
    #[arg(long)]
    users_only: bool,
}

struct DemoProduct {
    category: ProductCategory,
    code: &'static str,
    name: &'static str,
    brand: Option<&'static str>,
    price: Decimal,
    stock: i32,
    description: &'static str,
    attributes: &'static [(&'static str, &'static str)],
}

const fn item(
    category: ProductCategory,
    code: &'static str,
    name: &'static str,
    brand: Option<&'static str>,
    price: Decimal,
    stock: i32,
    description: &'static str,
) -> DemoProduct {
    DemoProduct {
        category,
        code,
        name,
        brand,
        price,
        stock,
        description,
        attributes: &[],
    }
}

fn demo_products() -> Vec<DemoProduct> {
    use ProductCategory::*;

    vec![
        item(DogFoodAdult, "PA001", "Royal Canin Adult", Some("Royal Canin"), dec!(25000), 50, "Premium food for adult dogs"),
        item(DogFoodAdult, "PA002", "Pro Plan Adult", Some("Purina"), dec!(22000), 40, "Balanced food for adult dogs"),
        item(DogFoodAdult, "PA003", "Eukanuba Adult", Some("Eukanuba"), dec!(23000), 35, "Complete nutrition for adults"),
        item(DogFoodPuppy, "PC001", "Royal Canin Puppy", Some("Royal Canin"), dec!(26000), 45, "Food for puppies"),
        item(DogFoodPuppy, "PC002", "Pro Plan Puppy", Some("Purina"), dec!(24000), 30, "Puppy nutrition"),
        item(DogFoodSenior, "PS001", "Royal Canin Senior", Some("Royal Canin"), dec!(25000), 25, "Food for senior dogs"),
        item(GeneralFood, "A001", "Mixed Kibble", Some("Champion"), dec!(15000), 30, "Everyday kibble"),
        item(General, "P001", "Travel Bowl", Some("PetSafe"), dec!(6000), 18, "Foldable water bowl"),
        item(CatFoodAdult, "AGA001", "Royal Canin Adult Cat", Some("Royal Canin"), dec!(20000), 40, "Food for adult cats"),
        item(CatFoodAdult, "AGA002", "Pro Plan Cat", Some("Purina"), dec!(18000), 35, "Complete nutrition for cats"),
        item(CatFoodKitten, "AGC001", "Royal Canin Kitten", Some("Royal Canin"), dec!(21000), 30, "Food for kittens"),
        item(DogSnack, "SNP001", "Dental Dog Snacks", Some("Pedigree"), dec!(5000), 60, "Snacks for dental cleaning"),
        item(DogSnack, "SNP002", "Training Treats", Some("Royal Canin"), dec!(4500), 50, "Treats for training"),
        item(CatSnack, "SNG001", "Premium Cat Snacks", Some("Whiskas"), dec!(4000), 55, "Tasty snacks for cats"),
        DemoProduct {
            attributes: &[(ATTR_KIND, "antiparasitic")],
            ..item(Antiparasitic, "ANT001", "Bravecto", None, dec!(35000), 20, "Long-acting antiparasitic")
        },
        DemoProduct {
            attributes: &[(ATTR_KIND, "antiparasitic")],
            ..item(Antiparasitic, "ANT002", "Nexgard", None, dec!(28000), 25, "Monthly antiparasitic")
        },
        DemoProduct {
            attributes: &[(ATTR_KIND, "antiparasitic")],
            ..item(Antiparasitic, "ANT003", "Frontline", None, dec!(15000), 30, "Topical antiparasitic")
        },
        DemoProduct {
            attributes: &[(ATTR_KIND, "vitamin")],
            ..item(Medication, "MED001", "Vitamin D3", None, dec!(12000), 40, "Vitamin supplement")
        },
        DemoProduct {
            attributes: &[(ATTR_KIND, "vitamin")],
            ..item(Medication, "MED002", "Calcium Plus", None, dec!(10000), 35, "Calcium supplement")
        },
        item(Shampoo, "SHM001", "Flea Shampoo", Some("Bayer"), dec!(8000), 25, "Shampoo for flea control"),
        item(Shampoo, "SHM002", "Hypoallergenic Shampoo", Some("Vet"), dec!(7500), 20, "Shampoo for sensitive skin"),
        DemoProduct {
            attributes: &[(ATTR_SIZE, "Large"), (ATTR_MATERIAL, "Foam")],
            ..item(Bed, "CAM001", "Large Orthopedic Bed", Some("PetBed"), dec!(35000), 10, "Orthopedic bed for large dogs")
        },
        DemoProduct {
            attributes: &[(ATTR_SIZE, "Medium"), (ATTR_MATERIAL, "Cotton")],
            ..item(Bed, "CAM002", "Soft Medium Bed", Some("Comfort"), dec!(20000), 15, "Soft bed for medium dogs")
        },
        DemoProduct {
            attributes: &[(ATTR_SIZE, "Medium"), (ATTR_MATERIAL, "Nylon")],
            ..item(Collar, "COL001", "Adjustable Collar", Some("PetSafe"), dec!(12000), 30, "Adjustable collar with ID tag")
        },
        DemoProduct {
            attributes: &[(ATTR_SIZE, "Adjustable"), (ATTR_MATERIAL, "Plastic")],
            ..item(Collar, "COL002", "Flea Collar", Some("Seresto"), dec!(25000), 20, "Collar with flea protection")
        },
        DemoProduct {
            attributes: &[(ATTR_KIND, "Ball")],
            ..item(Toy, "JUG001", "Interactive Ball", Some("Kong"), dec!(15000), 25, "Ball for play time")
        },
        DemoProduct {
            attributes: &[(ATTR_KIND, "Bone")],
            ..item(Toy, "JUG002", "Rubber Bone", Some("Nylabone"), dec!(10000), 30, "Chew bone")
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), false);
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    info!("=== Vet Clinic Seed Data ===");
    let pool = db::establish_connection_from_app_config(&cfg).await?;
    db::run_migrations(&pool).await?;
    let pool = std::sync::Arc::new(pool);

    let users = UserService::new(pool.clone());
    seed_users(&users).await?;

    if !cli.users_only {
        let catalog = CatalogService::new(pool);
        let created = seed_products(&catalog).await?;
        info!("  {} products created", created);
    }

    info!("=== Seed Data Complete ===");
    Ok(())
}

async fn seed_users(users: &UserService) -> anyhow::Result<()> {
    info!("Creating users...");

    match users.find_by_username("admin").await? {
        Some(_) => info!("  [-] admin already exists"),
        None => {
            let admin = users
                .create_user(demo_user("admin", "admin@veterinaria.com", "admin123", Role::Admin))
                .await?;
            users
                .update_user(
                    admin.id,
                    UpdateUserInput {
                        is_superuser: Some(true),
                        ..Default::default()
                    },
                )
                .await?;
            info!("  [OK] admin created");
        }
    }

    // The vet flag is re-asserted even when the account already exists.
    match users.find_by_username("veterinario1").await? {
        Some(vet) => {
            users.set_vet_flag(vet.id, true).await?;
            info!("  [OK] veterinario1 updated with veterinarian profile");
        }
        None => {
            users
                .create_user(demo_user("veterinario1", "vet1@veterinaria.com", "vet123", Role::Vet))
                .await?;
            info!("  [OK] veterinario1 created");
        }
    }

    match users.find_by_username("cliente1").await? {
        Some(_) => info!("  [-] cliente1 already exists"),
        None => {
            users
                .create_user(demo_user(
                    "cliente1",
                    "cliente1@veterinaria.com",
                    "cliente123",
                    Role::Client,
                ))
                .await?;
            info!("  [OK] cliente1 created");
        }
    }

    Ok(())
}

fn demo_user(username: &str, email: &str, password: &str, role: Role) -> CreateUserInput {
    CreateUserInput {
        username: username.to_string(),
        email: email.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        password: password.to_string(),
        role,
    }
}

async fn seed_products(catalog: &CatalogService) -> anyhow::Result<usize> {
    info!("Creating products...");
    let mut created = 0;

    for product in demo_products() {
        match catalog.get_by_code(product.category, product.code).await {
            Ok(_) => continue,
            Err(ServiceError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let attributes: BTreeMap<String, String> = product
            .attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        catalog
            .create(
                product.category,
                ProductInput {
                    code: product.code.to_string(),
                    name: product.name.to_string(),
                    brand: product.brand.map(str::to_string),
                    price: product.price,
                    stock: product.stock,
                    description: Some(product.description.to_string()),
                    attributes,
                },
            )
            .await
            .with_context(|| format!("failed to create product {}", product.code))?;
        created += 1;
    }

    Ok(created)
}
