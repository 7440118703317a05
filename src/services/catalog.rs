use super::icontains;
use crate::{
    entities::product::{self, Entity as Product, ProductCategory},
    errors::{is_unique_violation, FormErrors, ServiceError},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

const CODE_TAKEN: &str = "A product with this code already exists in this category.";
const PAGE_OUT_OF_RANGE: &str = "Page number is out of range.";

/// Row offset of a 1-based page, or `None` when it cannot be expressed as a
/// signed 64-bit SQL offset.
fn page_offset(page: u64, per_page: u64) -> Option<u64> {
    (page - 1)
        .checked_mul(per_page)
        .filter(|offset| i64::try_from(*offset).is_ok())
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("This field cannot be blank.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_positive() && !price.is_zero() && price.scale() <= 2 {
        Ok(())
    } else {
        let mut err = ValidationError::new("price");
        err.message = Some("Price must be positive with at most two decimals.".into());
        Err(err)
    }
}

/// Body of create and replace requests for a catalog entry.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProductInput {
    #[validate(
        length(min = 1, max = 50, message = "Code must be 1-50 characters."),
        custom = "validate_not_blank"
    )]
    pub code: String,
    #[validate(
        length(min = 1, max = 200, message = "Name must be 1-200 characters."),
        custom = "validate_not_blank"
    )]
    pub name: String,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Stock cannot be negative."))]
    pub stock: i32,
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductSearch {
    pub search: Option<String>,
    pub category: Option<ProductCategory>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// One page of products plus the total match count.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductPage {
    #[schema(value_type = Vec<Object>)]
    pub products: Vec<product::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Fields only some categories carry; anything else is rejected.
fn check_attributes(
    category: ProductCategory,
    attributes: &BTreeMap<String, String>,
) -> Result<(), FormErrors> {
    let allowed = category.allowed_attributes();
    let mut errors = FormErrors::new();
    for key in attributes.keys() {
        if !allowed.contains(&key.as_str()) {
            errors.add_field(
                "attributes",
                format!("'{}' is not an attribute of {} products.", key, category.label()),
            );
        }
    }
    errors.into_result()
}

fn attributes_json(attributes: BTreeMap<String, String>) -> serde_json::Value {
    serde_json::Value::Object(
        attributes
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect(),
    )
}

/// Catalog reads and writes over the single `products` table.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn parse_tag(tag: &str) -> Result<ProductCategory, ServiceError> {
        ProductCategory::from_tag(tag)
            .ok_or_else(|| ServiceError::NotFound(format!("Unknown product type '{}'", tag)))
    }

    #[instrument(skip(self))]
    pub async fn list_by_category(
        &self,
        category: ProductCategory,
    ) -> Result<Vec<product::Model>, ServiceError> {
        Ok(Product::find()
            .filter(product::Column::Category.eq(category))
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_by_code(
        &self,
        category: ProductCategory,
        code: &str,
    ) -> Result<product::Model, ServiceError> {
        Product::find()
            .filter(product::Column::Category.eq(category))
            .filter(product::Column::Code.eq(code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", format!("{}/{}", category, code)))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    /// Looks a product up by type tag and id, as the cart addresses it.
    pub async fn find_for_cart(
        &self,
        tag: &str,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        let category = Self::parse_tag(tag)?;
        Product::find_by_id(product_id)
            .filter(product::Column::Category.eq(category))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", format!("{}_{}", tag, product_id)))
    }

    #[instrument(skip(self))]
    pub async fn search(&self, params: ProductSearch, per_page: u64) -> Result<ProductPage, ServiceError> {
        let mut query = Product::find();

        if let Some(category) = params.category {
            query = query.filter(product::Column::Category.eq(category));
        }
        if let Some(term) = params.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(product::Column::Name, term))
                    .add(icontains(product::Column::Code, term))
                    .add(icontains(product::Column::Brand, term)),
            );
        }

        let page = params.page.unwrap_or(1).max(1);
        if page_offset(page, per_page).is_none() {
            return Err(FormErrors::field("page", PAGE_OUT_OF_RANGE).into());
        }
        let paginator = query
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page - 1).await?;

        Ok(ProductPage {
            products,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(
        &self,
        category: ProductCategory,
        input: ProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        check_attributes(category, &input.attributes)?;
        self.ensure_code_free(category, &input.code, None).await?;

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            category: Set(category),
            code: Set(input.code.trim().to_string()),
            name: Set(input.name.trim().to_string()),
            brand: Set(super::non_blank(input.brand)),
            price: Set(input.price),
            stock: Set(input.stock),
            description: Set(super::non_blank(input.description)),
            attributes: Set(attributes_json(input.attributes)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let product = model.insert(&*self.db).await.map_err(code_conflict)?;
        info!(product_id = %product.id, category = %category, "product created");
        Ok(product)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        category: ProductCategory,
        code: &str,
        input: ProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        check_attributes(category, &input.attributes)?;
        let existing = self.get_by_code(category, code).await?;
        self.ensure_code_free(category, &input.code, Some(existing.id))
            .await?;

        let mut active = existing.into_active_model();
        active.code = Set(input.code.trim().to_string());
        active.name = Set(input.name.trim().to_string());
        active.brand = Set(super::non_blank(input.brand));
        active.price = Set(input.price);
        active.stock = Set(input.stock);
        active.description = Set(super::non_blank(input.description));
        active.attributes = Set(attributes_json(input.attributes));
        active.updated_at = Set(Utc::now());

        let product = active.update(&*self.db).await.map_err(code_conflict)?;
        info!(product_id = %product.id, "product updated");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, category: ProductCategory, code: &str) -> Result<(), ServiceError> {
        let product = self.get_by_code(category, code).await?;
        Product::delete_by_id(product.id).exec(&*self.db).await?;
        info!(product_id = %product.id, "product deleted");
        Ok(())
    }

    pub async fn all(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(Product::find().all(&*self.db).await?)
    }

    async fn ensure_code_free(
        &self,
        category: ProductCategory,
        code: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Product::find()
            .filter(product::Column::Category.eq(category))
            .filter(product::Column::Code.eq(code.trim()));
        if let Some(id) = except {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(FormErrors::field("code", CODE_TAKEN).into());
        }
        Ok(())
    }
}

fn code_conflict(err: sea_orm::DbErr) -> ServiceError {
    if is_unique_violation(&err) {
        FormErrors::field("code", CODE_TAKEN).into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case(dec!(12.50), true ; "regular price")]
    #[test_case(dec!(0.01), true ; "smallest price")]
    #[test_case(dec!(0), false ; "zero")]
    #[test_case(dec!(-3.00), false ; "negative")]
    #[test_case(dec!(1.005), false ; "three decimals")]
    fn price_rules(price: Decimal, ok: bool) {
        assert_eq!(validate_price(&price).is_ok(), ok);
    }

    #[test]
    fn attributes_are_checked_per_category() {
        let mut attrs = BTreeMap::new();
        attrs.insert("size".to_string(), "L".to_string());
        attrs.insert("material".to_string(), "cotton".to_string());
        assert!(check_attributes(ProductCategory::Bed, &attrs).is_ok());

        let errors = check_attributes(ProductCategory::Toy, &attrs).unwrap_err();
        assert!(errors.has_field("attributes"));

        assert!(check_attributes(ProductCategory::DogFoodAdult, &BTreeMap::new()).is_ok());
    }

    #[test_case(1, 20, Some(0) ; "first page")]
    #[test_case(3, 20, Some(40) ; "third page")]
    #[test_case(u64::MAX, 20, None ; "overflowing page")]
    #[test_case(u64::MAX / 20, 20, None ; "beyond signed offset")]
    fn page_offsets(page: u64, per_page: u64, expected: Option<u64>) {
        assert_eq!(page_offset(page, per_page), expected);
    }

    #[test]
    fn blank_codes_and_names_are_rejected() {
        let input = ProductInput {
            code: "   ".into(),
            name: "\t".into(),
            brand: None,
            price: dec!(10),
            stock: 1,
            description: None,
            attributes: BTreeMap::new(),
        };
        let errors = FormErrors::from(input.validate().unwrap_err());
        assert!(errors.has_field("code"));
        assert!(errors.has_field("name"));
    }

    #[test]
    fn unknown_tags_are_not_found() {
        assert!(matches!(
            CatalogService::parse_tag("hamsterwheel"),
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(CatalogService::parse_tag("med").unwrap(), ProductCategory::Medication);
    }
}
