use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Product subtype. The string value is the short type tag used in cart
/// line keys and catalog URLs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ProductCategory {
    #[sea_orm(string_value = "pa")]
    #[serde(rename = "pa")]
    #[strum(serialize = "pa")]
    DogFoodAdult,
    #[sea_orm(string_value = "pc")]
    #[serde(rename = "pc")]
    #[strum(serialize = "pc")]
    DogFoodPuppy,
    #[sea_orm(string_value = "ps")]
    #[serde(rename = "ps")]
    #[strum(serialize = "ps")]
    DogFoodSenior,
    #[sea_orm(string_value = "a")]
    #[serde(rename = "a")]
    #[strum(serialize = "a")]
    GeneralFood,
    #[sea_orm(string_value = "p")]
    #[serde(rename = "p")]
    #[strum(serialize = "p")]
    General,
    #[sea_orm(string_value = "ap")]
    #[serde(rename = "ap")]
    #[strum(serialize = "ap")]
    Antiparasitic,
    #[sea_orm(string_value = "aga")]
    #[serde(rename = "aga")]
    #[strum(serialize = "aga")]
    CatFoodAdult,
    #[sea_orm(string_value = "agc")]
    #[serde(rename = "agc")]
    #[strum(serialize = "agc")]
    CatFoodKitten,
    #[sea_orm(string_value = "snackp")]
    #[serde(rename = "snackp")]
    #[strum(serialize = "snackp")]
    DogSnack,
    #[sea_orm(string_value = "snackg")]
    #[serde(rename = "snackg")]
    #[strum(serialize = "snackg")]
    CatSnack,
    #[sea_orm(string_value = "med")]
    #[serde(rename = "med")]
    #[strum(serialize = "med")]
    Medication,
    #[sea_orm(string_value = "shampoo")]
    #[serde(rename = "shampoo")]
    #[strum(serialize = "shampoo")]
    Shampoo,
    #[sea_orm(string_value = "cama")]
    #[serde(rename = "cama")]
    #[strum(serialize = "cama")]
    Bed,
    #[sea_orm(string_value = "collar")]
    #[serde(rename = "collar")]
    #[strum(serialize = "collar")]
    Collar,
    #[sea_orm(string_value = "juguete")]
    #[serde(rename = "juguete")]
    #[strum(serialize = "juguete")]
    Toy,
}

/// Dashboard grouping of the product subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGroup {
    DogFood,
    CatFood,
    Snacks,
    Medications,
    Accessories,
    Other,
}

pub const ATTR_SIZE: &str = "size";
pub const ATTR_MATERIAL: &str = "material";
pub const ATTR_KIND: &str = "kind";

impl ProductCategory {
    /// Human readable label used in inventory reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DogFoodAdult => "Adult dog food",
            Self::DogFoodPuppy => "Puppy dog food",
            Self::DogFoodSenior => "Senior dog food",
            Self::GeneralFood => "General food",
            Self::General => "General product",
            Self::Antiparasitic => "Antiparasitic",
            Self::CatFoodAdult => "Adult cat food",
            Self::CatFoodKitten => "Kitten food",
            Self::DogSnack => "Dog snack",
            Self::CatSnack => "Cat snack",
            Self::Medication => "Medication",
            Self::Shampoo => "Shampoo",
            Self::Bed => "Bed",
            Self::Collar => "Collar",
            Self::Toy => "Toy",
        }
    }

    pub fn group(&self) -> CategoryGroup {
        match self {
            Self::DogFoodAdult | Self::DogFoodPuppy | Self::DogFoodSenior => CategoryGroup::DogFood,
            Self::CatFoodAdult | Self::CatFoodKitten => CategoryGroup::CatFood,
            Self::DogSnack | Self::CatSnack => CategoryGroup::Snacks,
            Self::Antiparasitic | Self::Medication => CategoryGroup::Medications,
            Self::Shampoo | Self::Bed | Self::Collar | Self::Toy => CategoryGroup::Accessories,
            Self::General | Self::GeneralFood => CategoryGroup::Other,
        }
    }

    /// Attribute keys a product of this category may carry.
    pub fn allowed_attributes(&self) -> &'static [&'static str] {
        match self {
            Self::Bed | Self::Collar => &[ATTR_SIZE, ATTR_MATERIAL],
            Self::Toy | Self::Antiparasitic | Self::Medication => &[ATTR_KIND],
            _ => &[],
        }
    }

    /// Parses a type tag as it appears in URLs and cart keys.
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.parse().ok()
    }

    pub fn tag(&self) -> String {
        self.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub category: ProductCategory,
    pub code: String,
    pub name: String,
    pub brand: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub stock: i32,
    pub description: Option<String>,
    /// Category-specific key/value pairs (size, material, kind).
    pub attributes: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    pub fn inventory_value(&self) -> Decimal {
        self.price * Decimal::from(self.stock)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;
    use test_case::test_case;

    #[test]
    fn every_category_round_trips_through_its_tag() {
        for category in ProductCategory::iter() {
            assert_eq!(ProductCategory::from_tag(&category.tag()), Some(category));
        }
        assert_eq!(ProductCategory::iter().count(), 15);
    }

    #[test_case("pa", CategoryGroup::DogFood)]
    #[test_case("agc", CategoryGroup::CatFood)]
    #[test_case("snackg", CategoryGroup::Snacks)]
    #[test_case("ap", CategoryGroup::Medications)]
    #[test_case("juguete", CategoryGroup::Accessories)]
    #[test_case("a", CategoryGroup::Other)]
    fn tags_map_to_dashboard_groups(tag: &str, group: CategoryGroup) {
        assert_eq!(ProductCategory::from_tag(tag).unwrap().group(), group);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(ProductCategory::from_tag("catnip"), None);
        assert_eq!(ProductCategory::from_tag(""), None);
    }

    #[test]
    fn only_accessories_and_medications_take_attributes() {
        assert_eq!(
            ProductCategory::Bed.allowed_attributes(),
            &[ATTR_SIZE, ATTR_MATERIAL]
        );
        assert_eq!(ProductCategory::Medication.allowed_attributes(), &[ATTR_KIND]);
        assert!(ProductCategory::DogSnack.allowed_attributes().is_empty());
    }
}
