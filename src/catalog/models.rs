use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::validation::non_negative_amount;

/// Menu category, e.g. "Paket Buka Puasa"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Menu {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A choice axis on a menu, e.g. "Pilihan Ayam"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MenuVariant {
    pub id: i64,
    pub menu_id: i64,
    pub name: String,
    pub is_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct VariantOption {
    pub id: i64,
    pub menu_variant_id: i64,
    pub name: String,
    /// Signed delta added to the menu price when chosen
    pub price_adjustment: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VariantDetail {
    pub id: i64,
    pub name: String,
    pub is_required: bool,
    pub options: Vec<VariantOption>,
}

/// Menu with its variants and options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MenuDetail {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub variants: Vec<VariantDetail>,
}

impl MenuDetail {
    /// Group flat variant and option rows under their menus, keeping input order
    pub fn assemble(
        menus: Vec<Menu>,
        variants: Vec<MenuVariant>,
        options: Vec<VariantOption>,
    ) -> Vec<MenuDetail> {
        let mut options_by_variant: HashMap<i64, Vec<VariantOption>> = HashMap::new();
        for option in options {
            options_by_variant
                .entry(option.menu_variant_id)
                .or_default()
                .push(option);
        }

        let mut variants_by_menu: HashMap<i64, Vec<VariantDetail>> = HashMap::new();
        for variant in variants {
            variants_by_menu
                .entry(variant.menu_id)
                .or_default()
                .push(VariantDetail {
                    id: variant.id,
                    name: variant.name,
                    is_required: variant.is_required,
                    options: options_by_variant.remove(&variant.id).unwrap_or_default(),
                });
        }

        menus
            .into_iter()
            .map(|menu| MenuDetail {
                variants: variants_by_menu.remove(&menu.id).unwrap_or_default(),
                id: menu.id,
                category_id: menu.category_id,
                name: menu.name,
                price: menu.price,
                description: menu.description,
                image: menu.image,
                is_active: menu.is_active,
            })
            .collect()
    }
}

/// Public catalog entry: an active category with its active menus
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryWithMenus {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub menus: Vec<MenuDetail>,
}

/// Request DTO for creating a category
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Request DTO for updating a category; omitted fields keep their value
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OptionPayload {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub price_adjustment: Decimal,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct VariantPayload {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default = "default_required")]
    pub is_required: bool,
    #[validate(length(min = 1, message = "A variant needs at least one option"))]
    #[validate]
    pub options: Vec<OptionPayload>,
}

/// Request DTO for creating or replacing a menu with its variants
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MenuPayload {
    pub category_id: i64,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub image: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default)]
    #[validate]
    pub variants: Vec<VariantPayload>,
}

impl MenuPayload {
    /// Derive validation plus the money check on `price`
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        non_negative_amount("price", self.price)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CatalogCounts {
    pub menus: i64,
    pub categories: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn menu(id: i64) -> Menu {
        Menu {
            id,
            category_id: 1,
            name: format!("Menu {}", id),
            price: dec!(45000),
            description: None,
            image: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_assemble_groups_rows() {
        let menus = vec![menu(1), menu(2)];
        let variants = vec![
            MenuVariant { id: 10, menu_id: 1, name: "Pilihan Ayam".into(), is_required: true },
            MenuVariant { id: 11, menu_id: 1, name: "Level Pedas".into(), is_required: false },
        ];
        let options = vec![
            VariantOption { id: 100, menu_variant_id: 10, name: "Paha".into(), price_adjustment: dec!(0) },
            VariantOption { id: 101, menu_variant_id: 10, name: "Dada".into(), price_adjustment: dec!(5000) },
            VariantOption { id: 102, menu_variant_id: 11, name: "Pedas".into(), price_adjustment: dec!(0) },
        ];

        let details = MenuDetail::assemble(menus, variants, options);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].variants.len(), 2);
        assert_eq!(details[0].variants[0].options.len(), 2);
        assert_eq!(details[0].variants[1].options[0].name, "Pedas");
        assert!(details[1].variants.is_empty());
    }

    #[test]
    fn test_menu_payload_rejects_negative_price() {
        let payload = MenuPayload {
            category_id: 1,
            name: "Es Teh".into(),
            price: dec!(-1),
            description: None,
            image: None,
            is_active: None,
            variants: vec![],
        };
        let errors = payload.validate_all().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
    }

    #[test]
    fn test_variant_requires_options() {
        let payload: MenuPayload = serde_json::from_value(serde_json::json!({
            "category_id": 1,
            "name": "Paket Hemat A",
            "price": "45000",
            "variants": [{ "name": "Pilihan Ayam", "options": [] }]
        }))
        .unwrap();
        assert!(payload.variants[0].is_required);
        assert!(payload.validate_all().is_err());

        let payload: MenuPayload = serde_json::from_value(serde_json::json!({
            "category_id": 1,
            "name": "Paket Hemat A",
            "price": "45000",
            "variants": [{
                "name": "Pilihan Ayam",
                "options": [{ "name": "Dada", "price_adjustment": "5000" }, { "name": "Paha" }]
            }]
        }))
        .unwrap();
        assert!(payload.validate_all().is_ok());
    }
}
