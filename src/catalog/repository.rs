use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::catalog::{
    CatalogCounts, Category, CategoryWithMenus, CreateCategory, Menu, MenuDetail, MenuPayload,
    MenuVariant, UpdateCategory, VariantOption, VariantPayload,
};
use crate::db::{is_foreign_key_violation, is_unique_violation};
use crate::error::ApiError;

/// Catalog reads needed by the booking flow
#[async_trait]
pub trait MenuCatalog: Send + Sync {
    /// Menu with variants and options, active or not
    async fn find_menu(&self, id: i64) -> Result<Option<MenuDetail>, sqlx::Error>;

    async fn catalog_counts(&self) -> Result<CatalogCounts, sqlx::Error>;
}

/// Repository for categories, menus, variants and options
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

const CATEGORY_COLUMNS: &str = "id, name, description, sort_order, is_active, created_at, updated_at";
const MENU_COLUMNS: &str =
    "id, category_id, name, price, description, image, is_active, created_at, updated_at";

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---------------------------------------------------------------- categories

    /// Categories ordered for display, optionally filtered by name
    pub async fn list_categories(&self, search: Option<&str>) -> Result<Vec<Category>, ApiError> {
        let categories = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                sqlx::query_as::<_, Category>(&format!(
                    "SELECT {} FROM categories WHERE name ILIKE $1 ORDER BY sort_order, name",
                    CATEGORY_COLUMNS
                ))
                .bind(format!("%{}%", term))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Category>(&format!(
                    "SELECT {} FROM categories ORDER BY sort_order, name",
                    CATEGORY_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(categories)
    }

    pub async fn get_category(&self, id: i64) -> Result<Category, ApiError> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", id))
    }

    pub async fn create_category(&self, payload: &CreateCategory) -> Result<Category, ApiError> {
        let result = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (name, description, sort_order, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(payload.name.trim())
        .bind(&payload.description)
        .bind(payload.sort_order.unwrap_or(0))
        .bind(payload.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(category) => Ok(category),
            Err(e) if is_unique_violation(&e) => Err(ApiError::Conflict {
                message: format!("Category with name '{}' already exists", payload.name.trim()),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_category(
        &self,
        id: i64,
        payload: &UpdateCategory,
    ) -> Result<Category, ApiError> {
        let existing = self.get_category(id).await?;

        let result = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories
            SET name = $1, description = $2, sort_order = $3, is_active = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(payload.name.as_deref().map(str::trim).unwrap_or(&existing.name))
        .bind(payload.description.clone().or(existing.description))
        .bind(payload.sort_order.unwrap_or(existing.sort_order))
        .bind(payload.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(category) => Ok(category),
            Err(e) if is_unique_violation(&e) => Err(ApiError::Conflict {
                message: "Another category already uses that name".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a category that no menu references
    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        let menu_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM menus WHERE category_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if menu_count > 0 {
            return Err(ApiError::Conflict {
                message: format!("Category {} still has {} menu(s)", id, menu_count),
            });
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(ApiError::not_found("Category", id)),
            Ok(_) => Ok(()),
            // a menu was added between the count and the delete
            Err(e) if is_foreign_key_violation(&e) => Err(ApiError::Conflict {
                message: format!("Category {} still has menus", id),
            }),
            Err(e) => Err(e.into()),
        }
    }

    // --------------------------------------------------------------------- menus

    pub async fn list_menus(
        &self,
        category_id: Option<i64>,
        search: Option<&str>,
    ) -> Result<Vec<Menu>, ApiError> {
        let menus = sqlx::query_as::<_, Menu>(&format!(
            r#"
            SELECT {}
            FROM menus
            WHERE ($1::BIGINT IS NULL OR category_id = $1)
              AND ($2::TEXT IS NULL OR name ILIKE $2)
            ORDER BY name
            "#,
            MENU_COLUMNS
        ))
        .bind(category_id)
        .bind(
            search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("%{}%", s)),
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(menus)
    }

    pub async fn get_menu(&self, id: i64) -> Result<MenuDetail, ApiError> {
        self.load_menu_detail(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Menu", id))
    }

    /// Insert a menu with its variants and options in one transaction
    pub async fn create_menu(&self, payload: &MenuPayload) -> Result<MenuDetail, ApiError> {
        self.get_category(payload.category_id).await?;

        let mut tx = self.pool.begin().await?;
        let menu = sqlx::query_as::<_, Menu>(&format!(
            r#"
            INSERT INTO menus (category_id, name, price, description, image, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            MENU_COLUMNS
        ))
        .bind(payload.category_id)
        .bind(payload.name.trim())
        .bind(payload.price)
        .bind(&payload.description)
        .bind(&payload.image)
        .bind(payload.is_active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;

        let (variants, options) = insert_variants(&mut tx, menu.id, &payload.variants).await?;
        tx.commit().await?;

        tracing::info!("Created menu {} ({})", menu.id, menu.name);
        MenuDetail::assemble(vec![menu], variants, options)
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InternalError("menu vanished after insert".into()))
    }

    /// Replace a menu's fields and its whole variant set
    ///
    /// Existing booking items keep their stored prices and option names.
    pub async fn update_menu(&self, id: i64, payload: &MenuPayload) -> Result<MenuDetail, ApiError> {
        self.get_category(payload.category_id).await?;

        let mut tx = self.pool.begin().await?;
        let menu = sqlx::query_as::<_, Menu>(&format!(
            r#"
            UPDATE menus
            SET category_id = $1, name = $2, price = $3, description = $4, image = $5,
                is_active = $6, updated_at = NOW()
            WHERE id = $7
            RETURNING {}
            "#,
            MENU_COLUMNS
        ))
        .bind(payload.category_id)
        .bind(payload.name.trim())
        .bind(payload.price)
        .bind(&payload.description)
        .bind(&payload.image)
        .bind(payload.is_active.unwrap_or(true))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Menu", id))?;

        sqlx::query("DELETE FROM menu_variants WHERE menu_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let (variants, options) = insert_variants(&mut tx, id, &payload.variants).await?;
        tx.commit().await?;

        tracing::info!("Updated menu {}", id);
        MenuDetail::assemble(vec![menu], variants, options)
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InternalError("menu vanished after update".into()))
    }

    /// Returns the deleted menu's image reference so the caller can remove the file
    pub async fn delete_menu(&self, id: i64) -> Result<Option<String>, ApiError> {
        let result = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM menus WHERE id = $1 RETURNING image",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(image)) => Ok(image),
            Ok(None) => Err(ApiError::not_found("Menu", id)),
            Err(e) if is_foreign_key_violation(&e) => Err(ApiError::Conflict {
                message: format!("Menu {} is part of existing bookings; deactivate it instead", id),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Active categories with their active menus, for the booking form
    pub async fn public_catalog(&self) -> Result<Vec<CategoryWithMenus>, ApiError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE is_active ORDER BY sort_order, name",
            CATEGORY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let menus = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {} FROM menus WHERE is_active ORDER BY name",
            MENU_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let menu_ids: Vec<i64> = menus.iter().map(|m| m.id).collect();
        let (variants, options) = self.load_variants(&menu_ids).await?;
        let details = MenuDetail::assemble(menus, variants, options);

        Ok(categories
            .into_iter()
            .map(|category| CategoryWithMenus {
                menus: details
                    .iter()
                    .filter(|m| m.category_id == category.id)
                    .cloned()
                    .collect(),
                id: category.id,
                name: category.name,
                description: category.description,
                sort_order: category.sort_order,
            })
            .collect())
    }

    async fn load_menu_detail(&self, id: i64) -> Result<Option<MenuDetail>, sqlx::Error> {
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {} FROM menus WHERE id = $1",
            MENU_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(menu) = menu else {
            return Ok(None);
        };
        let (variants, options) = self.load_variants(&[id]).await?;
        Ok(MenuDetail::assemble(vec![menu], variants, options).into_iter().next())
    }

    async fn load_variants(
        &self,
        menu_ids: &[i64],
    ) -> Result<(Vec<MenuVariant>, Vec<VariantOption>), sqlx::Error> {
        let variants = sqlx::query_as::<_, MenuVariant>(
            "SELECT id, menu_id, name, is_required FROM menu_variants WHERE menu_id = ANY($1) ORDER BY id",
        )
        .bind(menu_ids)
        .fetch_all(&self.pool)
        .await?;

        let variant_ids: Vec<i64> = variants.iter().map(|v| v.id).collect();
        let options = sqlx::query_as::<_, VariantOption>(
            r#"
            SELECT id, menu_variant_id, name, price_adjustment
            FROM variant_options
            WHERE menu_variant_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&variant_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok((variants, options))
    }
}

async fn insert_variants(
    tx: &mut Transaction<'_, Postgres>,
    menu_id: i64,
    payloads: &[VariantPayload],
) -> Result<(Vec<MenuVariant>, Vec<VariantOption>), sqlx::Error> {
    let mut variants = Vec::with_capacity(payloads.len());
    let mut options = Vec::new();

    for payload in payloads {
        let variant = sqlx::query_as::<_, MenuVariant>(
            r#"
            INSERT INTO menu_variants (menu_id, name, is_required)
            VALUES ($1, $2, $3)
            RETURNING id, menu_id, name, is_required
            "#,
        )
        .bind(menu_id)
        .bind(payload.name.trim())
        .bind(payload.is_required)
        .fetch_one(&mut **tx)
        .await?;

        for option in &payload.options {
            let inserted = sqlx::query_as::<_, VariantOption>(
                r#"
                INSERT INTO variant_options (menu_variant_id, name, price_adjustment)
                VALUES ($1, $2, $3)
                RETURNING id, menu_variant_id, name, price_adjustment
                "#,
            )
            .bind(variant.id)
            .bind(option.name.trim())
            .bind(option.price_adjustment)
            .fetch_one(&mut **tx)
            .await?;
            options.push(inserted);
        }
        variants.push(variant);
    }

    Ok((variants, options))
}

#[async_trait]
impl MenuCatalog for CatalogRepository {
    async fn find_menu(&self, id: i64) -> Result<Option<MenuDetail>, sqlx::Error> {
        self.load_menu_detail(id).await
    }

    async fn catalog_counts(&self) -> Result<CatalogCounts, sqlx::Error> {
        let (menus, categories): (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM menus), (SELECT COUNT(*) FROM categories)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(CatalogCounts { menus, categories })
    }
}
