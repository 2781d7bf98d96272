// HTTP handlers for catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::catalog::{
    CatalogQuery, Category, CategoryWithMenus, CreateCategory, Menu, MenuDetail, MenuPayload,
    UpdateCategory,
};
use crate::error::ApiError;

/// Handler for GET /api/catalog
/// Active categories with their active menus, variants and options
#[utoipa::path(
    get,
    path = "/api/catalog",
    responses(
        (status = 200, description = "Active catalog", body = Vec<CategoryWithMenus>),
        (status = 500, description = "Internal server error")
    ),
    tag = "catalog"
)]
pub async fn public_catalog_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<CategoryWithMenus>>, ApiError> {
    tracing::debug!("Fetching public catalog");
    let catalog = state.catalog.public_catalog().await?;
    Ok(Json(catalog))
}

/// Handler for GET /api/admin/categories
#[utoipa::path(
    get,
    path = "/api/admin/categories",
    params(("search" = Option<String>, Query, description = "Name filter")),
    responses((status = 200, description = "Categories", body = Vec<Category>)),
    tag = "catalog"
)]
pub async fn list_categories_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.catalog.list_categories(query.search.as_deref()).await?;
    Ok(Json(categories))
}

/// Handler for GET /api/admin/categories/:id
#[utoipa::path(
    get,
    path = "/api/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category found", body = Category),
        (status = 404, description = "Category not found")
    ),
    tag = "catalog"
)]
pub async fn get_category_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog.get_category(id).await?))
}

/// Handler for POST /api/admin/categories
#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Invalid input data"),
        (status = 409, description = "Name already taken")
    ),
    tag = "catalog"
)]
pub async fn create_category_handler(
    State(state): State<crate::AppState>,
    Json(payload): Json<CreateCategory>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    payload.validate()?;
    let category = state.catalog.create_category(&payload).await?;
    tracing::info!("Created category {} ({})", category.id, category.name);
    Ok((StatusCode::CREATED, Json(category)))
}

/// Handler for PUT /api/admin/categories/:id
#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    request_body = UpdateCategory,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 404, description = "Category not found")
    ),
    tag = "catalog"
)]
pub async fn update_category_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCategory>,
) -> Result<Json<Category>, ApiError> {
    payload.validate()?;
    let category = state.catalog.update_category(id, &payload).await?;
    tracing::info!("Updated category {}", id);
    Ok(Json(category))
}

/// Handler for DELETE /api/admin/categories/:id
/// Refused while menus still belong to the category
#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still has menus")
    ),
    tag = "catalog"
)]
pub async fn delete_category_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_category(id).await?;
    tracing::info!("Deleted category {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/admin/menus
#[utoipa::path(
    get,
    path = "/api/admin/menus",
    params(
        ("search" = Option<String>, Query, description = "Name filter"),
        ("category_id" = Option<i64>, Query, description = "Category filter")
    ),
    responses((status = 200, description = "Menus", body = Vec<Menu>)),
    tag = "catalog"
)]
pub async fn list_menus_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<Menu>>, ApiError> {
    let menus = state
        .catalog
        .list_menus(query.category_id, query.search.as_deref())
        .await?;
    Ok(Json(menus))
}

/// Handler for GET /api/admin/menus/:id
#[utoipa::path(
    get,
    path = "/api/admin/menus/{id}",
    params(("id" = i64, Path, description = "Menu ID")),
    responses(
        (status = 200, description = "Menu with variants", body = MenuDetail),
        (status = 404, description = "Menu not found")
    ),
    tag = "catalog"
)]
pub async fn get_menu_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MenuDetail>, ApiError> {
    Ok(Json(state.catalog.get_menu(id).await?))
}

/// Handler for POST /api/admin/menus
#[utoipa::path(
    post,
    path = "/api/admin/menus",
    request_body = MenuPayload,
    responses(
        (status = 201, description = "Menu created", body = MenuDetail),
        (status = 400, description = "Invalid input data"),
        (status = 404, description = "Category not found")
    ),
    tag = "catalog"
)]
pub async fn create_menu_handler(
    State(state): State<crate::AppState>,
    Json(payload): Json<MenuPayload>,
) -> Result<(StatusCode, Json<MenuDetail>), ApiError> {
    payload.validate_all()?;
    let menu = state.catalog.create_menu(&payload).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

/// Handler for PUT /api/admin/menus/:id
/// Replaces the menu's fields and its variant set
#[utoipa::path(
    put,
    path = "/api/admin/menus/{id}",
    params(("id" = i64, Path, description = "Menu ID")),
    request_body = MenuPayload,
    responses(
        (status = 200, description = "Menu updated", body = MenuDetail),
        (status = 404, description = "Menu not found")
    ),
    tag = "catalog"
)]
pub async fn update_menu_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<MenuPayload>,
) -> Result<Json<MenuDetail>, ApiError> {
    payload.validate_all()?;
    let menu = state.catalog.update_menu(id, &payload).await?;
    Ok(Json(menu))
}

/// Handler for DELETE /api/admin/menus/:id
#[utoipa::path(
    delete,
    path = "/api/admin/menus/{id}",
    params(("id" = i64, Path, description = "Menu ID")),
    responses(
        (status = 204, description = "Menu deleted"),
        (status = 404, description = "Menu not found"),
        (status = 409, description = "Menu is referenced by bookings")
    ),
    tag = "catalog"
)]
pub async fn delete_menu_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if let Some(image) = state.catalog.delete_menu(id).await? {
        if let Err(e) = state.storage.delete(&image).await {
            tracing::warn!("Menu {} deleted but its image {} was not: {}", id, image, e);
        }
    }
    tracing::info!("Deleted menu {}", id);
    Ok(StatusCode::NO_CONTENT)
}
