pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod notification;
pub mod seating;
pub mod settings;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod test_utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::availability::{AvailabilityService, BookingDateRepository, SystemClock};
use crate::bookings::{BookingRepository, BookingService};
use crate::catalog::CatalogRepository;
use crate::config::AppConfig;
use crate::seating::SeatingRepository;
use crate::settings::{PgSettingsBackend, SettingsStore};
use crate::storage::{FileStorage, LocalFileStorage, MAX_IMAGE_BYTES};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        catalog::handlers::public_catalog_handler,
        catalog::handlers::list_categories_handler,
        catalog::handlers::get_category_handler,
        catalog::handlers::create_category_handler,
        catalog::handlers::update_category_handler,
        catalog::handlers::delete_category_handler,
        catalog::handlers::list_menus_handler,
        catalog::handlers::get_menu_handler,
        catalog::handlers::create_menu_handler,
        catalog::handlers::update_menu_handler,
        catalog::handlers::delete_menu_handler,
        seating::handlers::active_spots_handler,
        seating::handlers::list_spots_handler,
        seating::handlers::get_spot_handler,
        seating::handlers::create_spot_handler,
        seating::handlers::update_spot_handler,
        seating::handlers::delete_spot_handler,
    ),
    components(
        schemas(
            catalog::Category,
            catalog::Menu,
            catalog::MenuDetail,
            catalog::VariantDetail,
            catalog::VariantOption,
            catalog::CategoryWithMenus,
            catalog::CreateCategory,
            catalog::UpdateCategory,
            catalog::MenuPayload,
            catalog::VariantPayload,
            catalog::OptionPayload,
            seating::SeatingSpot,
            seating::CreateSeatingSpot,
            seating::UpdateSeatingSpot,
        )
    ),
    tags(
        (name = "catalog", description = "Menu categories, menus, variants and options"),
        (name = "seating", description = "Seating spots")
    ),
    info(
        title = "Buka Puasa Booking API",
        version = "1.0.0",
        description = "Ramadan iftar table booking and pre-ordering"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub bookings: BookingService,
    pub availability: AvailabilityService,
    pub catalog: CatalogRepository,
    pub seating: SeatingRepository,
    pub settings: Arc<SettingsStore>,
    pub storage: Arc<dyn FileStorage>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(db: PgPool, config: AppConfig) -> Self {
        let booking_config = config.booking.clone();

        let availability = AvailabilityService::new(
            Arc::new(BookingDateRepository::new(db.clone())),
            Arc::new(SystemClock::new(booking_config.timezone)),
            booking_config.cutoff_hour,
        );
        let catalog = CatalogRepository::new(db.clone());
        let seating = SeatingRepository::new(db.clone());
        let settings = Arc::new(SettingsStore::with_ttl(
            Arc::new(PgSettingsBackend::new(db.clone())),
            config.settings_cache_ttl,
        ));
        let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(
            config.storage_dir.clone(),
            config.public_base_url.clone(),
        ));

        let bookings = BookingService::new(
            booking_config,
            Arc::new(BookingRepository::new(db)),
            Arc::new(catalog.clone()),
            Arc::new(seating.clone()),
            availability.clone(),
            settings.clone(),
            storage.clone(),
        );

        Self {
            config: Arc::new(config),
            bookings,
            availability,
            catalog,
            seating,
            settings,
            storage,
        }
    }
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/catalog", get(catalog::public_catalog_handler))
        .route("/api/seating-spots", get(seating::active_spots_handler))
        .route("/api/settings", get(settings::public_settings_handler))
        .route("/api/booking/config", get(availability::booking_terms_handler))
        .route(
            "/api/booking/available-dates",
            get(availability::available_dates_handler),
        )
        .route(
            "/api/booking/dates/:date/availability",
            get(availability::date_availability_handler),
        )
        .route("/api/booking/quote", post(bookings::quote_handler))
        .route("/api/bookings", post(bookings::create_booking_handler))
        .route("/api/bookings/code/:code", get(bookings::booking_by_code_handler))
        .route("/api/uploads/:kind", post(storage::handlers::upload_handler))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(bookings::dashboard_handler))
        .route("/bookings", get(bookings::list_bookings_handler))
        .route("/bookings/export", get(bookings::export_bookings_handler))
        .route("/bookings/kitchen", get(bookings::kitchen_summary_handler))
        .route(
            "/bookings/:id",
            get(bookings::get_booking_handler)
                .put(bookings::update_details_handler)
                .delete(bookings::delete_booking_handler),
        )
        .route("/bookings/:id/confirm", post(bookings::confirm_booking_handler))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking_handler))
        .route("/bookings/:id/payment", put(bookings::update_payment_handler))
        .route("/bookings/:id/items", put(bookings::edit_items_handler))
        .route("/bookings/:id/recalculate", post(bookings::recalculate_handler))
        .route("/bookings/:id/payment-proof", put(bookings::replace_proof_handler))
        .route(
            "/dates",
            get(availability::list_dates_handler).put(availability::upsert_date_handler),
        )
        .route("/dates/:date", axum::routing::delete(availability::delete_date_handler))
        .route(
            "/dates/force-open-today",
            post(availability::force_open_today_handler),
        )
        .route("/dates/close-today", post(availability::close_today_handler))
        .route(
            "/categories",
            get(catalog::list_categories_handler).post(catalog::create_category_handler),
        )
        .route(
            "/categories/:id",
            get(catalog::get_category_handler)
                .put(catalog::update_category_handler)
                .delete(catalog::delete_category_handler),
        )
        .route(
            "/menus",
            get(catalog::list_menus_handler).post(catalog::create_menu_handler),
        )
        .route(
            "/menus/:id",
            get(catalog::get_menu_handler)
                .put(catalog::update_menu_handler)
                .delete(catalog::delete_menu_handler),
        )
        .route(
            "/seating-spots",
            get(seating::list_spots_handler).post(seating::create_spot_handler),
        )
        .route(
            "/seating-spots/:id",
            get(seating::get_spot_handler)
                .put(seating::update_spot_handler)
                .delete(seating::delete_spot_handler),
        )
        .route(
            "/settings",
            get(settings::list_settings_handler).put(settings::update_settings_handler),
        )
        .route("/settings/:key", put(settings::update_setting_handler))
        .route(
            "/settings/clear-cache",
            post(settings::clear_settings_cache_handler),
        )
}

/// Creates and configures the application router
/// Public booking endpoints, the admin API under /api/admin and Swagger UI
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let uploads = ServeDir::new(&state.config.storage_dir);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public_routes())
        .nest_service("/storage", uploads)
        .nest("/api/admin", admin_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 1024 * 1024)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests;
