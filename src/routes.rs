// region:    --- Imports
use crate::handlers;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

// endregion: --- Imports

/// 요청 바디 최대 크기 (zip 업로드 포함 200MB)
pub const BODY_LIMIT: usize = 200 * 1024 * 1024;

// region:    --- Router
/// 전체 라우터
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/products", get(handlers::handle_get_products))
        .route("/products/:id", get(handlers::handle_get_product))
        .route(
            "/products/:id/highest-bid",
            get(handlers::handle_get_highest_bid),
        )
        .route(
            "/products/:id/bids",
            get(handlers::handle_get_bid_history).post(handlers::handle_bid),
        )
        .route("/images/:id", get(handlers::handle_get_image));

    let admin = Router::new()
        .route("/admin/login", post(handlers::handle_login))
        .route("/admin/logout", post(handlers::handle_logout))
        .route(
            "/admin/products",
            get(handlers::handle_get_admin_products).post(handlers::handle_create_product),
        )
        .route(
            "/admin/products/:id",
            post(handlers::handle_update_product).delete(handlers::handle_delete_product),
        )
        .route("/admin/products/:id/sold", post(handlers::handle_mark_sold))
        .route("/admin/images/:id", delete(handlers::handle_delete_image))
        .route("/admin/bulk-import", post(handlers::handle_bulk_import))
        .route("/admin/test-email", get(handlers::handle_test_email));

    let uploads = ServeDir::new(state.images.upload_dir());

    public
        .merge(admin)
        .nest_service("/uploads", uploads)
        .layer(cors)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

// endregion: --- Router
