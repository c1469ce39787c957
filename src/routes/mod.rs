pub mod comments;
pub mod identity;
pub mod posts;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header, header::InvalidHeaderValue},
    middleware,
    response::IntoResponse,
    routing::get,
};
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::models::User;

pub use comments::comments_routes;
pub use identity::{CurrentUser, USER_ID_COOKIE};
pub use posts::posts_routes;

#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub current_user: User,
}

pub fn cors_layer(client_url: Option<&str>) -> Result<CorsLayer, InvalidHeaderValue> {
    match client_url {
        Some(origin) => Ok(CorsLayer::new()
            .allow_origin(HeaderValue::from_str(origin)?)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])),
        None => Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)),
    }
}

pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .nest("/posts", posts_routes().merge(comments_routes()))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    identity::pin_current_user,
                )),
        )
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy"}))
}
