pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Multipart framing allowance on top of the photo size limit
const UPLOAD_OVERHEAD: usize = 64 * 1024;

/// Build the full HTTP application
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.config.uploads.path.clone());

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api_routes(&state))
        .nest_service("/uploads", uploads)
        .fallback(not_found)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(bootcamp_routes(state))
        .merge(course_routes())
        .merge(user_routes())
        .merge(auth_routes())
}

fn bootcamp_routes(state: &AppState) -> Router<AppState> {
    use handlers::{bootcamps, courses};

    let photo_limit = state.photos.max_size() + UPLOAD_OVERHEAD;

    Router::new()
        .route("/bootcamps", get(bootcamps::list).post(bootcamps::create))
        .route("/bootcamps/radius/:zipcode/:distance", get(bootcamps::within_radius))
        .route(
            "/bootcamps/:id",
            get(bootcamps::get).put(bootcamps::update).delete(bootcamps::delete),
        )
        .route(
            "/bootcamps/:id/photo",
            put(bootcamps::upload_photo).layer(DefaultBodyLimit::max(photo_limit)),
        )
        .route(
            "/bootcamps/:id/courses",
            get(courses::list_for_bootcamp).post(courses::create),
        )
}

fn course_routes() -> Router<AppState> {
    use handlers::courses;

    Router::new()
        .route("/courses", get(courses::list))
        .route(
            "/courses/:id",
            get(courses::get).put(courses::update).delete(courses::delete),
        )
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/updatedetails", put(auth::update_details))
        .route("/auth/updatepassword", put(auth::update_password))
        .route("/auth/forgotpassword", post(auth::forgot_password))
        .route("/auth/resetpassword/:resettoken", put(auth::reset_password))
}

async fn root() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "api": "/api/v1",
    })))
}

async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.store.health_check().await?;
    Ok(ApiResponse::success(json!({ "status": "ok" })))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
