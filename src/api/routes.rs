use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::auth::auth_routes;
use super::health::health_check;
use super::presign::presign_routes;
use super::progress::progress_routes;
use super::state::AppState;
use super::videos::video_routes;
use super::workouts::workout_routes;
use crate::auth::{cors_layer, security_headers_layer};

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes(&state))
        .nest("/api/workouts", workout_routes(&state))
        .nest("/api/progress", progress_routes(&state))
        .nest("/api/videos", video_routes(&state))
        .nest("/api/presign", presign_routes(&state))
        .layer(security_headers_layer())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}
