use axum::{extract::State, middleware, response::Json, routing::post, Router};
use axum_extra::extract::WithRejection;

use super::{AppState, JsonBody, TRAINERS_AND_ADMINS};
use crate::auth::{jwt_auth_middleware, require_roles, UserSession};
use crate::error::Result;
use crate::models::{PresignRequest, PresignResponse};
use crate::services::VideoService;

/// Presigned direct-to-storage uploads for publishers
pub fn presign_routes(state: &AppState) -> Router {
    Router::new()
        .route("/", post(presign_upload))
        .route_layer(middleware::from_fn(require_roles(TRAINERS_AND_ADMINS)))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            jwt_auth_middleware,
        ))
        .with_state(state.videos.clone())
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn presign_upload(
    State(service): State<VideoService>,
    session: UserSession,
    WithRejection(Json(request), _): JsonBody<PresignRequest>,
) -> Result<Json<PresignResponse>> {
    Ok(Json(service.presign(&session, request).await?))
}
