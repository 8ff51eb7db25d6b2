use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::{AppState, JsonBody, PathParam, QueryParams, TRAINERS_AND_ADMINS};
use crate::auth::{jwt_auth_middleware, require_roles, MessageResponse, UserSession};
use crate::error::Result;
use crate::models::{ListQuery, Paginated, Progress, ProgressRequest, UpdateStatusResponse};
use crate::services::ProgressService;

pub fn progress_routes(state: &AppState) -> Router {
    Router::new()
        .route("/", get(list_progress).post(create_progress))
        .route("/can-update", get(update_status))
        .route(
            "/user/:user_id",
            get(list_user_progress).route_layer(middleware::from_fn(require_roles(TRAINERS_AND_ADMINS))),
        )
        .route(
            "/:id",
            get(get_progress).patch(update_progress).delete(delete_progress),
        )
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            jwt_auth_middleware,
        ))
        .with_state(state.progress.clone())
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn create_progress(
    State(service): State<ProgressService>,
    session: UserSession,
    WithRejection(Json(request), _): JsonBody<ProgressRequest>,
) -> Result<impl IntoResponse> {
    let entry = service.create(&session, request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn list_progress(
    State(service): State<ProgressService>,
    session: UserSession,
    WithRejection(Query(query), _): QueryParams<ListQuery>,
) -> Result<Json<Paginated<Progress>>> {
    Ok(Json(service.list_own(&session, &query).await?))
}

/// Whether BMI and calories can be written right now
#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn update_status(
    State(service): State<ProgressService>,
    session: UserSession,
) -> Result<Json<UpdateStatusResponse>> {
    Ok(Json(service.update_status(&session).await?))
}

#[tracing::instrument(skip(service))]
async fn list_user_progress(
    State(service): State<ProgressService>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
    WithRejection(Query(query), _): QueryParams<ListQuery>,
) -> Result<Json<Paginated<Progress>>> {
    Ok(Json(service.list_for_user(user_id, &query).await?))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn get_progress(
    State(service): State<ProgressService>,
    session: UserSession,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<Progress>> {
    Ok(Json(service.get(&session, id).await?))
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn update_progress(
    State(service): State<ProgressService>,
    session: UserSession,
    WithRejection(Path(id), _): PathParam<Uuid>,
    WithRejection(Json(request), _): JsonBody<ProgressRequest>,
) -> Result<Json<Progress>> {
    Ok(Json(service.update(&session, id, request).await?))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn delete_progress(
    State(service): State<ProgressService>,
    session: UserSession,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<MessageResponse>> {
    service.delete(&session, id).await?;
    Ok(Json(MessageResponse {
        message: "Progress entry deleted".to_string(),
    }))
}
