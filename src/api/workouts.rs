use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::{AppState, JsonBody, PathParam, QueryParams, MEMBERS_AND_TRAINERS, TRAINERS_AND_ADMINS};
use crate::auth::{jwt_auth_middleware, require_roles, MessageResponse, UserSession};
use crate::error::Result;
use crate::models::{
    CreateWorkoutRequest, ListQuery, Paginated, TrainerSummary, UpdateWorkoutRequest, WorkoutResponse,
};
use crate::services::WorkoutService;

/// Workout log routes; every route requires a bearer token
pub fn workout_routes(state: &AppState) -> Router {
    let writers = || middleware::from_fn(require_roles(MEMBERS_AND_TRAINERS));

    Router::new()
        .route(
            "/",
            post(create_workout).route_layer(writers()).get(list_workouts),
        )
        .route("/trainers/available", get(available_trainers))
        .route("/trainer/:trainer_id", get(list_trainer_workouts))
        .route(
            "/user/:user_id",
            get(list_user_workouts).route_layer(middleware::from_fn(require_roles(TRAINERS_AND_ADMINS))),
        )
        .route(
            "/:id",
            patch(update_workout)
                .delete(delete_workout)
                .route_layer(writers())
                .get(get_workout),
        )
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            jwt_auth_middleware,
        ))
        .with_state(state.workouts.clone())
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn create_workout(
    State(service): State<WorkoutService>,
    session: UserSession,
    WithRejection(Json(request), _): JsonBody<CreateWorkoutRequest>,
) -> Result<impl IntoResponse> {
    let workout = service.create(&session, request).await?;
    Ok((StatusCode::CREATED, Json(workout)))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn list_workouts(
    State(service): State<WorkoutService>,
    session: UserSession,
    WithRejection(Query(query), _): QueryParams<ListQuery>,
) -> Result<Json<Paginated<WorkoutResponse>>> {
    Ok(Json(service.list_own(&session, &query).await?))
}

async fn available_trainers(
    State(service): State<WorkoutService>,
) -> Result<Json<Vec<TrainerSummary>>> {
    Ok(Json(service.available_trainers().await?))
}

#[tracing::instrument(skip(service))]
async fn list_trainer_workouts(
    State(service): State<WorkoutService>,
    WithRejection(Path(trainer_id), _): PathParam<Uuid>,
    WithRejection(Query(query), _): QueryParams<ListQuery>,
) -> Result<Json<Paginated<WorkoutResponse>>> {
    Ok(Json(service.list_trainer_public(trainer_id, &query).await?))
}

/// Trainers and admins: a member's workout history
#[tracing::instrument(skip(service))]
async fn list_user_workouts(
    State(service): State<WorkoutService>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
    WithRejection(Query(query), _): QueryParams<ListQuery>,
) -> Result<Json<Paginated<WorkoutResponse>>> {
    Ok(Json(service.list_for_user(user_id, &query).await?))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn get_workout(
    State(service): State<WorkoutService>,
    session: UserSession,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<WorkoutResponse>> {
    Ok(Json(service.get(&session, id).await?))
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn update_workout(
    State(service): State<WorkoutService>,
    session: UserSession,
    WithRejection(Path(id), _): PathParam<Uuid>,
    WithRejection(Json(request), _): JsonBody<UpdateWorkoutRequest>,
) -> Result<Json<WorkoutResponse>> {
    Ok(Json(service.update(&session, id, request).await?))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn delete_workout(
    State(service): State<WorkoutService>,
    session: UserSession,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<MessageResponse>> {
    service.delete(&session, id).await?;
    Ok(Json(MessageResponse {
        message: "Workout deleted".to_string(),
    }))
}
