use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::{AppState, JsonBody, PathParam, ADMINS};
use crate::auth::{
    jwt_auth_middleware, require_roles, AuthResponse, AuthService, LoginRequest, RegisterRequest,
    UpdateApprovalRequest, UpdateMembershipRequest, UpdateProfileRequest, UserSession,
};
use crate::error::Result;
use crate::models::UserResponse;

/// Authentication routes
pub fn auth_routes(state: &AppState) -> Router {
    let auth_service = state.auth.clone();

    let admin_only = || middleware::from_fn(require_roles(ADMINS));
    let protected = Router::new()
        .route("/profile", get(get_profile).patch(update_profile))
        .route(
            "/membership/:user_id",
            patch(update_membership).route_layer(admin_only()),
        )
        .route("/approval/:user_id", patch(update_approval).route_layer(admin_only()))
        .route_layer(middleware::from_fn_with_state(
            auth_service.clone(),
            jwt_auth_middleware,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
        .with_state(auth_service)
}

/// Register a new user
#[tracing::instrument(skip(auth_service, request))]
async fn register(
    State(auth_service): State<AuthService>,
    WithRejection(Json(request), _): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let response = auth_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login user
#[tracing::instrument(skip(auth_service, request))]
async fn login(
    State(auth_service): State<AuthService>,
    WithRejection(Json(request), _): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let response = auth_service.login(request).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(auth_service, session), fields(user_id = %session.user_id))]
async fn get_profile(
    State(auth_service): State<AuthService>,
    session: UserSession,
) -> Result<Json<UserResponse>> {
    let user = auth_service.profile(session.user_id).await?;
    Ok(Json(user.into()))
}

#[tracing::instrument(skip(auth_service, session, request), fields(user_id = %session.user_id))]
async fn update_profile(
    State(auth_service): State<AuthService>,
    session: UserSession,
    WithRejection(Json(request), _): JsonBody<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    let user = auth_service.update_profile(session.user_id, request).await?;
    Ok(Json(user.into()))
}

/// Admin: move a user's membership expiration
#[tracing::instrument(skip(auth_service, request))]
async fn update_membership(
    State(auth_service): State<AuthService>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
    WithRejection(Json(request), _): JsonBody<UpdateMembershipRequest>,
) -> Result<Json<UserResponse>> {
    let user = auth_service
        .update_membership(user_id, request.membership_expiration)
        .await?;
    Ok(Json(user.into()))
}

/// Admin: approve trainers or mark emails verified
#[tracing::instrument(skip(auth_service, request))]
async fn update_approval(
    State(auth_service): State<AuthService>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
    WithRejection(Json(request), _): JsonBody<UpdateApprovalRequest>,
) -> Result<Json<UserResponse>> {
    let user = auth_service.set_approval(user_id, request).await?;
    Ok(Json(user.into()))
}
