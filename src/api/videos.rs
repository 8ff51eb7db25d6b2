use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use axum_extra::extract::{multipart::MultipartError, Multipart, WithRejection};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

use super::{AppState, JsonBody, PathParam, QueryParams, TRAINERS_AND_ADMINS};
use crate::auth::{jwt_auth_middleware, require_roles, MessageResponse, UserSession};
use crate::error::{AppError, Result};
use crate::models::{
    normalize_tags, CompleteUploadRequest, Difficulty, ExerciseType, ExerciseVideo, ListQuery, Paginated,
    UpdateVideoRequest, VideoDetails,
};
use crate::services::{ensure_publisher, VideoService, VideoUpload};

pub const VIDEO_FIELD: &str = "video";

/// Exercise video routes; uploads are bounded by the configured ceiling
pub fn video_routes(state: &AppState) -> Router {
    let publishers = || middleware::from_fn(require_roles(TRAINERS_AND_ADMINS));

    Router::new()
        .route(
            "/",
            post(upload_video).route_layer(publishers()).get(list_public_videos),
        )
        .route("/complete", post(complete_upload).route_layer(publishers()))
        .route("/trainer", get(list_my_videos))
        .route(
            "/:id",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            jwt_auth_middleware,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.videos.max_upload_bytes()))
        .with_state(state.videos.clone())
}

/// Multipart upload: the file in `video`, metadata in text fields
#[tracing::instrument(skip(service, session, multipart), fields(user_id = %session.user_id))]
async fn upload_video(
    State(service): State<VideoService>,
    session: UserSession,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    // reject pending trainers before buffering the body
    ensure_publisher(&session)?;
    let (file, details) = read_upload_form(multipart, service.max_upload_bytes()).await?;
    let video = service.upload(&session, file, details).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Video uploaded", "video": video })),
    ))
}

/// Register an object uploaded through a presigned URL
#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn complete_upload(
    State(service): State<VideoService>,
    session: UserSession,
    WithRejection(Json(request), _): JsonBody<CompleteUploadRequest>,
) -> Result<impl IntoResponse> {
    let video = service.complete_upload(&session, request).await?;
    Ok((StatusCode::CREATED, Json(video)))
}

#[tracing::instrument(skip(service))]
async fn list_public_videos(
    State(service): State<VideoService>,
    WithRejection(Query(query), _): QueryParams<ListQuery>,
) -> Result<Json<Paginated<ExerciseVideo>>> {
    Ok(Json(service.list_public(&query).await?))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn list_my_videos(
    State(service): State<VideoService>,
    session: UserSession,
    WithRejection(Query(query), _): QueryParams<ListQuery>,
) -> Result<Json<Paginated<ExerciseVideo>>> {
    Ok(Json(service.list_mine(&session, &query).await?))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn get_video(
    State(service): State<VideoService>,
    session: UserSession,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<ExerciseVideo>> {
    Ok(Json(service.get(&session, id).await?))
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn update_video(
    State(service): State<VideoService>,
    session: UserSession,
    WithRejection(Path(id), _): PathParam<Uuid>,
    WithRejection(Json(request), _): JsonBody<UpdateVideoRequest>,
) -> Result<Json<ExerciseVideo>> {
    Ok(Json(service.update(&session, id, request).await?))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn delete_video(
    State(service): State<VideoService>,
    session: UserSession,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<MessageResponse>> {
    service.delete(&session, id).await?;
    Ok(Json(MessageResponse {
        message: "Video deleted".to_string(),
    }))
}

async fn read_upload_form(mut multipart: Multipart, limit: usize) -> Result<(VideoUpload, VideoDetails)> {
    let mut file = None;
    let mut details = VideoDetails::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, limit))? {
        let name = field.name().unwrap_or_default().to_string();

        if name == VIDEO_FIELD {
            let file_name = field.file_name().unwrap_or("video.mp4").to_string();
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| content_type_for(&file_name).to_string());

            if !is_video(&content_type) {
                return Err(AppError::Validation("Only video files are allowed".to_string()));
            }

            let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
            file = Some(VideoUpload {
                data,
                file_name,
                content_type,
            });
            continue;
        }

        let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
        apply_text_field(&mut details, &name, value)?;
    }

    let file = file.ok_or_else(|| AppError::Validation("No video file provided".to_string()))?;
    Ok((file, details))
}

/// Metadata fields accept both snake_case and camelCase names
fn apply_text_field(details: &mut VideoDetails, name: &str, value: String) -> Result<()> {
    match name {
        "title" => details.title = value,
        "description" => details.description = Some(value),
        "exercise_type" | "exerciseType" => {
            let exercise_type = value.parse::<ExerciseType>().map_err(AppError::Validation)?;
            details.exercise_type = Some(exercise_type);
        }
        "difficulty" => {
            let difficulty = value.parse::<Difficulty>().map_err(AppError::Validation)?;
            details.difficulty = Some(difficulty);
        }
        "duration_seconds" | "duration" => {
            let seconds = value
                .trim()
                .parse::<f64>()
                .map_err(|_| AppError::Validation("duration must be a number of seconds".to_string()))?;
            details.duration_seconds = Some(seconds.round() as i32);
        }
        "tags" => details.tags.extend(normalize_tags(vec![value])),
        "is_public" | "isPublic" => {
            details.is_public = Some(matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        }
        other => tracing::debug!(field = other, "ignoring unknown upload field"),
    }
    Ok(())
}

fn is_video(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .map(|m| m.type_() == mime::VIDEO)
        .unwrap_or(false)
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase());
    match extension.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(limit)
    } else {
        AppError::Validation(err.body_text())
    }
}
