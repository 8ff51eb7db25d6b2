use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{UserRole, UserSession};
use crate::config::UploadConfig;
use crate::error::{AppError, Result};
use crate::models::{
    CompleteUploadRequest, ExerciseVideo, ListQuery, NewExerciseVideo, PageRequest, Paginated,
    PresignRequest, PresignResponse, UpdateVideoRequest, VideoDetails, VideoStatus, VideoUpdate,
};
use crate::repositories::VideoRepository;
use crate::services::video_processing_service::{prepare_video, VideoProcessor};
use crate::services::video_storage_service::{
    generate_presign_key, generate_video_key, normalize_object_key, thumbnail_key_for, ObjectStorage,
};

pub const DEFAULT_PRESIGN_SECONDS: u64 = 600;
pub const MAX_PRESIGN_SECONDS: u64 = 3600;

/// A video file as received from the client
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub data: Bytes,
    pub file_name: String,
    pub content_type: String,
}

/// Exercise video library: ingestion, listing and owner-only edits
#[derive(Clone)]
pub struct VideoService {
    videos: Arc<dyn VideoRepository>,
    storage: Arc<dyn ObjectStorage>,
    processor: Arc<dyn VideoProcessor>,
    upload_config: UploadConfig,
}

impl VideoService {
    pub fn new(
        videos: Arc<dyn VideoRepository>,
        storage: Arc<dyn ObjectStorage>,
        processor: Arc<dyn VideoProcessor>,
        upload_config: UploadConfig,
    ) -> Self {
        Self {
            videos,
            storage,
            processor,
            upload_config,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.upload_config.max_upload_bytes
    }

    /// Process, store and register an uploaded video.
    ///
    /// Objects written to storage are removed again if a later step fails, so a
    /// failed upload leaves neither a row nor an orphaned object behind.
    pub async fn upload(
        &self,
        session: &UserSession,
        file: VideoUpload,
        details: VideoDetails,
    ) -> Result<ExerciseVideo> {
        ensure_publisher(session)?;
        let details = details.normalized();
        details.validate()?;

        if file.data.is_empty() {
            return Err(AppError::Validation("Video file is empty".to_string()));
        }
        if file.data.len() > self.upload_config.max_upload_bytes {
            return Err(AppError::PayloadTooLarge(self.upload_config.max_upload_bytes));
        }

        let prepared = prepare_video(
            self.processor.as_ref(),
            &self.upload_config,
            file.data,
            &file.file_name,
            &file.content_type,
        )
        .await?;

        let video_key = generate_video_key(session.user_id, &prepared.file_name);
        self.storage
            .put_object(&video_key, prepared.data, &prepared.content_type)
            .await?;
        let mut uploaded = vec![video_key.clone()];

        let thumbnail_key = match prepared.thumbnail {
            Some(thumbnail) => {
                let key = thumbnail_key_for(&video_key);
                if let Err(err) = self.storage.put_object(&key, thumbnail, mime::IMAGE_JPEG.as_ref()).await {
                    self.remove_objects(&uploaded).await;
                    return Err(err.into());
                }
                uploaded.push(key.clone());
                Some(key)
            }
            None => None,
        };

        let new_video = NewExerciseVideo {
            trainer_id: session.user_id,
            title: details.title,
            description: details.description.unwrap_or_default(),
            video_url: self.storage.public_url(&video_key),
            video_path: video_key,
            thumbnail_url: thumbnail_key.as_deref().map(|key| self.storage.public_url(key)),
            thumbnail_path: thumbnail_key,
            exercise_type: details.exercise_type.unwrap_or_default(),
            difficulty: details.difficulty.unwrap_or_default(),
            duration_seconds: details.duration_seconds.or(prepared.duration_seconds),
            tags: details.tags,
            is_public: details.is_public.unwrap_or(true),
            status: VideoStatus::Ready,
        };

        match self.videos.create(new_video).await {
            Ok(video) => {
                info!(
                    video_id = %video.id,
                    trainer_id = %session.user_id,
                    converted = prepared.converted,
                    "video uploaded"
                );
                Ok(video)
            }
            Err(err) => {
                error!(error = %err, "saving video metadata failed, removing uploaded objects");
                self.remove_objects(&uploaded).await;
                Err(err.into())
            }
        }
    }

    /// Register metadata for an object the client uploaded through a presigned URL
    pub async fn complete_upload(
        &self,
        session: &UserSession,
        request: CompleteUploadRequest,
    ) -> Result<ExerciseVideo> {
        ensure_publisher(session)?;
        let details = request.details.normalized();
        details.validate()?;

        let key = normalize_object_key(request.path.trim(), self.storage.bucket()).to_string();
        if !key.starts_with("videos/") || key.len() == "videos/".len() {
            return Err(AppError::Validation(
                "path must reference an object under videos/".to_string(),
            ));
        }
        if !self.storage.object_exists(&key).await? {
            return Err(AppError::NotFound("Uploaded object"));
        }

        let video = self
            .videos
            .create(NewExerciseVideo {
                trainer_id: session.user_id,
                title: details.title,
                description: details.description.unwrap_or_default(),
                video_url: self.storage.public_url(&key),
                video_path: key,
                thumbnail_path: None,
                thumbnail_url: None,
                exercise_type: details.exercise_type.unwrap_or_default(),
                difficulty: details.difficulty.unwrap_or_default(),
                duration_seconds: details.duration_seconds,
                tags: details.tags,
                is_public: details.is_public.unwrap_or(true),
                status: VideoStatus::Ready,
            })
            .await?;

        info!(video_id = %video.id, path = %video.video_path, "presigned upload registered");
        Ok(video)
    }

    pub async fn presign(&self, session: &UserSession, request: PresignRequest) -> Result<PresignResponse> {
        ensure_publisher(session)?;

        if request.file_name.trim().is_empty() {
            return Err(AppError::Validation("file_name is required".to_string()));
        }
        if !request.content_type.starts_with("video/") {
            return Err(AppError::Validation("Only video uploads can be presigned".to_string()));
        }

        let expires_in = request
            .expires_in
            .unwrap_or(DEFAULT_PRESIGN_SECONDS)
            .clamp(1, MAX_PRESIGN_SECONDS);
        let key = generate_presign_key(&request.file_name);
        let url = self
            .storage
            .presign_upload(&key, &request.content_type, Duration::from_secs(expires_in))
            .await?;

        Ok(PresignResponse {
            url,
            public_url: self.storage.public_url(&key),
            key,
            expires_in,
        })
    }

    pub async fn list_public(&self, query: &ListQuery) -> Result<Paginated<ExerciseVideo>> {
        query.validate().map_err(|e| AppError::Validation(e.to_string()))?;
        let (videos, total) = self.videos.list_public(PageRequest::from(query)).await?;
        Ok(Paginated::new(videos, total, query))
    }

    /// Every video the caller uploaded, public or not
    pub async fn list_mine(&self, session: &UserSession, query: &ListQuery) -> Result<Paginated<ExerciseVideo>> {
        query.validate().map_err(|e| AppError::Validation(e.to_string()))?;
        let (videos, total) = self
            .videos
            .list_by_trainer(session.user_id, PageRequest::from(query))
            .await?;
        Ok(Paginated::new(videos, total, query))
    }

    pub async fn get(&self, session: &UserSession, id: Uuid) -> Result<ExerciseVideo> {
        let video = self.find(id).await?;
        if !video.is_public && !video.is_owned_by(session.user_id) {
            return Err(AppError::Forbidden("This video is private".to_string()));
        }
        Ok(video)
    }

    pub async fn update(
        &self,
        session: &UserSession,
        id: Uuid,
        request: UpdateVideoRequest,
    ) -> Result<ExerciseVideo> {
        let request = request.normalized();
        request.validate()?;

        let video = self.find(id).await?;
        ensure_owner(&video, session)?;

        self.videos
            .update(id, VideoUpdate::from(request))
            .await
            .map_err(AppError::from_repository("Video"))
    }

    /// Delete the row, then its storage objects; storage failures are only logged
    pub async fn delete(&self, session: &UserSession, id: Uuid) -> Result<()> {
        let video = self.find(id).await?;
        ensure_owner(&video, session)?;

        self.videos
            .delete(id)
            .await
            .map_err(AppError::from_repository("Video"))?;
        self.remove_objects(&video.storage_keys()).await;

        info!(video_id = %id, "video deleted");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<ExerciseVideo> {
        self.videos.find_by_id(id).await?.ok_or(AppError::NotFound("Video"))
    }

    async fn remove_objects(&self, keys: &[String]) {
        for key in keys {
            match self.storage.delete_object(key).await {
                Ok(()) => info!(key = %key, "removed storage object"),
                Err(err) => warn!(key = %key, error = %err, "failed to remove storage object"),
            }
        }
    }
}

/// Admins and approved trainers may publish
pub fn ensure_publisher(session: &UserSession) -> Result<()> {
    if session.can_publish_videos() {
        return Ok(());
    }
    let reason = match session.role {
        UserRole::Trainer => "Trainer account is awaiting approval",
        _ => "Only trainers can publish videos",
    };
    Err(AppError::Forbidden(reason.to_string()))
}

fn ensure_owner(video: &ExerciseVideo, session: &UserSession) -> Result<()> {
    if video.is_owned_by(session.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the owning trainer can modify this video".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::video_repository::MockVideoRepository;
    use crate::repositories::RepositoryError;
    use crate::test_utils::{session_for, FakeVideoProcessor, InMemoryObjectStorage, InMemoryVideoRepository};
    use assert_matches::assert_matches;

    fn upload(bytes: &'static [u8]) -> VideoUpload {
        VideoUpload {
            data: Bytes::from_static(bytes),
            file_name: "squat.mov".to_string(),
            content_type: "video/quicktime".to_string(),
        }
    }

    fn details(title: &str) -> VideoDetails {
        VideoDetails {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn service_with(
        videos: Arc<dyn VideoRepository>,
        storage: Arc<InMemoryObjectStorage>,
        processor: FakeVideoProcessor,
    ) -> VideoService {
        VideoService::new(videos, storage, Arc::new(processor), UploadConfig::default())
    }

    #[tokio::test]
    async fn test_failed_metadata_save_removes_uploaded_objects() {
        let mut repo = MockVideoRepository::new();
        repo.expect_create()
            .times(1)
            .returning(|_| Err(RepositoryError::Database(sqlx::Error::PoolTimedOut)));

        let storage = Arc::new(InMemoryObjectStorage::new());
        let service = service_with(Arc::new(repo), storage.clone(), FakeVideoProcessor::default());
        let trainer = session_for(UserRole::Trainer, true);

        let result = service.upload(&trainer, upload(b"frames"), details("Back squat")).await;

        assert_matches!(result, Err(AppError::Repository(_)));
        assert!(storage.keys().is_empty(), "orphaned objects: {:?}", storage.keys());
        assert_eq!(storage.deleted_keys().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_thumbnail_upload_removes_video_object() {
        let mut repo = MockVideoRepository::new();
        repo.expect_create().never();

        let storage = Arc::new(InMemoryObjectStorage::new());
        storage.fail_puts_with_prefix("thumbnails/");
        let service = service_with(Arc::new(repo), storage.clone(), FakeVideoProcessor::default());
        let trainer = session_for(UserRole::Trainer, true);

        let result = service.upload(&trainer, upload(b"frames"), details("Lunge")).await;

        assert_matches!(result, Err(AppError::Internal(_)));
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_failure_still_surfaces_original_error() {
        let repo = Arc::new(InMemoryVideoRepository::new());
        repo.fail_inserts(true);
        let storage = Arc::new(InMemoryObjectStorage::new());
        storage.fail_deletes(true);
        let service = service_with(repo, storage.clone(), FakeVideoProcessor::default());
        let trainer = session_for(UserRole::Trainer, true);

        let result = service.upload(&trainer, upload(b"frames"), details("Row")).await;

        assert_matches!(result, Err(AppError::Repository(_)));
        assert_eq!(storage.keys().len(), 2);
    }

    #[tokio::test]
    async fn test_processing_failures_keep_original_and_skip_thumbnail() {
        let repo = Arc::new(InMemoryVideoRepository::new());
        let storage = Arc::new(InMemoryObjectStorage::new());
        let processor = FakeVideoProcessor::failing();
        let service = service_with(repo, storage.clone(), processor.clone());
        let trainer = session_for(UserRole::Trainer, true);

        let video = service
            .upload(&trainer, upload(b"original-bytes"), details("Plank"))
            .await
            .unwrap();

        // remux failed, so the transcode fallback was attempted before keeping the original
        assert!(processor.was_called("remux"));
        assert!(processor.was_called("transcode"));
        assert!(video.video_path.ends_with("-squat.mov"));
        assert_eq!(video.thumbnail_path, None);
        assert_eq!(video.status, VideoStatus::Ready);
        assert_eq!(storage.object(&video.video_path).unwrap(), Bytes::from_static(b"original-bytes"));
    }

    #[tokio::test]
    async fn test_successful_upload_stores_converted_video_and_thumbnail() {
        let repo = Arc::new(InMemoryVideoRepository::new());
        let storage = Arc::new(InMemoryObjectStorage::new());
        let processor = FakeVideoProcessor::default();
        let service = service_with(repo, storage.clone(), processor.clone());
        let trainer = session_for(UserRole::Trainer, true);

        let video = service
            .upload(&trainer, upload(b"frames"), details("  Deadlift  "))
            .await
            .unwrap();

        assert!(processor.was_called("remux"));
        assert!(!processor.was_called("transcode"));

        assert_eq!(video.title, "Deadlift");
        assert!(video.video_path.starts_with(&format!("videos/{}/", trainer.user_id)));
        assert!(video.video_path.ends_with("-squat.mp4"));
        assert_eq!(video.thumbnail_path.as_deref(), Some(thumbnail_key_for(&video.video_path).as_str()));
        assert_eq!(video.duration_seconds, Some(FakeVideoProcessor::DURATION_SECONDS as i32));
        assert!(video.is_public);
        assert_eq!(storage.keys().len(), 2);
    }

    #[tokio::test]
    async fn test_unapproved_trainer_cannot_upload() {
        let mut repo = MockVideoRepository::new();
        repo.expect_create().never();
        let storage = Arc::new(InMemoryObjectStorage::new());
        let service = service_with(Arc::new(repo), storage.clone(), FakeVideoProcessor::default());

        let pending = session_for(UserRole::Trainer, false);
        let result = service.upload(&pending, upload(b"frames"), details("Curl")).await;

        assert_matches!(result, Err(AppError::Forbidden(_)));
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_only_owner_can_delete() {
        let repo = Arc::new(InMemoryVideoRepository::new());
        let storage = Arc::new(InMemoryObjectStorage::new());
        let service = service_with(repo, storage.clone(), FakeVideoProcessor::default());
        let owner = session_for(UserRole::Trainer, true);
        let video = service.upload(&owner, upload(b"frames"), details("Press")).await.unwrap();

        let other_trainer = session_for(UserRole::Trainer, true);
        assert_matches!(service.delete(&other_trainer, video.id).await, Err(AppError::Forbidden(_)));
        let admin = session_for(UserRole::Admin, true);
        assert_matches!(service.delete(&admin, video.id).await, Err(AppError::Forbidden(_)));

        service.delete(&owner, video.id).await.unwrap();
        assert!(storage.keys().is_empty());
        assert_matches!(service.get(&owner, video.id).await, Err(AppError::NotFound("Video")));
    }

    #[tokio::test]
    async fn test_presign_caps_expiry_and_requires_video_type() {
        let repo = Arc::new(InMemoryVideoRepository::new());
        let storage = Arc::new(InMemoryObjectStorage::new());
        let service = service_with(repo, storage, FakeVideoProcessor::default());
        let trainer = session_for(UserRole::Trainer, true);

        let response = service
            .presign(
                &trainer,
                PresignRequest {
                    file_name: "clip.mp4".to_string(),
                    content_type: "video/mp4".to_string(),
                    expires_in: Some(86_400),
                },
            )
            .await
            .unwrap();
        assert_eq!(response.expires_in, MAX_PRESIGN_SECONDS);
        assert!(response.key.starts_with("videos/"));

        let rejected = service
            .presign(
                &trainer,
                PresignRequest {
                    file_name: "notes.txt".to_string(),
                    content_type: "text/plain".to_string(),
                    expires_in: None,
                },
            )
            .await;
        assert_matches!(rejected, Err(AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_complete_upload_requires_existing_object() {
        let repo = Arc::new(InMemoryVideoRepository::new());
        let storage = Arc::new(InMemoryObjectStorage::new());
        let service = service_with(repo, storage.clone(), FakeVideoProcessor::default());
        let trainer = session_for(UserRole::Trainer, true);

        let request = |path: &str| CompleteUploadRequest {
            path: path.to_string(),
            details: details("Clean"),
        };

        assert_matches!(
            service.complete_upload(&trainer, request("videos/1-abc-clean.mp4")).await,
            Err(AppError::NotFound(_))
        );

        storage.insert("videos/1-abc-clean.mp4", Bytes::from_static(b"frames"));
        let bucket_prefixed = format!("{}/videos/1-abc-clean.mp4", storage.bucket());
        let video = service.complete_upload(&trainer, request(&bucket_prefixed)).await.unwrap();
        assert_eq!(video.video_path, "videos/1-abc-clean.mp4");
        assert_eq!(video.trainer_id, trainer.user_id);
    }
}
