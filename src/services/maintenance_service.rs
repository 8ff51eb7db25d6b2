use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::models::{ExerciseVideo, VideoUpdate};
use crate::repositories::VideoRepository;
use crate::services::video_processing_service::{VideoProcessor, THUMBNAIL_AT_SECONDS};
use crate::services::video_storage_service::{normalize_object_key, thumbnail_key_for, ObjectStorage};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct UrlFixSummary {
    pub scanned: usize,
    pub updated: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailSummary {
    pub processed: usize,
    pub generated: usize,
    pub failed: usize,
}

/// Batch repairs over the video library, run from the admin binary
pub struct MaintenanceService {
    videos: Arc<dyn VideoRepository>,
    storage: Arc<dyn ObjectStorage>,
    processor: Arc<dyn VideoProcessor>,
}

impl MaintenanceService {
    pub fn new(
        videos: Arc<dyn VideoRepository>,
        storage: Arc<dyn ObjectStorage>,
        processor: Arc<dyn VideoProcessor>,
    ) -> Self {
        Self {
            videos,
            storage,
            processor,
        }
    }

    /// Recompute public URLs from stored paths
    pub async fn fix_video_urls(&self) -> Result<UrlFixSummary> {
        let videos = self.videos.list_all().await.context("Failed to list videos")?;
        let mut summary = UrlFixSummary {
            scanned: videos.len(),
            ..Default::default()
        };

        for video in videos {
            let video_url = self.url_for(&video.video_path);
            let thumbnail_url = video
                .thumbnail_path
                .as_deref()
                .filter(|path| !path.is_empty())
                .map(|path| self.url_for(path));

            if video_url == video.video_url && thumbnail_url == video.thumbnail_url {
                continue;
            }

            self.videos
                .update(
                    video.id,
                    VideoUpdate {
                        video_url: Some(video_url.clone()),
                        thumbnail_url,
                        ..Default::default()
                    },
                )
                .await
                .with_context(|| format!("Failed to update video {}", video.id))?;

            info!(video_id = %video.id, old = %video.video_url, new = %video_url, "video URL fixed");
            summary.updated += 1;
        }

        Ok(summary)
    }

    /// Generate thumbnails for videos that have none; failures are counted, not fatal
    pub async fn regenerate_thumbnails(&self) -> Result<ThumbnailSummary> {
        let videos = self
            .videos
            .list_missing_thumbnails()
            .await
            .context("Failed to list videos without thumbnails")?;
        let mut summary = ThumbnailSummary::default();

        for video in videos {
            summary.processed += 1;
            match self.regenerate_one(&video).await {
                Ok(key) => {
                    info!(video_id = %video.id, thumbnail = %key, "thumbnail generated");
                    summary.generated += 1;
                }
                Err(err) => {
                    warn!(video_id = %video.id, error = %format!("{err:#}"), "thumbnail generation failed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn regenerate_one(&self, video: &ExerciseVideo) -> Result<String> {
        let video_key = normalize_object_key(&video.video_path, self.storage.bucket()).to_string();
        let data = self.storage.get_object(&video_key).await?;

        let workdir = tempfile::tempdir().context("Failed to create scratch directory")?;
        let input = workdir.path().join("input");
        let output = workdir.path().join("thumb.jpg");
        tokio::fs::write(&input, &data).await.context("Failed to write video to scratch file")?;

        self.processor
            .extract_thumbnail(&input, &output, THUMBNAIL_AT_SECONDS)
            .await?;
        let thumbnail = tokio::fs::read(&output).await.context("Failed to read thumbnail")?;

        let thumbnail_key = thumbnail_key_for(&video_key);
        self.storage
            .put_object(&thumbnail_key, Bytes::from(thumbnail), mime::IMAGE_JPEG.as_ref())
            .await?;

        let saved = self
            .videos
            .update(
                video.id,
                VideoUpdate {
                    thumbnail_url: Some(self.storage.public_url(&thumbnail_key)),
                    thumbnail_path: Some(thumbnail_key.clone()),
                    ..Default::default()
                },
            )
            .await;

        if let Err(err) = saved {
            // the row never pointed at the new object, so drop it
            if let Err(cleanup) = self.storage.delete_object(&thumbnail_key).await {
                warn!(key = %thumbnail_key, error = %cleanup, "failed to remove orphaned thumbnail");
            }
            return Err(err).with_context(|| format!("Failed to save thumbnail for video {}", video.id));
        }

        Ok(thumbnail_key)
    }

    fn url_for(&self, path: &str) -> String {
        self.storage
            .public_url(normalize_object_key(path, self.storage.bucket()))
    }
}
