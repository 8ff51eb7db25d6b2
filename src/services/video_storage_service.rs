use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, Client as S3Client};
use bytes::Bytes;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Object storage operations the upload pipeline relies on
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<()>;
    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;
    async fn delete_object(&self, key: &str) -> Result<()>;
    async fn object_exists(&self, key: &str) -> Result<bool>;
    /// Presigned PUT URL for a direct client upload
    async fn presign_upload(&self, key: &str, content_type: &str, expires_in: Duration) -> Result<String>;
    fn public_url(&self, key: &str) -> String;
    fn bucket(&self) -> &str;
}

/// S3-compatible object storage
pub struct S3ObjectStorage {
    client: S3Client,
    bucket_name: String,
    public_base_url: String,
}

impl S3ObjectStorage {
    pub fn new(client: S3Client, config: &StorageConfig) -> Self {
        Self {
            client,
            bucket_name: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    /// Build a client from the ambient AWS configuration, honouring a custom endpoint
    pub async fn from_config(config: &StorageConfig) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(S3Client::from_conf(builder.build()), config)
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        info!(
            "Uploading object to storage: bucket={}, key={}, size={}",
            self.bucket_name,
            key,
            data.len()
        );

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("Failed to upload {key} to storage"))?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to download {key} from storage"))?;

        let data = response
            .body
            .collect()
            .await
            .context("Failed to collect object data")?
            .into_bytes()
            .to_vec();

        info!("Downloaded object: key={}, size={}", key, data.len());
        Ok(data)
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        info!("Deleting object from storage: {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete {key} from storage"))?;

        Ok(())
    }

    async fn object_exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().map_or(false, |e| e.is_not_found()) => Ok(false),
            Err(err) => Err(anyhow::anyhow!("Failed to check object existence: {err}")),
        }
    }

    async fn presign_upload(&self, key: &str, content_type: &str, expires_in: Duration) -> Result<String> {
        let presigning_config = PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .context("Failed to build presigning config")?;

        let presigned_request = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning_config)
            .await
            .context("Failed to generate presigned URL")?;

        Ok(presigned_request.uri().to_string())
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(&self.public_base_url, key)
    }

    fn bucket(&self) -> &str {
        &self.bucket_name
    }
}

/// `{base}/{percent-encoded key}`; slashes in the key are encoded too
pub fn public_object_url(base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(key.trim_start_matches('/'))
    )
}

/// Strip a leading slash and a leading `{bucket}/` segment from a stored path
pub fn normalize_object_key<'a>(path: &'a str, bucket: &str) -> &'a str {
    let path = path.trim_start_matches('/');
    path.strip_prefix(bucket)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

/// Keep ASCII letters, digits, dot, dash and underscore; everything else becomes `_`
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "video.mp4".to_string()
    } else {
        cleaned.to_string()
    }
}

fn unique_prefix() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix.to_lowercase())
}

/// `videos/{trainer_id}/{millis}-{random}-{file name}`
pub fn generate_video_key(trainer_id: Uuid, file_name: &str) -> String {
    format!("videos/{}/{}-{}", trainer_id, unique_prefix(), sanitize_file_name(file_name))
}

/// `videos/{millis}-{random}-{file name}` for presigned uploads
pub fn generate_presign_key(file_name: &str) -> String {
    format!("videos/{}-{}", unique_prefix(), sanitize_file_name(file_name))
}

/// Thumbnail key derived from a video key: `videos/a/b.mov` -> `thumbnails/a/b-thumb.jpg`
pub fn thumbnail_key_for(video_key: &str) -> String {
    let relative = video_key
        .trim_start_matches('/')
        .strip_prefix("videos/")
        .unwrap_or(video_key.trim_start_matches('/'));

    let (dir, file) = match relative.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, relative),
    };
    let stem = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    };

    match dir {
        Some(dir) => format!("thumbnails/{dir}/{stem}-thumb.jpg"),
        None => format!("thumbnails/{stem}-thumb.jpg"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_public_url_encodes_whole_key() {
        assert_eq!(
            public_object_url("https://cdn.example.com/", "videos/abc/1-x-squat form.mp4"),
            "https://cdn.example.com/videos%2Fabc%2F1-x-squat%20form.mp4"
        );
    }

    #[test]
    fn test_normalize_object_key_strips_bucket_prefix() {
        assert_eq!(normalize_object_key("video/videos/a.mp4", "video"), "videos/a.mp4");
        assert_eq!(normalize_object_key("/videos/a.mp4", "video"), "videos/a.mp4");
        assert_eq!(normalize_object_key("videos/a.mp4", "video"), "videos/a.mp4");
        assert_eq!(normalize_object_key("videography/a.mp4", "video"), "videography/a.mp4");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\clips\\Deadlift PR!.MOV"), "Deadlift_PR_.MOV");
        assert_eq!(sanitize_file_name("   "), "video.mp4");
        assert_eq!(sanitize_file_name("..."), "video.mp4");
    }

    #[test]
    fn test_generated_video_key_layout() {
        let trainer_id = Uuid::new_v4();
        let key = generate_video_key(trainer_id, "front squat.mp4");

        let prefix = format!("videos/{trainer_id}/");
        assert!(key.starts_with(&prefix));
        assert!(key.ends_with("-front_squat.mp4"));

        let unique = &key[prefix.len()..];
        let (millis, rest) = unique.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(rest.split_once('-').unwrap().0.len(), 8);
    }

    #[test]
    fn test_presign_key_has_no_owner_segment() {
        let key = generate_presign_key("clip.webm");
        assert!(key.starts_with("videos/"));
        assert_eq!(key.matches('/').count(), 1);
    }

    #[test]
    fn test_thumbnail_key_for() {
        assert_eq!(
            thumbnail_key_for("videos/t1/1700-abc-squat.mov"),
            "thumbnails/t1/1700-abc-squat-thumb.jpg"
        );
        assert_eq!(thumbnail_key_for("videos/1700-abc-clip"), "thumbnails/1700-abc-clip-thumb.jpg");
        assert_eq!(thumbnail_key_for("legacy.mp4"), "thumbnails/legacy-thumb.jpg");
    }
}
