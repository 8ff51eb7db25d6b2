mod common;

use axum::http::StatusCode;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{multipart_body, multipart_request, FilePart, TestApp};
use liftlog::config::UploadConfig;
use liftlog::services::ObjectStorage;

fn squat_clip(data: &[u8]) -> FilePart<'_> {
    FilePart {
        field: "video",
        file_name: "squat.mov",
        content_type: "video/quicktime",
        data,
    }
}

#[tokio::test]
async fn test_trainer_upload_stores_video_and_thumbnail() {
    let app = TestApp::new();
    let (trainer, token) = app.trainer().await;

    let body = multipart_body(
        &[
            ("title", "Back squat"),
            ("exerciseType", "weightlifting"),
            ("difficulty", "advanced"),
            ("tags", "legs, Barbell"),
        ],
        Some(squat_clip(b"not really a movie")),
    );
    let (status, body) = app.send(multipart_request("/api/videos", &token, body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Video uploaded");
    let video = &body["video"];
    assert_eq!(video["trainer_id"], trainer.id.to_string());
    assert_eq!(video["exercise_type"], "weightlifting");
    assert_eq!(video["difficulty"], "advanced");
    assert_eq!(video["tags"], json!(["legs", "Barbell"]));
    assert_eq!(video["is_public"], true);
    assert_eq!(video["status"], "ready");

    let path = video["video_path"].as_str().unwrap();
    assert!(path.starts_with(&format!("videos/{}/", trainer.id)));
    assert!(path.ends_with("-squat.mp4"));
    assert_eq!(video["video_url"], app.storage.public_url(path));
    assert_eq!(app.storage.content_type(path).as_deref(), Some("video/mp4"));

    let thumbnail = video["thumbnail_path"].as_str().unwrap();
    assert_eq!(app.storage.content_type(thumbnail).as_deref(), Some("image/jpeg"));
    assert_eq!(app.storage.keys().len(), 2);
}

#[tokio::test]
async fn test_upload_requires_an_approved_publisher() {
    let app = TestApp::new();
    let (_, member_token) = app.member().await;
    let (_, pending_token) = app.user(liftlog::auth::UserRole::Trainer, false).await;

    let body = multipart_body(&[("title", "Plank")], Some(squat_clip(b"frames")));
    let (status, _) = app.send(multipart_request("/api/videos", &member_token, body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(multipart_request("/api/videos", &pending_token, body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Trainer account is awaiting approval");
    assert!(app.storage.keys().is_empty());
}

#[tokio::test]
async fn test_pending_trainer_is_refused_before_the_form_is_read() {
    let app = TestApp::new();
    let (_, pending_token) = app.user(liftlog::auth::UserRole::Trainer, false).await;
    let (_, token) = app.trainer().await;

    // A body that is not valid multipart would be a 400 once parsed
    let garbage = b"definitely not a multipart body".to_vec();
    let (status, body) = app
        .send(multipart_request("/api/videos", &pending_token, garbage.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Trainer account is awaiting approval");

    let (status, _) = app.send(multipart_request("/api/videos", &token, garbage)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_bad_forms() {
    let app = TestApp::new();
    let (_, token) = app.trainer().await;

    let no_file = multipart_body(&[("title", "Plank")], None);
    let (status, body) = app.send(multipart_request("/api/videos", &token, no_file)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No video file provided");

    let image = multipart_body(
        &[("title", "Plank")],
        Some(FilePart {
            field: "video",
            file_name: "plank.png",
            content_type: "image/png",
            data: b"png",
        }),
    );
    let (status, _) = app.send(multipart_request("/api/videos", &token, image)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let untitled = multipart_body(&[("title", "   ")], Some(squat_clip(b"frames")));
    let (status, _) = app.send(multipart_request("/api/videos", &token, untitled)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.storage.keys().is_empty());
}

#[tokio::test]
async fn test_upload_over_the_limit_is_rejected() {
    let app = TestApp::with_upload_config(UploadConfig {
        max_upload_bytes: 256,
        ..Default::default()
    });
    let (_, token) = app.trainer().await;

    let body = multipart_body(&[("title", "Huge")], Some(squat_clip(&[0u8; 1024])));
    let (status, _) = app.send(multipart_request("/api/videos", &token, body)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(app.storage.keys().is_empty());
}

#[tokio::test]
async fn test_private_videos_are_hidden_from_other_users() {
    let app = TestApp::new();
    let (_, owner_token) = app.trainer().await;
    let (_, member_token) = app.member().await;

    let public = multipart_body(&[("title", "Lunge")], Some(squat_clip(b"frames")));
    app.send(multipart_request("/api/videos", &owner_token, public)).await;
    let private = multipart_body(&[("title", "Draft"), ("isPublic", "false")], Some(squat_clip(b"frames")));
    let (_, body) = app.send(multipart_request("/api/videos", &owner_token, private)).await;
    let uri = format!("/api/videos/{}", body["video"]["id"].as_str().unwrap());

    let (status, page) = app.get("/api/videos", Some(&member_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "Lunge");

    let (status, _) = app.get(&uri, Some(&member_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, video) = app.get(&uri, Some(&owner_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(video["is_public"], false);

    let (status, mine) = app.get("/api/videos/trainer", Some(&owner_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["total"], 2);
}

#[tokio::test]
async fn test_only_the_owner_can_edit_or_delete() {
    let app = TestApp::new();
    let (_, owner_token) = app.trainer().await;
    let (_, other_token) = app.trainer().await;
    let (_, admin_token) = app.admin().await;

    let form = multipart_body(&[("title", "Row")], Some(squat_clip(b"frames")));
    let (_, body) = app.send(multipart_request("/api/videos", &owner_token, form)).await;
    let uri = format!("/api/videos/{}", body["video"]["id"].as_str().unwrap());

    let (status, _) = app.patch(&uri, Some(&other_token), json!({ "title": "Mine now" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&uri, Some(&admin_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .patch(&uri, Some(&owner_token), json!({ "title": " Pendlay row ", "difficulty": "intermediate" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Pendlay row");
    assert_eq!(updated["difficulty"], "intermediate");

    let (status, body) = app.delete(&uri, Some(&owner_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Video deleted");
    assert!(app.storage.keys().is_empty());
    assert_eq!(app.storage.deleted_keys().len(), 2);

    let (status, _) = app.get(&uri, Some(&owner_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_presign_then_complete_upload() {
    let app = TestApp::new();
    let (trainer, token) = app.trainer().await;
    let (_, member_token) = app.member().await;

    let request = json!({ "fileName": "My Clip.mov", "contentType": "video/quicktime", "expiresIn": 99999 });
    let (status, _) = app.post("/api/presign", Some(&member_token), request.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, presigned) = app.post("/api/presign", Some(&token), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(presigned["expires_in"], 3600);
    let key = presigned["key"].as_str().unwrap().to_string();
    assert!(key.starts_with("videos/"));
    assert!(key.ends_with("-My_Clip.mov"));
    assert!(presigned["url"].as_str().unwrap().contains("X-Amz-Expires=3600"));

    let (status, _) = app
        .post("/api/presign", Some(&token), json!({ "file_name": "a.png", "content_type": "image/png" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let complete = json!({ "path": key, "title": "Clip", "tags": ["Core"] });
    let (status, _) = app.post("/api/videos/complete", Some(&token), complete.clone()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The client PUTs to the presigned URL; simulate the object landing
    app.storage.insert(&key, Bytes::from_static(b"frames"));
    let (status, video) = app.post("/api/videos/complete", Some(&token), complete).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(video["video_path"], key);
    assert_eq!(video["trainer_id"], trainer.id.to_string());
    assert_eq!(video["tags"], json!(["Core"]));
    assert!(video["thumbnail_url"].is_null());

    let (status, _) = app
        .post("/api/videos/complete", Some(&token), json!({ "path": "thumbnails/x.jpg", "title": "Nope" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_video_listings_validate_paging() {
    let app = TestApp::new();
    let (_, token) = app.trainer().await;

    for uri in ["/api/videos?limit=0", "/api/videos?limit=500", "/api/videos/trainer?page=0"] {
        let (status, _) = app.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {uri}");
    }

    let (status, _) = app.get("/api/videos?limit=100", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}
