mod common;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::TestApp;

fn leg_day(date: &str) -> Value {
    json!({
        "title": "Leg day",
        "date": date,
        "exercises": [
            { "name": "Squat", "sets": 5, "reps": 5, "weight": 100.0 },
            { "name": "Lunge", "sets": 3, "reps": 10, "weight": 20.0 }
        ],
        "duration_minutes": 60,
        "intensity": "high"
    })
}

#[tokio::test]
async fn test_create_and_list_workouts() {
    let app = TestApp::new();
    let (member, token) = app.member().await;

    let (status, created) = app
        .post("/api/workouts", Some(&token), leg_day("2024-03-01T10:00:00Z"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user_id"], member.id.to_string());
    assert_eq!(created["total_volume"], 3100.0);
    assert_eq!(created["exercise_count"], 2);
    assert_eq!(created["intensity"], "high");

    app.post("/api/workouts", Some(&token), leg_day("2024-03-05T10:00:00Z"))
        .await;
    app.post("/api/workouts", Some(&token), leg_day("2024-02-20T10:00:00Z"))
        .await;

    let (status, page) = app.get("/api/workouts?limit=2", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["items"][0]["date"], "2024-03-05T10:00:00Z");

    let (status, page) = app
        .get("/api/workouts?start_date=2024-03-01&end_date=2024-03-01", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, _) = app.get("/api/workouts?limit=500", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_workout_validation() {
    let app = TestApp::new();
    let (_, token) = app.member().await;

    let (status, _) = app
        .post("/api/workouts", Some(&token), json!({ "title": "   ", "exercises": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/workouts",
            Some(&token),
            json!({ "title": "Bad", "exercises": [{ "name": "Row", "sets": 0, "reps": 5 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/workouts",
            Some(&token),
            json!({ "title": "Assigned", "trainer_id": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admins_cannot_log_workouts() {
    let app = TestApp::new();
    let (_, admin_token) = app.admin().await;

    let (status, _) = app
        .post("/api/workouts", Some(&admin_token), leg_day("2024-03-01T10:00:00Z"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_assigned_trainer_can_edit_but_strangers_cannot() {
    let app = TestApp::new();
    let (_, member_token) = app.member().await;
    let (trainer, trainer_token) = app.trainer().await;
    let (_, stranger_token) = app.member().await;

    let mut body = leg_day("2024-03-01T10:00:00Z");
    body["trainer_id"] = json!(trainer.id);
    body["is_public"] = json!(true);
    let (status, created) = app.post("/api/workouts", Some(&member_token), body).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/workouts/{}", created["id"].as_str().unwrap());

    let (status, updated) = app
        .patch(&uri, Some(&trainer_token), json!({ "notes": "Go deeper on the squats" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["notes"], "Go deeper on the squats");
    assert_eq!(updated["title"], "Leg day");

    let (status, _) = app.get(&uri, Some(&stranger_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&uri, Some(&stranger_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, page) = app
        .get(&format!("/api/workouts/trainer/{}", trainer.id), Some(&stranger_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, body) = app.delete(&uri, Some(&member_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Workout deleted");

    let (status, _) = app.get(&uri, Some(&member_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_history_is_visible_to_trainers_only() {
    let app = TestApp::new();
    let (member, member_token) = app.member().await;
    let (_, trainer_token) = app.trainer().await;
    let (_, other_token) = app.member().await;

    app.post("/api/workouts", Some(&member_token), leg_day("2024-03-01T10:00:00Z"))
        .await;
    let uri = format!("/api/workouts/user/{}", member.id);

    let (status, page) = app.get(&uri, Some(&trainer_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, _) = app.get(&uri, Some(&other_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_available_trainers_lists_active_trainers() {
    let app = TestApp::new();
    let (trainer, _) = app.trainer().await;
    let (_, token) = app.member().await;

    let (status, body) = app.get("/api/workouts/trainers/available", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let trainers = body.as_array().unwrap();
    assert_eq!(trainers.len(), 1);
    assert_eq!(trainers[0]["id"], trainer.id.to_string());
    assert!(trainers[0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_malformed_ids_are_bad_requests() {
    let app = TestApp::new();
    let (_, token) = app.member().await;

    let (status, body) = app.get("/api/workouts/not-a-uuid", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
}
