use std::sync::Arc;

use actix_web::{http::header, test, web, App};
use tempfile::TempDir;

use employee_flow::app_state::AppState;
use employee_flow::config::Config;
use employee_flow::store::Store;
use employee_flow::{routes, Authentication};

fn test_state() -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path().join("state.json")).unwrap());
    let config = Config {
        storage_path: dir.path().join("state.json").to_string_lossy().into_owned(),
        jwt_secret: "secret".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        frontend_origin: "http://localhost:3000".to_string(),
        gemini_api_key: None,
        gemini_endpoint: "http://localhost:0".to_string(),
    };
    (AppState { store, config, http_client: reqwest::Client::new() }, dir)
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(Authentication)
                .app_data(web::Data::new($state.clone()))
                .configure(routes),
        )
        .await
    };
}

macro_rules! login {
    ($app:expr, $username:expr, $password:expr, $role:expr) => {{
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({
                "username": $username, "password": $password, "role": $role
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        body["token"].as_str().expect("login should return a token").to_string()
    }};
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

#[actix_web::test]
async fn login_rejects_bad_credentials() {
    let (state, _dir) = test_state();
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(serde_json::json!({
            "username": "admin", "password": "wrong", "role": "OWNER"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // Correct password but wrong role fails the same way.
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(serde_json::json!({
            "username": "admin", "password": "admin", "role": "EMPLOYEE"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn unauthenticated_requests_are_rejected() {
    let (state, _dir) = test_state();
    let app = init_app!(state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/tasks").to_request()).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn task_lifecycle_over_http() {
    let (state, _dir) = test_state();
    let app = init_app!(state);
    let token = login!(app, "admin", "admin", "OWNER");

    let req = test::TestRequest::post()
        .uri("/tasks")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({
            "title": "Prepare onboarding pack",
            "description": "Docs for the new hire",
            "assigneeId": "emp-1"
        }))
        .to_request();
    let task: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(task["status"], "TODO");
    let task_id = task["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/tasks/{}/status", task_id))
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "status": "DONE", "notes": "done early" }))
        .to_request();
    let moved: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(moved["status"], "DONE");
    assert!(moved["completedAt"].is_string());
    assert_eq!(moved["completionNotes"], "done early");

    // The assignee picked up exactly one assignment notification.
    let emp_token = login!(app, "john_doe", "123", "EMPLOYEE");
    let req = test::TestRequest::get()
        .uri("/notifications")
        .insert_header(bearer(&emp_token))
        .to_request();
    let inbox: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let assigned: Vec<_> = inbox
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["title"] == "New Task Assigned")
        .collect();
    assert_eq!(assigned.len(), 1);
}

#[actix_web::test]
async fn employees_cannot_post_to_the_broadcast_channel() {
    let (state, _dir) = test_state();
    let app = init_app!(state);
    let token = login!(app, "john_doe", "123", "EMPLOYEE");

    let req = test::TestRequest::post()
        .uri("/messages")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "receiverId": "GLOBAL", "content": "hello all" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let admin_token = login!(app, "manager", "manager", "ADMINISTRATOR");
    let req = test::TestRequest::post()
        .uri("/messages")
        .insert_header(bearer(&admin_token))
        .set_json(serde_json::json!({ "receiverId": "GLOBAL", "content": "hello all" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn double_clock_in_conflicts() {
    let (state, _dir) = test_state();
    let app = init_app!(state);
    let token = login!(app, "john_doe", "123", "EMPLOYEE");

    let req = test::TestRequest::post()
        .uri("/attendance/clock_in")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri("/attendance/clock_in")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);
}

#[actix_web::test]
async fn forced_password_rotation_over_http() {
    let (state, _dir) = test_state();
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(serde_json::json!({
            "username": "john_doe", "password": "123", "role": "EMPLOYEE"
        }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user"]["needsPasswordChange"], true);
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/auth/change_password")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "newPassword": "abc", "confirmPassword": "abc" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri("/auth/change_password")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "newPassword": "abcd", "confirmPassword": "abcd" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(serde_json::json!({
            "username": "john_doe", "password": "abcd", "role": "EMPLOYEE"
        }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user"]["needsPasswordChange"], false);
}

#[actix_web::test]
async fn audit_log_is_privileged() {
    let (state, _dir) = test_state();
    let app = init_app!(state);

    let emp_token = login!(app, "john_doe", "123", "EMPLOYEE");
    let req = test::TestRequest::get()
        .uri("/logs")
        .insert_header(bearer(&emp_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let owner_token = login!(app, "admin", "admin", "OWNER");
    let req = test::TestRequest::get()
        .uri("/logs")
        .insert_header(bearer(&owner_token))
        .to_request();
    let logs: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(logs.as_array().unwrap().iter().any(|l| l["action"] == "LOGIN"));
}

#[actix_web::test]
async fn assistant_answers_offline_without_a_key() {
    let (state, _dir) = test_state();
    let app = init_app!(state);
    let token = login!(app, "admin", "admin", "OWNER");

    let req = test::TestRequest::post()
        .uri("/assistant")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "prompt": "Summarize my day" }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["reply"], "AI Assistant is currently offline (Missing API Key).");
}
