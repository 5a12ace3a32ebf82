mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::PASSWORD;

fn assert_failure(body: &Value, status: StatusCode) {
    assert_eq!(body["status"], status.as_u16(), "unexpected body {body}");
    assert_eq!(body["result"], Value::Null);
    assert!(body["error"]["message"].is_string());
    assert!(body["path"].is_string());
    assert!(body["timestamp"].is_string());
}

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(format!("http://{}/health", app.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.text().await.unwrap(), "ok");
}

// ── Create ──────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_envelope_without_password() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .create_user(&json!({
            "full_name": "Alice Liddell",
            "username": "alice",
            "password": PASSWORD,
            "role": "constructor-admin",
            "status": 0,
        }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], 201);
    assert_eq!(body["error"], Value::Null);

    let user = &body["result"];
    assert!(user["id"].is_string());
    assert_eq!(user["full_name"], "Alice Liddell");
    assert_eq!(user["role"], "constructor-admin");
    // status in the body is ignored; new users are always active
    assert_eq!(user["status"], 1);
    assert!(user["created_at"].is_i64());
    assert_eq!(user["updated_at"], Value::Null);
    assert_eq!(user["deleted_at"], Value::Null);
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());
}

#[tokio::test]
async fn create_accepts_camel_case_full_name() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .create_user(&json!({
            "fullName": "Bob Builder",
            "username": "bob",
            "password": PASSWORD,
            "role": "operator",
        }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["result"]["full_name"], "Bob Builder");
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = common::spawn_app().await;
    let first = app.create_named("alice").await;

    let (body, status) = app
        .create_user(&json!({
            "full_name": "Another Alice",
            "username": "alice",
            "password": PASSWORD,
            "role": "operator",
        }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_failure(&body, StatusCode::CONFLICT);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("username"));
    assert!(message.contains("alice"));

    let id = first["id"].as_str().unwrap();
    let (body, status) = app.get(&format!("/user/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], first);
}

#[tokio::test]
async fn create_rejects_weak_password() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .create_user(&json!({
            "full_name": "Weak Person",
            "username": "weakling",
            "password": "alllowercase",
            "role": "operator",
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["message"],
        "Password too weak. Must include uppercase, lowercase, number, and special character."
    );
}

#[tokio::test]
async fn create_reports_first_invalid_field_only() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .create_user(&json!({
            "full_name": "X",
            "username": "x",
            "password": "short",
            "role": "bogus",
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["message"],
        "full_name must be between 2 and 200 characters"
    );
}

#[tokio::test]
async fn create_rejects_unknown_role() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .create_user(&json!({
            "full_name": "Rolf Role",
            "username": "rolf",
            "password": PASSWORD,
            "role": "bogus",
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("o-manager"));
}

#[tokio::test]
async fn malformed_json_is_enveloped() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .send(
            app.client
                .post(app.url("/user"))
                .header("content-type", "application/json")
                .body("{not json"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, StatusCode::BAD_REQUEST);
}

// ── Log in ──────────────────────────────────────────────────────

#[tokio::test]
async fn log_in_with_valid_credentials() {
    let app = common::spawn_app().await;
    let user = app.create_named("alice").await;

    let (body, status) = app.log_in("alice", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 200);
    let result = &body["result"];
    assert!(result["accessToken"].is_string());
    assert_eq!(result["permissions"], json!([]));
    assert_eq!(result["user"]["id"], user["id"]);
    assert_eq!(result["user"]["fullName"], "alice Example");
    assert_eq!(result["user"]["role"], "executor");

    let claims = roster::auth::jwt::decode_token(
        result["accessToken"].as_str().unwrap(),
        &app.config.jwt_secret,
    )
    .unwrap();
    assert_eq!(claims.sub.to_string(), user["id"].as_str().unwrap());
}

#[tokio::test]
async fn log_in_does_not_reveal_which_part_was_wrong() {
    let app = common::spawn_app().await;
    app.create_named("alice").await;

    let (wrong_password, s1) = app.log_in("alice", "Wrong1pass!").await;
    let (unknown_user, s2) = app.log_in("nobody", PASSWORD).await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["error"], unknown_user["error"]);
    assert_eq!(
        wrong_password["error"]["message"],
        "Invalid username or password"
    );
}

#[tokio::test]
async fn log_in_requires_both_fields() {
    let app = common::spawn_app().await;

    let (body, status) = app.log_in("", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "username should not be empty");
}

// ── Read ────────────────────────────────────────────────────────

#[tokio::test]
async fn get_unknown_id_is_not_found() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .get("/user/0190b2d4-0000-7000-8000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_failure(&body, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "User not found");
    assert_eq!(body["path"], "/user/0190b2d4-0000-7000-8000-000000000000");
}

#[tokio::test]
async fn get_malformed_id_is_a_cast_failure() {
    let app = common::spawn_app().await;

    let (body, status) = app.get("/user/not-an-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["message"],
        "Invalid uuid value 'not-an-id' for field 'id'"
    );
}

#[tokio::test]
async fn get_is_idempotent() {
    let app = common::spawn_app().await;
    let user = app.create_named("alice").await;
    let path = format!("/user/{}", user["id"].as_str().unwrap());

    let (first, _) = app.get(&path).await;
    let (second, _) = app.get(&path).await;
    assert_eq!(first["result"], second["result"]);
}

// ── List ────────────────────────────────────────────────────────

#[tokio::test]
async fn list_paginates_oldest_first() {
    let app = common::spawn_app().await;
    for i in 0..25 {
        app.create_named(&format!("user{i:02}")).await;
    }

    let (body, status) = app.get("/user?page=3&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    let result = &body["result"];
    assert_eq!(result["total_docs"], 25);
    assert_eq!(result["total_page"], 3);
    assert_eq!(result["current_page"], 3);
    let names: Vec<&str> = result["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["user20", "user21", "user22", "user23", "user24"]);
}

#[tokio::test]
async fn list_defaults_to_first_ten() {
    let app = common::spawn_app().await;
    for i in 0..12 {
        app.create_named(&format!("user{i:02}")).await;
    }

    let (body, _) = app.get("/user").await;
    assert_eq!(body["result"]["current_page"], 1);
    assert_eq!(body["result"]["total_page"], 2);
    assert_eq!(body["result"]["data"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn list_filters_by_substring_and_role() {
    let app = common::spawn_app().await;
    app.create_named("alice").await;
    app.create_named("malice").await;
    app.create_user(&json!({
        "full_name": "Olga Manager",
        "username": "olga",
        "password": PASSWORD,
        "role": "o-manager",
    }))
    .await;

    let (body, _) = app.get("/user?username=ALI").await;
    assert_eq!(body["result"]["total_docs"], 2);

    let (body, _) = app.get("/user?full_name=manager&role=o-manager").await;
    assert_eq!(body["result"]["total_docs"], 1);
    assert_eq!(body["result"]["data"][0]["username"], "olga");

    let (body, _) = app.get("/user?role=executor").await;
    assert_eq!(body["result"]["total_docs"], 2);

    let (body, status) = app.get("/user?role=&username=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["total_docs"], 3);
}

#[tokio::test]
async fn list_rejects_zero_page() {
    let app = common::spawn_app().await;

    let (body, status) = app.get("/user?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "page must not be less than 1");

    let (body, status) = app.get("/user?limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, StatusCode::BAD_REQUEST);
}

// ── Update ──────────────────────────────────────────────────────

#[tokio::test]
async fn update_changes_whitelisted_fields_only() {
    let app = common::spawn_app().await;
    let user = app.create_named("alice").await;
    let path = format!("/user/{}", user["id"].as_str().unwrap());

    let (body, status) = app
        .patch(
            &path,
            &json!({
                "full_name": "Alice Renamed",
                "role": "operator",
                "status": 0,
                "created_at": 1,
                "id": "0190b2d4-0000-7000-8000-000000000000",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let updated = &body["result"];
    assert_eq!(updated["id"], user["id"]);
    assert_eq!(updated["full_name"], "Alice Renamed");
    assert_eq!(updated["role"], "operator");
    assert_eq!(updated["status"], 1);
    assert_eq!(updated["created_at"], user["created_at"]);
    assert!(updated["updated_at"].is_i64());
}

#[tokio::test]
async fn update_password_is_rehashed() {
    let app = common::spawn_app().await;
    let user = app.create_named("alice").await;
    let path = format!("/user/{}", user["id"].as_str().unwrap());

    let (_, status) = app.patch(&path, &json!({ "password": "N3w!passw0rd" })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, status) = app.log_in("alice", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, status) = app.log_in("alice", "N3w!passw0rd").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn update_missing_user_is_not_found() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .patch(
            "/user/0190b2d4-0000-7000-8000-000000000000",
            &json!({ "full_name": "Nobody Here" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_failure(&body, StatusCode::NOT_FOUND);
}

// ── Delete & restore ────────────────────────────────────────────

#[tokio::test]
async fn delete_then_restore_round_trip() {
    let app = common::spawn_app().await;
    let user = app.create_named("alice").await;
    let id = user["id"].as_str().unwrap();

    let resp = app
        .client
        .delete(app.url(&format!("/user/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.text().await.unwrap().is_empty());

    let (_, status) = app.get(&format!("/user/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, status) = app.log_in("alice", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, status) = app.delete(&format!("/user/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (body, status) = app.patch(&format!("/user/restore/{id}"), &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["status"], 1);
    assert_eq!(body["result"]["deleted_at"], Value::Null);

    let (body, status) = app.get(&format!("/user/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["deleted_at"], Value::Null);
}

#[tokio::test]
async fn restore_active_user_is_not_found() {
    let app = common::spawn_app().await;
    let user = app.create_named("alice").await;
    let id = user["id"].as_str().unwrap();

    let (body, status) = app.patch(&format!("/user/restore/{id}"), &json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "User not found");
}

#[tokio::test]
async fn deleted_username_stays_reserved() {
    let app = common::spawn_app().await;
    let user = app.create_named("alice").await;
    app.delete(&format!("/user/{}", user["id"].as_str().unwrap())).await;

    let (_, status) = app
        .create_user(&json!({
            "full_name": "Alice Again",
            "username": "alice",
            "password": PASSWORD,
            "role": "operator",
        }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ── Routing ─────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_route_is_enveloped_not_found() {
    let app = common::spawn_app().await;

    let (body, status) = app.get("/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_failure(&body, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Cannot GET /nope");
}

#[tokio::test]
async fn wrong_method_is_enveloped() {
    let app = common::spawn_app().await;

    let (body, status) = app.send(app.client.put(app.url("/user"))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_failure(&body, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn routes_live_under_configured_prefix() {
    let app = common::spawn_app_with_prefix("/api").await;
    app.create_named("alice").await;

    let (_, status) = app.log_in("alice", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    let resp = app
        .client
        .get(format!("http://{}/user", app.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
