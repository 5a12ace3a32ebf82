use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use roster::config::Config;
use roster::db::MemoryUserStore;

pub const PASSWORD: &str = "Wonder1and!";

/// A running test server backed by a fresh in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub config: Config,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}{}", self.addr, self.config.api_prefix, path)
    }

    pub async fn send(&self, req: reqwest::RequestBuilder) -> (Value, StatusCode) {
        let resp = req.send().await.expect("request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn log_in(&self, username: &str, password: &str) -> (Value, StatusCode) {
        self.send(
            self.client
                .post(self.url("/user/log-in"))
                .json(&json!({ "username": username, "password": password })),
        )
        .await
    }

    pub async fn create_user(&self, body: &Value) -> (Value, StatusCode) {
        self.send(self.client.post(self.url("/user")).json(body)).await
    }

    /// Create a user with valid defaults, return its `result` object.
    pub async fn create_named(&self, username: &str) -> Value {
        let (body, status) = self
            .create_user(&json!({
                "full_name": format!("{username} Example"),
                "username": username,
                "password": PASSWORD,
                "role": "executor",
                "status": 1,
            }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {body}");
        body["result"].clone()
    }

    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        self.send(self.client.get(self.url(path))).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        self.send(self.client.patch(self.url(path)).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> (Value, StatusCode) {
        self.send(self.client.delete(self.url(path))).await
    }
}

fn test_config(api_prefix: &str) -> Config {
    Config {
        database_url: None,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        jwt_expires_in: chrono::Duration::days(10),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        api_prefix: api_prefix.to_string(),
        log_level: "warn".to_string(),
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        seed_admin: None,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_prefix("").await
}

pub async fn spawn_app_with_prefix(api_prefix: &str) -> TestApp {
    let config = test_config(api_prefix);
    let (app, _state) =
        roster::build_app(Arc::new(MemoryUserStore::new()), &config).expect("build app");

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        config,
    }
}
