//! Common test utilities for wallet integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use wallet_service::{create_router, AppState, Ledger, LedgerOptions, ServiceConfig};
use wallet_store::RocksStore;

/// Token the harness configures and sends.
pub const TOKEN: &str = "test-token";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The running ledger behind the server.
    pub ledger: Ledger,
    /// Temporary directory for the database (kept alive for test duration).
    pub temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self::open(temp_dir).await
    }

    /// Start a service over an existing data directory.
    pub async fn open(temp_dir: TempDir) -> Self {
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            shared_token: TOKEN.into(),
            // Only explicit flushes and shutdown write in tests
            flush_interval_seconds: 3600,
            flush_on_shutdown: true,
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        };

        let ledger = Ledger::start(
            Arc::new(store),
            LedgerOptions {
                flush_interval: Duration::from_secs(config.flush_interval_seconds),
                flush_on_shutdown: config.flush_on_shutdown,
            },
        )
        .await
        .expect("Failed to start ledger");

        let state = AppState::new(ledger.cache(), config);
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            ledger,
            temp_dir,
        }
    }

    /// Stop the service (with its final flush) and start it again on the same data.
    pub async fn restart(self) -> Self {
        let Self {
            server,
            ledger,
            temp_dir,
        } = self;
        drop(server);
        ledger.stop().await.expect("Failed to stop ledger");
        Self::open(temp_dir).await
    }

    /// POST `body` to `path` with the shared token added.
    pub async fn post(&self, path: &str, mut body: Value) -> TestResponse {
        body["token"] = json!(TOKEN);
        self.server.post(path).json(&body).await
    }

    /// Create a user and assert success.
    pub async fn create_user(&self, id: u64) {
        self.post("/user/create", json!({ "id": id, "balance": 0 }))
            .await
            .assert_status_ok();
    }

    /// Apply a deposit, returning the raw response.
    pub async fn deposit(&self, user_id: u64, deposit_id: u64, amount: f64) -> TestResponse {
        self.post(
            "/user/deposit",
            json!({ "userId": user_id, "depositId": deposit_id, "amount": amount }),
        )
        .await
    }

    /// Apply a bet or win, returning the raw response.
    pub async fn transaction(
        &self,
        user_id: u64,
        transaction_id: u64,
        kind: &str,
        amount: f64,
    ) -> TestResponse {
        self.post(
            "/transaction",
            json!({
                "userId": user_id,
                "transactionId": transaction_id,
                "type": kind,
                "amount": amount,
            }),
        )
        .await
    }

    /// Fetch a user's counters.
    pub async fn get_user(&self, id: u64) -> TestResponse {
        self.post("/user/get", json!({ "id": id })).await
    }
}

/// The violation kinds listed in an error response.
pub fn violation_kinds(response: &TestResponse) -> Vec<String> {
    let body: Value = response.json();
    body["error"]["details"]["violations"]
        .as_array()
        .map(|violations| {
            violations
                .iter()
                .filter_map(|v| v["kind"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
