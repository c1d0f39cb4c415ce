//! Shared harness: a router over a temp config file and an in-memory store.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use inquisition_core::config::CachingConfig;
use inquisition_core::{Config, ConfigStore};
use inquisition_server::alerts::ALERT_COLUMNS;
use inquisition_server::router::build_router;
use inquisition_server::state::AppState;
use inquisition_tuning::memory::RecordingStore;
use inquisition_tuning::DataStore;

pub const CONFIG: &str = "\
; inquisition main config
[log_database]
host = 127.0.0.1
port = 6379

[mysql_database]
db_host = 127.0.0.1
db_port = 3306
db_name = inquisition
db_user = inquisition
db_pass = s3cret

[caching]
alert_expiration = 15
";

pub fn store() -> RecordingStore {
    RecordingStore::new()
        .with_catalog(&["parser_name", "created"])
        .with_table(
            "KnownHosts",
            "host_id",
            &["host_id", "host_val", "created"],
            vec![json!({ "host_id": 3, "host_val": "10.0.0.5", "created": "2024-01-01 00:00:00" })],
        )
        .with_table(
            "Alerts",
            "alert_id",
            &ALERT_COLUMNS,
            vec![
                json!({
                    "alert_id": 1, "alert_type": 2, "created": "2024-03-01 10:00:00",
                    "host": "web01", "src_node": "10.0.0.1", "dst_node": "10.0.0.2",
                    "alert_detail": "port scan", "log_data": "raw line"
                }),
                json!({
                    "alert_id": 2, "alert_type": 1, "created": "2024-03-02 10:00:00",
                    "host": "db01", "src_node": "10.0.0.3", "dst_node": "10.0.0.4",
                    "alert_detail": "new host", "log_data": "raw line"
                }),
            ],
        )
}

pub struct TestApp {
    _dir: TempDir,
    pub config_path: PathBuf,
    pub data: Option<Arc<RecordingStore>>,
    pub router: Router,
}

fn build(data: Option<RecordingStore>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("main.cfg");
    std::fs::write(&config_path, CONFIG).unwrap();

    let config = Arc::new(ConfigStore::open(&config_path).unwrap());
    let caching = CachingConfig::from_tree(&config.read().unwrap());
    let data = data.map(Arc::new);
    let data_store = data.clone().map(|d| d as Arc<dyn DataStore>);
    let state = AppState::new(Config::for_profile(""), config, data_store, caching);

    TestApp {
        _dir: dir,
        config_path,
        data,
        router: build_router(Arc::new(state)),
    }
}

pub fn app() -> TestApp {
    build(Some(store()))
}

pub fn app_with(data: RecordingStore) -> TestApp {
    build(Some(data))
}

/// No data store reachable.
pub fn app_without_store() -> TestApp {
    build(None)
}

/// Percent-encode every byte outside the unreserved set.
pub fn encode(pairs: &[(&str, &str)]) -> String {
    let enc = |s: &str| {
        s.bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                _ => format!("%{:02X}", b),
            })
            .collect::<String>()
    };
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", enc(k), enc(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn executed_sql(&self) -> Vec<String> {
        self.data
            .as_ref()
            .map(|d| d.executed().into_iter().map(|(s, _)| s.sql).collect())
            .unwrap_or_default()
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, path: &str, pairs: &[(&str, &str)]) -> TestResponse {
        let uri = if pairs.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, encode(pairs))
        };
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Send `pairs` as a URL-encoded form body.
    pub async fn form(&self, method: Method, path: &str, pairs: &[(&str, &str)]) -> TestResponse {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(encode(pairs)))
            .unwrap();
        self.send(req).await
    }
}
