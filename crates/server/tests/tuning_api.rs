//! `/tuning` end-to-end behaviour through the router.

mod common;

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::{app, app_with, app_without_store, store};

#[tokio::test]
async fn get_known_host_by_id() {
    let app = app();
    let resp = app.get("/tuning", &[("t", "known_host"), ("i", "3")]).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.body,
        json!({
            "status": "success",
            "data_source": "default",
            "data": [{ "host_id": 3, "host_val": "10.0.0.5", "created": "2024-01-01 00:00:00" }]
        })
    );
    assert_eq!(resp.headers[header::CACHE_CONTROL], "max-age=30");
    assert_eq!(
        app.executed_sql(),
        ["SELECT * FROM `KnownHosts` WHERE `host_id` = ?"]
    );
}

#[tokio::test]
async fn get_overview_redacts_config() {
    let resp = app().get("/tuning", &[]).await;

    assert_eq!(resp.status, StatusCode::OK);
    let data = &resp.body["data"];
    assert_eq!(data["metadata_types"][0], "all");
    assert_eq!(data["metadata_types"][1], "cfg");
    assert_eq!(data["id_field_names"]["known_host"], "host_id");
    assert_eq!(data["cfg"]["mysql_database"]["db_pass"], "<REDACTED>");
    assert_eq!(data["cfg"]["mysql_database"]["db_host"], "127.0.0.1");
}

#[tokio::test]
async fn get_config_key() {
    let resp = app()
        .get("/tuning", &[("t", "cfg"), ("s", "log_database"), ("k", "port")])
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"], "6379");
}

#[tokio::test]
async fn get_empty_result_is_not_found() {
    let resp = app().get("/tuning", &[("t", "parser")]).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["status"], "fail");
}

#[tokio::test]
async fn get_unknown_type_is_forbidden() {
    let resp = app().get("/tuning", &[("t", "bogus")]).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.body["status"], "fail");
    assert!(resp.body["error"].as_str().unwrap().contains("bogus"));
}

#[tokio::test]
async fn get_fan_out_lists_every_type() {
    let resp = app().get("/tuning", &[("t", "all")]).await;
    assert_eq!(resp.status, StatusCode::OK);

    let data = resp.body["data"].as_object().unwrap();
    let keys: Vec<&str> = data.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [
            "parser",
            "template",
            "regex",
            "field",
            "field_type",
            "ioc_field_mapping",
            "parser_template_mapping",
            "known_host",
            "cfg",
        ]
    );
    assert_eq!(data["known_host"][0]["host_id"], 3);
    assert_eq!(data["cfg"]["mysql_database"]["db_pass"], "<REDACTED>");
}

#[tokio::test]
async fn delete_cfg_is_rejected() {
    let resp = app()
        .form(Method::DELETE, "/tuning", &[("t", "cfg"), ("i", "1")])
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["status"], "fail");
}

#[tokio::test]
async fn put_parser_inserts_row() {
    let app = app_with(store().with_next_id(42));
    let resp = app
        .form(
            Method::PUT,
            "/tuning",
            &[
                ("t", "parser"),
                ("k", r#"{"fields":["parser_name"]}"#),
                ("v", r#"{"values":["apache"]}"#),
            ],
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"], json!({ "id": 42 }));

    let executed = app.data.as_ref().unwrap().executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].0.sql, "INSERT INTO `Parsers` (`parser_name`) VALUES (?)");
    assert_eq!(executed[0].0.params, vec![json!("apache")]);
}

#[tokio::test]
async fn put_mismatched_shape_is_bad_request() {
    let app = app();
    let resp = app
        .form(
            Method::PUT,
            "/tuning",
            &[
                ("t", "parser"),
                ("k", r#"{"fields":["a","b"]}"#),
                ("v", r#"{"values":["x"]}"#),
            ],
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(app.executed_sql().is_empty());
}

#[tokio::test]
async fn put_unknown_column_is_bad_request() {
    let app = app();
    let resp = app
        .form(
            Method::PUT,
            "/tuning",
            &[
                ("t", "parser"),
                ("k", r#"{"fields":["name`; DROP TABLE Parsers; --"]}"#),
                ("v", r#"{"values":["x"]}"#),
            ],
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(app.executed_sql().is_empty());
}

#[tokio::test]
async fn post_updates_known_host() {
    let app = app();
    let resp = app
        .form(
            Method::POST,
            "/tuning",
            &[("t", "known_host"), ("i", "3"), ("k", "host_val"), ("v", "10.0.0.9")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"], true);
    assert_eq!(
        app.executed_sql(),
        ["UPDATE `KnownHosts` SET `host_val` = ? WHERE `host_id` = ? LIMIT 1"]
    );
}

#[tokio::test]
async fn post_without_id_is_bad_request() {
    let resp = app()
        .form(Method::POST, "/tuning", &[("t", "known_host"), ("k", "host_val"), ("v", "x")])
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_sets_config_key_in_place() {
    let app = app();
    let resp = app
        .form(
            Method::POST,
            "/tuning",
            &[("t", "cfg"), ("s", "log_database"), ("k", "port"), ("v", "6380")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.headers[header::CACHE_CONTROL], "max-age=0");

    let text = std::fs::read_to_string(&app.config_path).unwrap();
    assert_eq!(text, common::CONFIG.replace("port = 6379", "port = 6380"));
}

#[tokio::test]
async fn post_config_value_with_line_break_is_bad_request() {
    let app = app();
    let resp = app
        .form(
            Method::POST,
            "/tuning",
            &[("s", "log_database"), ("k", "port"), ("v", "6380\n[mysql_database]\ndb_pass = x")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["status"], "fail");
    assert_eq!(std::fs::read_to_string(&app.config_path).unwrap(), common::CONFIG);

    let resp = app.get("/tuning", &[("s", "log_database"), ("k", "port")]).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"], "6379");
}

#[tokio::test]
async fn post_missing_config_key_is_not_found() {
    let app = app();
    let resp = app
        .form(
            Method::POST,
            "/tuning",
            &[("t", "cfg"), ("s", "log_database"), ("k", "nope"), ("v", "1")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(std::fs::read_to_string(&app.config_path).unwrap(), common::CONFIG);
}

#[tokio::test]
async fn untyped_delete_removes_config_key() {
    let app = app();
    let resp = app
        .form(Method::DELETE, "/tuning", &[("s", "caching"), ("k", "alert_expiration")])
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let text = std::fs::read_to_string(&app.config_path).unwrap();
    assert!(!text.contains("alert_expiration"));
    assert!(text.contains("[caching]"));
}

#[tokio::test]
async fn write_without_options_is_bad_request() {
    let resp = app().form(Method::POST, "/tuning", &[("zzz", "1")]).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreachable_store_is_unavailable() {
    let resp = app_with(store().offline())
        .get("/tuning", &[("t", "known_host")])
        .await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);

    let resp = app_without_store().get("/tuning", &[]).await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
}
