//! Driver runs against an in-process gateway: message accounting,
//! stop-on-block, script files, and the always-disconnect guarantee.

use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use gc_cli::cli::{Mode, RunArgs};
use gc_cli::driver::{self, RunSummary, SIMPLE_GREETING};
use gc_cli::payloads::PayloadCategory;
use gc_domain::config::Config;
use serde_json::{json, Value};
use tokio::net::TcpListener;

type Log = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

#[derive(Clone)]
struct Gateway {
    log: Log,
}

async fn handle(State(gw): State<Gateway>, uri: Uri, body: Bytes) -> Response {
    let op = uri.path().strip_prefix("/chat/Support/").unwrap_or(uri.path()).to_owned();
    let form: HashMap<String, String> = url::form_urlencoded::parse(&body).into_owned().collect();
    gw.log.lock().unwrap().push((op.clone(), form.clone()));

    let text = form.get("message").cloned().unwrap_or_default();
    let (status, body) = match op.as_str() {
        "" => (
            200,
            json!({"statusCode": 0, "chatId": "C1", "secureKey": "K", "userId": "U", "nextPosition": 1})
                .to_string(),
        ),
        "C1/send" if text.contains("<script>") => (403, "Forbidden".to_owned()),
        "C1/send" if text.contains("DROP TABLE") => (
            200,
            json!({"statusCode": 1, "errors": [{"code": 241, "message": "rejected"}]}).to_string(),
        ),
        _ => (200, json!({"statusCode": 0}).to_string()),
    };
    (StatusCode::from_u16(status).unwrap(), body).into_response()
}

/// Assistant backend living next to the gateway: answers every prompt
/// with `reply to: <prompt>`.
async fn completions(Json(body): Json<Value>) -> Json<Value> {
    let last = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or("")
        .to_owned();
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": format!("reply to: {last}")}}]
    }))
}

async fn start_gateway() -> (SocketAddr, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .fallback(handle)
        .with_state(Gateway { log: log.clone() });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, log)
}

fn config_for(addr: SocketAddr) -> Config {
    let mut config = Config::default();
    config.gateway.base_url = format!("http://{addr}/chat");
    config.gateway.service_name = "Support".into();
    config.gateway.api_key = Some("test-key".into());
    config.gateway.retry_backoff_ms = 1;
    config.driver.delay_ms = 0;
    config.driver.initial_delay_ms = 0;
    config.driver.refresh_delay_ms = 0;
    config
}

fn sent_messages(log: &Log) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|(op, _)| op == "C1/send")
        .filter_map(|(_, form)| form.get("message").cloned())
        .collect()
}

fn ops(log: &Log) -> Vec<String> {
    log.lock().unwrap().iter().map(|(op, _)| op.clone()).collect()
}

#[tokio::test]
async fn simple_mode_sends_greeting_and_disconnects() {
    let (addr, log) = start_gateway().await;
    let args = RunArgs {
        initial_message: "hi there".into(),
        ..RunArgs::default()
    };

    let summary = driver::run(&config_for(addr), &args).await.unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(summary.accepted, 1);
    assert_eq!(sent_messages(&log), vec![SIMPLE_GREETING.to_string()]);

    let create = log.lock().unwrap()[0].clone();
    assert_eq!(create.0, "");
    assert_eq!(create.1.get("text").map(String::as_str), Some("hi there"));
    assert_eq!(ops(&log).last().map(String::as_str), Some("C1/disconnect"));
}

#[tokio::test]
async fn payload_run_halts_on_first_block() {
    let (addr, log) = start_gateway().await;
    let mut config = config_for(addr);
    config.driver.stop_on_block = true;
    let args = RunArgs {
        mode: Mode::Payload,
        payload_type: PayloadCategory::Xss,
        ..RunArgs::default()
    };

    let summary = driver::run(&config, &args).await.unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(summary.blocked, 1);
    assert_eq!(summary.accepted, 0);
    assert_eq!(ops(&log).iter().filter(|op| *op == "C1/send").count(), 1);
    assert_eq!(ops(&log).last().map(String::as_str), Some("C1/disconnect"));
}

#[tokio::test]
async fn payload_run_counts_every_outcome_without_stop_on_block() {
    let (addr, log) = start_gateway().await;
    let args = RunArgs {
        mode: Mode::Payload,
        payload_type: PayloadCategory::Xss,
        ..RunArgs::default()
    };

    let summary = driver::run(&config_for(addr), &args).await.unwrap();

    let xss = PayloadCategory::Xss.payloads();
    let blocked = xss.iter().filter(|p| p.contains("<script>")).count();
    assert_eq!(summary.sent, xss.len());
    assert_eq!(summary.blocked, blocked);
    assert_eq!(summary.accepted, xss.len() - blocked);
    // Blocked sends are not retried and accepted ones trigger one refresh.
    assert!(summary.requests >= (xss.len() + 2) as u64);
    assert_eq!(sent_messages(&log).len(), xss.len());
}

#[tokio::test]
async fn rejected_messages_are_counted_separately() {
    let (addr, _log) = start_gateway().await;
    let args = RunArgs {
        mode: Mode::Payload,
        payload_type: PayloadCategory::Sqli,
        ..RunArgs::default()
    };

    let summary: RunSummary = driver::run(&config_for(addr), &args).await.unwrap();

    let sqli = PayloadCategory::Sqli.payloads();
    let rejected = sqli.iter().filter(|p| p.contains("DROP TABLE")).count();
    assert_eq!(summary.rejected, rejected);
    assert_eq!(summary.accepted, sqli.len() - rejected);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn file_mode_sends_script_lines_in_order() {
    let (addr, log) = start_gateway().await;
    let mut script = tempfile::NamedTempFile::new().unwrap();
    writeln!(script, "first line\n\n   \nsecond line\nthird line").unwrap();

    let args = RunArgs {
        mode: Mode::File,
        file: Some(script.path().to_path_buf()),
        ..RunArgs::default()
    };
    let summary = driver::run(&config_for(addr), &args).await.unwrap();

    assert_eq!(summary.sent, 3);
    assert_eq!(
        sent_messages(&log),
        vec!["first line", "second line", "third line"]
    );
}

#[tokio::test]
async fn hybrid_mode_interleaves_assistant_replies() {
    let (addr, log) = start_gateway().await;
    let mut script = tempfile::NamedTempFile::new().unwrap();
    writeln!(script, "where is my order?\ncan I get a refund?").unwrap();

    let mut config = config_for(addr);
    config.assistant.base_url = Some(format!("http://{addr}/v1"));
    config.assistant.api_key = Some("sk-mock".into());
    let args = RunArgs {
        mode: Mode::Hybrid,
        file: Some(script.path().to_path_buf()),
        ..RunArgs::default()
    };

    let summary = driver::run(&config, &args).await.unwrap();

    assert_eq!(summary.sent, 4);
    assert_eq!(
        sent_messages(&log),
        vec![
            "where is my order?",
            "reply to: where is my order?",
            "can I get a refund?",
            "reply to: can I get a refund?",
        ]
    );
}

#[tokio::test]
async fn file_mode_without_file_fails_before_any_request() {
    let (addr, log) = start_gateway().await;
    let args = RunArgs {
        mode: Mode::File,
        ..RunArgs::default()
    };

    let err = driver::run(&config_for(addr), &args).await.unwrap_err();
    assert!(err.to_string().contains("--file"));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_session_start_is_an_error() {
    let mut config = Config::default();
    config.gateway.base_url = "http://127.0.0.1:1/chat".into();
    config.gateway.service_name = "Support".into();
    config.gateway.api_key = Some("k".into());
    config.gateway.max_retries = 0;
    config.driver.initial_delay_ms = 0;

    assert!(driver::run(&config, &RunArgs::default()).await.is_err());
}
