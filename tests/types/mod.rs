use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use mockito::{Matcher, Mock, ServerGuard};
use reportportal_client::ClientConfig;
use serde_json::json;

pub const PROJECT: &str = "demo";
pub const API_KEY: &str = "test-key";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Log output collected in memory.
#[derive(Debug, Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f`, returning what it logged on this thread along with its result.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, captured.contents())
}

/// Fast retries against a local mock server.
pub fn config(server: &ServerGuard) -> ClientConfig {
    config_with_retries(server, 2)
}

pub fn config_with_retries(server: &ServerGuard, max_retry_number: u32) -> ClientConfig {
    init_tracing();
    ClientConfig::builder()
        .endpoint(server.url())
        .project(PROJECT)
        .api_key(API_KEY.to_owned())
        .max_retry_number(max_retry_number)
        .base_retry_delay(Duration::from_millis(1))
        .build()
}

pub fn v1(path: &str) -> String {
    format!("/api/v1/{PROJECT}/{path}")
}

pub fn v2(path: &str) -> String {
    format!("/api/v2/{PROJECT}/{path}")
}

pub fn start_launch(server: &mut ServerGuard, launch_uuid: &str) -> Mock {
    server
        .mock("POST", v2("launch").as_str())
        .match_header("authorization", format!("Bearer {API_KEY}").as_str())
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": launch_uuid }).to_string())
        .create()
}

pub fn start_item(server: &mut ServerGuard, launch_uuid: &str, item_id: &str) -> Mock {
    server
        .mock("POST", v2("item").as_str())
        .match_body(Matcher::PartialJson(json!({ "launchUuid": launch_uuid })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": item_id }).to_string())
        .create()
}

pub fn finish_item(server: &mut ServerGuard, item_id: &str) -> Mock {
    server
        .mock("PUT", v2(&format!("item/{item_id}")).as_str())
        .with_header("content-type", "application/json")
        .with_body(json!({ "message": format!("Item {item_id} finished") }).to_string())
        .create()
}

pub fn finish_launch(server: &mut ServerGuard, launch_uuid: &str) -> Mock {
    server
        .mock("PUT", v2(&format!("launch/{launch_uuid}/finish")).as_str())
        .with_header("content-type", "application/json")
        .with_body(json!({ "message": format!("Launch {launch_uuid} finished") }).to_string())
        .create()
}

pub fn logs(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", v2("log").as_str())
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data".to_owned()),
        )
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "responses": [{ "id": "log-1", "message": "Log saved" }] }).to_string())
        .create()
}

pub fn launch_info(
    server: &mut ServerGuard,
    launch_uuid: &str,
    id: i64,
    mode: &str,
    hits: usize,
) -> Mock {
    server
        .mock("GET", v1(&format!("launch/uuid/{launch_uuid}")).as_str())
        .expect(hits)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": id, "uuid": launch_uuid, "mode": mode }).to_string())
        .create()
}
