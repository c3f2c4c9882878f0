//! HTTP API for the map viewer
//! Simple HTTP/1.1 handling over tokio TCP streams

use crate::categories::CategoryCatalog;
use crate::choropleth::Atlas;
use crate::predict::Predictor;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

const MAX_REQUEST_BYTES: usize = 1_000_000;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the handlers read. Built once at startup, never mutated.
pub struct AppState {
    pub atlas: Atlas,
    pub catalog: CategoryCatalog,
    pub model: Option<Box<dyn Predictor>>,
    pub initial_category: Option<String>,
    pub initial_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    features: [f64; 2],
}

pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    info!("Server listening on {}", listener.local_addr()?);
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from {}", addr);
        tokio::spawn(handle_connection(stream, Arc::clone(&state)));
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) {
    let mut buffer = Vec::new();
    let mut chunk = [0; 8192];

    let read_result = timeout(READ_TIMEOUT, async {
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
            if request_complete(&buffer) || buffer.len() > MAX_REQUEST_BYTES {
                break;
            }
        }
        Ok::<(), std::io::Error>(())
    })
    .await;

    match read_result {
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
        Ok(Err(e)) => {
            error!("Failed to read from stream: {}", e);
            return;
        }
        Ok(Ok(())) => {}
    }

    if buffer.is_empty() {
        return;
    }

    let request = String::from_utf8_lossy(&buffer);
    let response = handle_request(&state, &request).await;
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        error!("Failed to write response: {}", e);
    }
}

/// Headers are in and the body matches Content-Length (or there is none).
/// Only the header block has to be UTF-8; the body is counted as raw bytes.
fn request_complete(buffer: &[u8]) -> bool {
    let Some(headers_end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let Ok(headers) = std::str::from_utf8(&buffer[..headers_end]) else {
        return true;
    };
    match extract_content_length(headers) {
        Some(length) => buffer.len() >= headers_end + 4 + length,
        None => true,
    }
}

fn extract_content_length(headers: &str) -> Option<usize> {
    headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

pub async fn handle_request(state: &AppState, request: &str) -> String {
    let Some(request_line) = request.lines().next() else {
        return error_response(400, "Bad Request", "empty request");
    };
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return error_response(400, "Bad Request", "malformed request line");
    }

    let method = parts[0];
    let (path, query) = match parts[1].split_once('?') {
        Some((path, query)) => (path, query),
        None => (parts[1], ""),
    };
    let path = match path.trim_end_matches('/') {
        "" => "/",
        p => p,
    };
    let params: HashMap<String, String> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let body = request
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or("");

    debug!("Request: {} {}", method, path);

    match (method, path) {
        ("OPTIONS", _) => create_response(204, "No Content", ""),
        ("GET", "/api/health") => {
            create_response(200, "OK", r#"{"status":"ok","service":"crime-atlas"}"#)
        }
        ("GET", "/api/categories") => json_response(&serde_json::json!({
            "categories": state.atlas.categories(),
        })),
        ("GET", "/api/years") => json_response(&serde_json::json!({
            "years": state.atlas.years(),
        })),
        ("GET", "/api/districts") => json_response(&serde_json::json!({
            "districts": state.atlas.districts(),
        })),
        ("GET", "/api/layer") => handle_layer(state, &params),
        ("GET", "/api/figure") => {
            let figure = state
                .atlas
                .figure(state.initial_category.as_deref(), state.initial_year);
            json_response(&figure)
        }
        ("POST", "/api/predict") => handle_predict(state, body),
        _ => error_response(404, "Not Found", &format!("no route for {} {}", method, path)),
    }
}

fn handle_layer(state: &AppState, params: &HashMap<String, String>) -> String {
    let Some(category) = params.get("category").map(|c| c.trim()).filter(|c| !c.is_empty()) else {
        return error_response(400, "Bad Request", "query parameter 'category' is required");
    };
    if !state.catalog.contains(category) {
        return error_response(
            400,
            "Bad Request",
            &format!("'{}' is not an allowed crime category", category),
        );
    }
    let year = match params.get("year").map(|y| y.trim().parse::<i32>()) {
        Some(Ok(year)) => year,
        Some(Err(_)) => return error_response(400, "Bad Request", "'year' must be an integer"),
        None => return error_response(400, "Bad Request", "query parameter 'year' is required"),
    };

    json_response(&state.atlas.layer_or_empty(category, year))
}

fn handle_predict(state: &AppState, body: &str) -> String {
    let Some(model) = &state.model else {
        return error_response(503, "Service Unavailable", "no model loaded");
    };
    let request: PredictRequest = match serde_json::from_str(body.trim()) {
        Ok(request) => request,
        Err(e) => {
            return error_response(
                400,
                "Bad Request",
                &format!("expected {{\"features\": [a, b]}}: {}", e),
            )
        }
    };
    match model.predict(request.features) {
        Ok(prediction) => json_response(&serde_json::json!({ "prediction": prediction })),
        Err(e) => error_response(400, "Bad Request", &e.to_string()),
    }
}

fn json_response<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(body) => create_response(200, "OK", &body),
        Err(e) => error_response(500, "Internal Server Error", &e.to_string()),
    }
}

fn error_response(status: u16, status_text: &str, message: &str) -> String {
    let body = serde_json::json!({ "error": message }).to_string();
    create_response(status, status_text, &body)
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}
