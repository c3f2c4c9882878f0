use crime_atlas::categories::CategoryCatalog;
use crime_atlas::choropleth::Atlas;
use crime_atlas::fuzzy_matcher::FuzzyMatcher;
use crime_atlas::loader::CrimeTable;
use crime_atlas::predict::LinearModel;
use crime_atlas::server::{handle_request, serve, AppState};
use crime_atlas::{CrimeRecord, IdentityIndex};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn state(with_model: bool) -> AppState {
    let table = CrimeTable::from_records(
        vec![
            CrimeRecord::new("Pune", 2012).with_count("RAPE", 10).with_count("KIDNAPPING & ABDUCTION", 4),
            CrimeRecord::new("pune ", 2012).with_count("RAPE", 5).with_count("KIDNAPPING & ABDUCTION", 1),
            CrimeRecord::new("Nagpur", 2011).with_count("RAPE", 2).with_count("KIDNAPPING & ABDUCTION", 0),
        ],
        vec!["RAPE".to_string(), "KIDNAPPING & ABDUCTION".to_string()],
    );
    let index = IdentityIndex::from_raw_names(["Pune", "Nagpur"]);
    AppState {
        atlas: Atlas::build(&table, &index, FuzzyMatcher::default()),
        catalog: CategoryCatalog::default(),
        model: with_model.then(|| {
            Box::new(LinearModel {
                weights: [1.0, 2.0],
                intercept: 0.5,
            }) as Box<dyn crime_atlas::predict::Predictor>
        }),
        initial_category: None,
        initial_year: Some(2012),
    }
}

fn get(path: &str) -> String {
    format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path)
}

fn post(path: &str, body: &str) -> String {
    format!(
        "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        path,
        body.len(),
        body
    )
}

fn split(response: &str) -> (u16, serde_json::Value) {
    let status = response
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    let body = response.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("");
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(body).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_and_listings() {
    let state = state(false);

    let (status, body) = split(&handle_request(&state, &get("/api/health")).await);
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");

    let (_, body) = split(&handle_request(&state, &get("/api/categories/")).await);
    assert_eq!(body["categories"], serde_json::json!(["RAPE", "KIDNAPPING & ABDUCTION"]));

    let (_, body) = split(&handle_request(&state, &get("/api/years")).await);
    assert_eq!(body["years"], serde_json::json!([2011, 2012]));

    let (_, body) = split(&handle_request(&state, &get("/api/districts")).await);
    assert_eq!(body["districts"], serde_json::json!(["nagpur", "pune"]));
}

#[tokio::test]
async fn test_layer_route() {
    let state = state(false);

    let (status, body) =
        split(&handle_request(&state, &get("/api/layer?category=RAPE&year=2012")).await);
    assert_eq!(status, 200);
    assert_eq!(body["locations"], serde_json::json!(["pune"]));
    assert_eq!(body["z"], serde_json::json!([15]));

    // '&' inside a category name must arrive percent-encoded
    let (status, body) = split(
        &handle_request(
            &state,
            &get("/api/layer?category=KIDNAPPING%20%26%20ABDUCTION&year=2012"),
        )
        .await,
    );
    assert_eq!(status, 200);
    assert_eq!(body["z"], serde_json::json!([5]));
    assert_eq!(body["title"], "Danger Zones by KIDNAPPING & ABDUCTION in 2012");

    // allowed category, no rows for that year
    let (status, body) =
        split(&handle_request(&state, &get("/api/layer?category=RAPE&year=1999")).await);
    assert_eq!(status, 200);
    assert_eq!(body["locations"], serde_json::json!([]));

    // allowed category missing from the data
    let (status, body) =
        split(&handle_request(&state, &get("/api/layer?category=MURDER&year=2012")).await);
    assert_eq!(status, 200);
    assert_eq!(body["z"], serde_json::json!([]));
}

#[tokio::test]
async fn test_layer_route_rejects_bad_input() {
    let state = state(false);
    for path in [
        "/api/layer?category=THEFT&year=2012",
        "/api/layer?year=2012",
        "/api/layer?category=RAPE",
        "/api/layer?category=RAPE&year=last",
    ] {
        let (status, body) = split(&handle_request(&state, &get(path)).await);
        assert_eq!(status, 400, "{}", path);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_figure_route() {
    let state = state(false);
    let (status, body) = split(&handle_request(&state, &get("/api/figure")).await);
    assert_eq!(status, 200);
    assert_eq!(body["initial_layer"], "RAPE|2012");
    assert_eq!(body["layers"].as_object().map(|l| l.len()), Some(4));
}

#[tokio::test]
async fn test_predict_route() {
    let with_model = state(true);
    let (status, body) = split(
        &handle_request(&with_model, &post("/api/predict", r#"{"features": [2.0, 3.0]}"#)).await,
    );
    assert_eq!(status, 200);
    assert_eq!(body["prediction"], 8.5);

    let (status, _) =
        split(&handle_request(&with_model, &post("/api/predict", r#"{"features": [2.0]}"#)).await);
    assert_eq!(status, 400);

    let without_model = state(false);
    let (status, _) = split(
        &handle_request(&without_model, &post("/api/predict", r#"{"features": [2.0, 3.0]}"#))
            .await,
    );
    assert_eq!(status, 503);
}

#[tokio::test]
async fn test_unknown_route() {
    let state = state(false);
    let (status, _) = split(&handle_request(&state, &get("/api/nope")).await);
    assert_eq!(status, 404);
    let (status, _) = split(&handle_request(&state, "OPTIONS /api/layer HTTP/1.1\r\n\r\n").await);
    assert_eq!(status, 204);
}

#[tokio::test]
async fn test_serve_over_tcp() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(serve(listener, Arc::new(state(true))));

    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(post("/api/predict", r#"{"features": [1.0, 1.0]}"#).as_bytes())
        .await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;

    let (status, body) = split(&response);
    assert_eq!(status, 200);
    assert_eq!(body["prediction"], 3.5);

    server.abort();
    Ok(())
}

#[tokio::test]
async fn test_binary_body_gets_a_response() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(serve(listener, Arc::new(state(true))));

    let mut request = b"POST /api/predict HTTP/1.1\r\nHost: localhost\r\nContent-Length: 4\r\n\r\n".to_vec();
    request.extend_from_slice(&[0xff, 0xfe, 0xfd, 0x80]);

    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(&request).await?;
    let mut response = String::new();
    tokio::time::timeout(
        std::time::Duration::from_secs(2),
        stream.read_to_string(&mut response),
    )
    .await??;

    let (status, body) = split(&response);
    assert_eq!(status, 400);
    assert!(body["error"].is_string());

    server.abort();
    Ok(())
}
