//! Model Server Integration Tests
//!
//! Runs the HTTP client against a one-shot local server and checks the
//! user-visible error messages for each failure class.

use std::time::{Duration, Instant};

use eventlens::adapters::{ModelServerClient, PredictionService};
use eventlens::domain::{parse_prediction_value, PredictionError, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_test::assert_err;

/// Serve exactly one request with `status` and `body`; yields the request head
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        request
    });

    (base_url, handle)
}

/// Read headers plus a Content-Length body
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buffer);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[tokio::test]
async fn test_predict_posts_text_and_parses_body() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"annotations":[{"start":0,"end":15,"spans":[[0,15]],"predicted":"process","predicted_score":5}]}"#,
    )
    .await;

    let client = ModelServerClient::new(base_url).unwrap();
    let body = client.predict("Er sagte: Ich gehe.").await.unwrap();
    let prediction = parse_prediction_value(body).unwrap();
    assert!(prediction.text.is_none());
    assert_eq!(prediction.events.len(), 1);
    assert_eq!(prediction.events[0].score, 5.0);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /predictions/ts_test "));
    assert!(request.contains(r#""text":"Er sagte: Ich gehe.""#));
}

#[tokio::test]
async fn test_server_error_message() {
    let (base_url, server) = serve_once("500 Internal Server Error", "{}").await;

    let client = ModelServerClient::new(base_url).unwrap();
    let err = assert_err!(client.predict("Text").await);
    assert!(matches!(
        err,
        PredictionError::Transport(TransportError::Status { status: 500, .. })
    ));
    assert_eq!(
        err.to_string(),
        "Error response from model server Internal Server Error 500"
    );
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_refused_message() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ModelServerClient::new(format!("http://{}", addr)).unwrap();
    let err = assert_err!(client.predict("Text").await);
    assert_eq!(err.to_string(), "Connection to model server failed!");
}

#[tokio::test]
async fn test_library_index_fetch() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"[{"id":"dprose_1","author":"Theodor Fontane","title":"Effi Briest","releaseYear":"1895"},{"id":"dprose_2","author":"Anonym","title":"Volksbuch"}]"#,
    )
    .await;

    let client = ModelServerClient::new(base_url).unwrap();
    let books = client.library_index().await.unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].release_year.as_deref(), Some("1895"));
    assert_eq!(books[1].release_year_label(), "-");

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /predictions_cached/index.json "));
}

#[tokio::test]
async fn test_precomputed_fetch_path() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"text":"Er ging.","annotations":[]}"#,
    )
    .await;

    let client = ModelServerClient::new(format!("{}/", base_url)).unwrap();
    let body = client.precomputed("dprose_4").await.unwrap();
    let prediction = parse_prediction_value(body).unwrap();
    assert_eq!(prediction.text.as_deref(), Some("Er ging."));

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /predictions_cached/dprose_4.json "));
}

#[tokio::test]
async fn test_invalid_json_is_malformed() {
    let (base_url, server) = serve_once("200 OK", "<html>not json</html>").await;

    let client = ModelServerClient::new(base_url).unwrap();
    let err = assert_err!(client.predict("Text").await);
    assert!(matches!(err, PredictionError::MalformedResponse(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_configured_timeout_applies() {
    // Accept the connection but never answer
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(socket);
    });

    let client = ModelServerClient::with_timeout(base_url, Duration::from_millis(200)).unwrap();
    let started = Instant::now();
    let err = assert_err!(client.predict("Text").await);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(err.to_string(), "Connection to model server failed!");
    server.abort();
}
