//! Integration tests for the federation client.
//!
//! Each test runs a throwaway HTTP peer on a local socket.

use phylograph::federation::{FederationClient, RDF_XML, SPARQL_RESULTS_JSON};
use phylograph_core::{Ingestor, PhyloError, Store};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    (listener, format!("http://{}/sparql", addr))
}

/// Read one request: head plus a `Content-Length` body.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let n = stream.read(&mut chunk).await.expect("read");
        assert!(n > 0, "connection closed before request head");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let n = stream.read(&mut chunk).await.expect("read body");
        assert!(n > 0, "connection closed before request body");
        buf.extend_from_slice(&chunk[..n]);
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// Answer one request with a canned response; yields the request text.
fn respond_once(
    listener: TcpListener,
    status: &'static str,
    content_type: &'static str,
    body: &'static str,
) -> JoinHandle<String> {
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.expect("write");
        stream.shutdown().await.expect("shutdown");
        request
    })
}

const RESULTS: &str = r#"{"head":{"vars":["gene"]},"results":{"bindings":[{"gene":{"type":"uri","value":"http://example.org/AT1G01010"}}]}}"#;

// =============================================================================
// TESTS
// =============================================================================

#[tokio::test]
async fn select_query_negotiates_json_and_passes_body_through() {
    let (listener, endpoint) = bind().await;
    let server = respond_once(listener, "200 OK", SPARQL_RESULTS_JSON, RESULTS);

    let client = FederationClient::new(Duration::from_secs(5)).expect("client");
    let query = "select ?gene where { ?gene ?p ?o }";
    let response = client.dispatch(&endpoint, query).await.expect("dispatch");

    let request = server.await.expect("server");
    let lower = request.to_ascii_lowercase();
    assert!(lower.starts_with("post /sparql "));
    assert!(lower.contains(&format!("accept: {}", SPARQL_RESULTS_JSON)));
    assert!(lower.contains("content-type: application/sparql-query"));
    assert!(request.ends_with(query));

    assert_eq!(response.body, RESULTS.as_bytes());
    let results = response.into_solutions().expect("results");
    assert_eq!(results.head.vars, vec!["gene"]);
    assert_eq!(results.results.bindings[0]["gene"].value, "http://example.org/AT1G01010");
}

#[tokio::test]
async fn graph_query_negotiates_rdfxml() {
    let (listener, endpoint) = bind().await;
    let body = "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\"/>";
    let server = respond_once(listener, "200 OK", RDF_XML, body);

    let client = FederationClient::new(Duration::from_secs(5)).expect("client");
    let response = client
        .dispatch(&endpoint, "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }")
        .await
        .expect("dispatch");

    let request = server.await.expect("server").to_ascii_lowercase();
    assert!(request.contains(&format!("accept: {}", RDF_XML)));
    assert_eq!(response.content_type, RDF_XML);
    assert_eq!(response.text(), body);
}

#[tokio::test]
async fn error_status_is_federation_error() {
    let (listener, endpoint) = bind().await;
    let _server = respond_once(listener, "500 Internal Server Error", "text/plain", "boom");

    let client = FederationClient::new(Duration::from_secs(5)).expect("client");
    let result = client.dispatch(&endpoint, "SELECT * {}").await;
    assert!(matches!(
        result,
        Err(PhyloError::Federation { endpoint: e, cause }) if e == endpoint && cause.contains("500")
    ));
}

#[tokio::test]
async fn timeout_is_federation_error_and_store_is_untouched() {
    let store = Store::new();
    store.insert_batch(Ingestor::demo_batch()).expect("seed");
    let before = store.len();

    let (listener, endpoint) = bind().await;
    // Accept and then never answer.
    let _server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(stream);
    });

    let client = FederationClient::new(Duration::from_millis(200)).expect("client");
    let result = client.dispatch(&endpoint, "SELECT * { ?s ?p ?o }").await;

    assert!(matches!(result, Err(PhyloError::Federation { .. })));
    assert_eq!(store.len(), before);
}

#[tokio::test]
async fn refused_connection_is_federation_error() {
    let (listener, endpoint) = bind().await;
    drop(listener);

    let client = FederationClient::new(Duration::from_secs(2)).expect("client");
    assert!(matches!(
        client.dispatch(&endpoint, "SELECT * {}").await,
        Err(PhyloError::Federation { .. })
    ));
}
