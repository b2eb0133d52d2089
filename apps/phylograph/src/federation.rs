//! # Federation Client
//!
//! Forwards a query string to a remote SPARQL endpoint.
//!
//! The client has no access to the local store: a federated query never
//! reads or mutates local data. Requests are POSTed once with an explicit
//! timeout and are never retried.

use phylograph_core::{PhyloError, SparqlJson};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

/// Request body type for a query.
pub const SPARQL_QUERY: &str = "application/sparql-query";

/// Accepted for SELECT queries.
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Accepted for graph-returning queries.
pub const RDF_XML: &str = "application/rdf+xml";

/// Pick the Accept type from the query text.
///
/// A `select` keyword anywhere in the text, in any case, asks for SPARQL
/// JSON results; anything else asks for RDF/XML.
pub fn accept_for(query: &str) -> &'static str {
    let is_select = query
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|word| word.eq_ignore_ascii_case("select"));
    if is_select {
        SPARQL_RESULTS_JSON
    } else {
        RDF_XML
    }
}

/// A remote response, body untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedResponse {
    /// The response `Content-Type`, or the requested type when absent.
    pub content_type: String,
    pub body: Vec<u8>,
}

impl FederatedResponse {
    /// True when the body is a SPARQL JSON results document.
    pub fn is_results_json(&self) -> bool {
        let media = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        media.eq_ignore_ascii_case(SPARQL_RESULTS_JSON)
            || media.eq_ignore_ascii_case("application/json")
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Reshape a results body into the local query result format.
    pub fn into_solutions(self) -> Result<SparqlJson, PhyloError> {
        if !self.is_results_json() {
            return Err(PhyloError::SerializationError(format!(
                "response is {}, not SPARQL JSON results",
                self.content_type
            )));
        }
        SparqlJson::from_slice(&self.body)
    }
}

/// HTTP client for federated queries.
#[derive(Clone)]
pub struct FederationClient {
    http: reqwest::Client,
}

impl FederationClient {
    /// Create a client whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PhyloError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PhyloError::ConfigError(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// POST `query` to `endpoint` and return the response verbatim.
    pub async fn dispatch(
        &self,
        endpoint: &str,
        query: &str,
    ) -> Result<FederatedResponse, PhyloError> {
        let fail = |cause: String| PhyloError::Federation {
            endpoint: endpoint.to_string(),
            cause,
        };

        let url = reqwest::Url::parse(endpoint).map_err(|e| fail(format!("invalid URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(fail(format!("unsupported scheme '{}'", url.scheme())));
        }

        let accept = accept_for(query);
        tracing::debug!("Federating query to {} (Accept: {})", endpoint, accept);

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, SPARQL_QUERY)
            .header(ACCEPT, accept)
            .body(query.to_string())
            .send()
            .await
            .map_err(|e| fail(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(fail(format!("HTTP {}: {}", status, excerpt)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(accept)
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| fail(describe(&e)))?
            .to_vec();

        tracing::info!("Federated query to {} returned {} bytes", endpoint, body.len());
        Ok(FederatedResponse { content_type, body })
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("timed out: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}
