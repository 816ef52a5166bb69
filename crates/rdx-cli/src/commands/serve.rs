use anyhow::Result;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use rdx_config::Config;
use rdx_core::{DocumentRef, RedactedContent, RedactionRequest, Requester};
use rdx_engine::DocumentRedactor;
use rdx_storage::Storage;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::commands::build_redactor;

struct AppState {
    redactor: DocumentRedactor,
    default_fields: Vec<String>,
    trust_forwarded_for: bool,
}

impl AppState {
    fn new(config: &Config, storage: &Storage) -> Self {
        Self {
            redactor: build_redactor(config, storage),
            default_fields: config.redaction.sensitive_fields.clone(),
            trust_forwarded_for: config.server.trust_forwarded_for,
        }
    }
}

#[derive(Deserialize)]
struct RedactQuery {
    document_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    tenant: Option<String>,
    #[serde(default)]
    version: Option<String>,
    /// Comma-separated JSON keys to black out
    #[serde(default)]
    fields: Option<String>,
}

pub async fn handle(config: &Config, storage: &Storage, host: String, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(config, storage));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_info))
        .route("/api/documents/:document_id/redact", post(api_redact))
        .route("/api/rules/cache", delete(api_clear_cache))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    info!("rdx listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// GET / - health check
async fn handle_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "rdx",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /api/documents/:document_id/redact - body is the document itself
async fn api_redact(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
    Query(query): Query<RedactQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut document = DocumentRef::new(document_id, query.document_type);
    document.document_subtype = query.subtype;
    document.tenant_id = query.tenant;
    document.version_id = query.version;

    let fields = match query.fields {
        Some(list) => parse_fields(&list),
        None => state.default_fields.clone(),
    };

    let request = RedactionRequest::new(document, content_type, body.to_vec())
        .with_sensitive_fields(fields)
        .with_requester(requester_from_headers(
            &headers,
            peer,
            state.trust_forwarded_for,
        ));

    let result = state.redactor.redact(request).await;

    let body = match result.content {
        RedactedContent::Structured(value) => value.to_string().into_bytes(),
        other => other.into_bytes(),
    };
    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, result.content_type.clone())],
        body,
    )
        .into_response();

    let out = response.headers_mut();
    out.insert("x-rdx-matches-found", HeaderValue::from(result.matches_found));
    out.insert(
        "x-rdx-patterns-applied",
        HeaderValue::from(result.patterns_applied),
    );
    out.insert(
        "x-rdx-execution-time-ms",
        HeaderValue::from(result.execution_time_ms),
    );
    if let Some(warning) = result.warning {
        if let Ok(value) = HeaderValue::from_str(&warning) {
            out.insert("x-rdx-warning", value);
        }
    }

    response
}

/// DELETE /api/rules/cache - drop every cached rule set
async fn api_clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.redactor.rule_cache().clear();
    info!("Rule cache cleared");
    StatusCode::NO_CONTENT
}

fn parse_fields(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Requester identity. The IP is the peer address unless the server sits
/// behind a proxy trusted to set `X-Forwarded-For`.
fn requester_from_headers(
    headers: &HeaderMap,
    peer: SocketAddr,
    trust_forwarded_for: bool,
) -> Requester {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let forwarded = if trust_forwarded_for {
        header_str("x-forwarded-for")
    } else {
        None
    };
    let ip = forwarded
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| peer.ip().to_string());

    Requester {
        token_id: header_str("x-requester-token"),
        ip: Some(ip),
        user_agent: header_str(header::USER_AGENT.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rdx_core::RulePattern;
    use rdx_storage::NewRule;

    const PEER: &str = "10.1.2.3:5555";

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo(PEER.parse().unwrap())
    }

    fn query(fields: Option<&str>) -> Query<RedactQuery> {
        Query(RedactQuery {
            document_type: "510k".to_string(),
            subtype: None,
            tenant: None,
            version: Some("v1".to_string()),
            fields: fields.map(str::to_string),
        })
    }

    fn content_type(mime: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
        headers
    }

    async fn state() -> (Arc<AppState>, Storage) {
        let storage = Storage::in_memory().await.unwrap();
        let state = Arc::new(AppState::new(&Config::default(), &storage));
        (state, storage)
    }

    async fn post(
        state: &Arc<AppState>,
        fields: Option<&str>,
        headers: HeaderMap,
        body: &'static [u8],
    ) -> Response {
        api_redact(
            State(Arc::clone(state)),
            Path("doc-1".to_string()),
            query(fields),
            peer(),
            headers,
            Bytes::from_static(body),
        )
        .await
    }

    fn header_of<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    async fn body_of(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_redact_text_reports_stats_in_headers() {
        let (state, storage) = state().await;

        let response = post(
            &state,
            None,
            content_type("text/plain"),
            b"Contact Dr. Jane Roe at jane.roe@example.com or 555-123-4567",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_of(&response, "content-type"), Some("text/plain"));
        assert_eq!(header_of(&response, "x-rdx-matches-found"), Some("3"));
        assert_eq!(header_of(&response, "x-rdx-patterns-applied"), Some("5"));
        assert!(header_of(&response, "x-rdx-execution-time-ms").is_some());
        assert!(header_of(&response, "x-rdx-warning").is_none());

        let body = String::from_utf8(body_of(response).await).unwrap();
        assert_eq!(
            body,
            "Contact [REDACTED-NAME] at [REDACTED-EMAIL] or [REDACTED-PHONE]"
        );

        let activity = storage.activity_for("doc-1").await.unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].requester_ip.as_deref(), Some("10.1.2.3"));
        assert_eq!(activity[0].version_id.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_unsupported_type_passes_through() {
        let (state, _storage) = state().await;
        let png: &'static [u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a];

        let response = post(&state, None, content_type("image/png"), png).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_of(&response, "content-type"), Some("image/png"));
        assert_eq!(header_of(&response, "x-rdx-matches-found"), Some("0"));
        assert!(header_of(&response, "x-rdx-warning").is_some());
        assert_eq!(body_of(response).await, png);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_unsupported() {
        let (state, _storage) = state().await;

        let response = post(&state, None, HeaderMap::new(), b"SSN 123-45-6789").await;

        assert_eq!(
            header_of(&response, "content-type"),
            Some("application/octet-stream")
        );
        assert_eq!(body_of(response).await, b"SSN 123-45-6789");
    }

    #[tokio::test]
    async fn test_default_fields_come_from_config() {
        let (state, _storage) = state().await;

        let response = post(
            &state,
            None,
            content_type("application/json"),
            br#"{"ssn":"x","note":"y"}"#,
        )
        .await;

        assert_eq!(header_of(&response, "x-rdx-matches-found"), Some("1"));
        assert_eq!(
            body_of(response).await,
            br#"{"ssn":"[REDACTED]","note":"y"}"#
        );
    }

    #[tokio::test]
    async fn test_fields_query_overrides_config() {
        let (state, _storage) = state().await;

        let response = post(
            &state,
            Some("note"),
            content_type("application/json"),
            br#"{"ssn":"x","note":"y"}"#,
        )
        .await;

        assert_eq!(
            body_of(response).await,
            br#"{"ssn":"x","note":"[REDACTED]"}"#
        );
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let (state, storage) = state().await;
        let body: &'static [u8] = b"Project Falcon";

        let response = post(&state, None, content_type("text/plain"), body).await;
        assert_eq!(body_of(response).await, body);

        storage
            .add_rule(&NewRule::for_type(
                "510k",
                RulePattern::literal("Falcon", "[CODENAME]"),
            ))
            .await
            .unwrap();

        // Defaults stay cached until the cache is cleared
        let response = post(&state, None, content_type("text/plain"), body).await;
        assert_eq!(body_of(response).await, body);

        let status = api_clear_cache(State(Arc::clone(&state))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.redactor.rule_cache().is_empty());

        let response = post(&state, None, content_type("text/plain"), body).await;
        assert_eq!(header_of(&response, "x-rdx-patterns-applied"), Some("1"));
        assert_eq!(body_of(response).await, b"Project [CODENAME]");
    }

    #[test]
    fn test_parse_fields() {
        assert_eq!(parse_fields("ssn, dob,,password "), vec!["ssn", "dob", "password"]);
        assert!(parse_fields("").is_empty());
    }

    fn proxied_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-requester-token", HeaderValue::from_static("tok-abc"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("reviewer-ui/2"));
        headers
    }

    #[test]
    fn test_forwarded_for_ignored_by_default() {
        let requester = requester_from_headers(&proxied_headers(), PEER.parse().unwrap(), false);

        assert_eq!(requester.ip.as_deref(), Some("10.1.2.3"));
        assert_eq!(requester.token_id.as_deref(), Some("tok-abc"));
        assert_eq!(requester.user_agent.as_deref(), Some("reviewer-ui/2"));
    }

    #[test]
    fn test_forwarded_for_used_when_trusted() {
        let requester = requester_from_headers(&proxied_headers(), PEER.parse().unwrap(), true);

        assert_eq!(requester.ip.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_trusted_without_header_falls_back_to_peer() {
        let requester = requester_from_headers(&HeaderMap::new(), PEER.parse().unwrap(), true);

        assert_eq!(requester.ip.as_deref(), Some("10.1.2.3"));
        assert!(requester.token_id.is_none());
    }
}
