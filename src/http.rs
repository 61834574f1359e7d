//! HTTP server for the interactions endpoint and Prometheus metrics.
//!
//! - `POST /interactions`: signed interaction deliveries from the platform
//! - `GET /metrics`: Prometheus text format

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router as HttpRouter};
use cordkit_proto::{Interaction, InteractionKind};
use http::{HeaderMap, StatusCode};
use ring::signature::{ED25519, UnparsedPublicKey};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{Instrument, debug, info, warn};

use crate::dispatch::Router;

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Interaction response types sent back on the HTTP response.
const RESPONSE_PONG: u8 = 1;
const RESPONSE_DEFERRED: u8 = 5;

/// Errors from the interactions endpoint.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("missing header {0}")]
    MissingHeader(&'static str),

    #[error("invalid request signature")]
    BadSignature,

    #[error("malformed interaction: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("unsupported interaction type {0}")]
    Unsupported(InteractionKind),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EndpointError {
    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPublicKey(_) => "invalid_public_key",
            Self::MissingHeader(_) => "missing_header",
            Self::BadSignature => "bad_signature",
            Self::MalformedBody(_) => "malformed_body",
            Self::Unsupported(_) => "unsupported",
            Self::Io(_) => "io",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::MissingHeader(_) | Self::BadSignature => StatusCode::UNAUTHORIZED,
            Self::MalformedBody(_) | Self::Unsupported(_) => StatusCode::BAD_REQUEST,
            Self::InvalidPublicKey(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.error_code(), "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Checks request signatures against the application's public key.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: [u8; 32],
}

impl SignatureVerifier {
    /// Parse a hex-encoded Ed25519 public key.
    pub fn from_hex(public_key: &str) -> Result<Self, EndpointError> {
        let bytes = hex::decode(public_key.trim())
            .map_err(|e| EndpointError::InvalidPublicKey(e.to_string()))?;
        let key: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            EndpointError::InvalidPublicKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self { key })
    }

    /// Verify a hex signature over `timestamp || body`.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature: &str) -> Result<(), EndpointError> {
        let signature = hex::decode(signature).map_err(|_| EndpointError::BadSignature)?;
        if signature.len() != 64 {
            return Err(EndpointError::BadSignature);
        }

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        UnparsedPublicKey::new(&ED25519, &self.key)
            .verify(&message, &signature)
            .map_err(|_| EndpointError::BadSignature)
    }
}

/// Shared state for the endpoint handlers.
pub struct EndpointState {
    verifier: SignatureVerifier,
    router: Arc<Router>,
}

impl EndpointState {
    pub fn new(verifier: SignatureVerifier, router: Arc<Router>) -> Arc<Self> {
        Arc::new(Self { verifier, router })
    }
}

/// Routes served by the endpoint.
pub fn app(state: Arc<EndpointState>) -> HttpRouter {
    HttpRouter::new()
        .route("/interactions", post(interactions_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, EndpointError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(EndpointError::MissingHeader(name))
}

async fn interactions_handler(
    State(state): State<Arc<EndpointState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, EndpointError> {
    let signature = header(&headers, SIGNATURE_HEADER)?;
    let timestamp = header(&headers, TIMESTAMP_HEADER)?;
    if let Err(e) = state.verifier.verify(timestamp, &body, signature) {
        warn!("Rejected interaction with an invalid signature");
        return Err(e);
    }

    let interaction: Interaction = serde_json::from_slice(&body)?;
    crate::metrics::record_interaction(interaction.kind.as_str());

    match interaction.kind {
        InteractionKind::Ping => {
            debug!(interaction = %interaction.id, "Answering ping");
            Ok(Json(json!({ "type": RESPONSE_PONG })))
        }
        InteractionKind::ApplicationCommand => {
            let router = Arc::clone(&state.router);
            let interaction = Arc::new(interaction);
            // Errors are reported through the router's hook.
            tokio::spawn(
                async move {
                    let _ = router.dispatch(interaction).await;
                }
                .in_current_span(),
            );
            Ok(Json(json!({ "type": RESPONSE_DEFERRED })))
        }
        other => Err(EndpointError::Unsupported(other)),
    }
}

/// Serve the endpoint on an already bound listener until it fails.
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<EndpointState>) -> Result<(), EndpointError> {
    info!("Interactions endpoint listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Bind `addr` and serve the endpoint.
///
/// This is a long-running task that should be spawned in the background.
pub async fn run_http_server(addr: SocketAddr, state: Arc<EndpointState>) -> Result<(), EndpointError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, state).await
}
