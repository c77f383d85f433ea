// src/services/api_server.rs
//! API Server for certificate verification
//!
//! This module provides the REST interface the institute website uses to walk a
//! visitor through certificate verification. Each visitor works in their own
//! verification session:
//! - Create a session
//! - Search by registration number (only a masked name is revealed)
//! - Confirm the holder's full name
//! - Download the verified certificate as a PDF
//! - Reset the session to start over

use crate::error::{FlowError, SessionError};
use crate::models::session::SessionView;
use crate::services::session_store::SessionStore;
use crate::services::verifier::Verifier;
use axum::{
    extract::{Json, Path, State},
    http::{header, header::InvalidHeaderValue, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

// API request and response structures

/// Request payload for searching by registration number
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    registration_no: String,
}

/// Request payload for confirming the holder's full name
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmNameRequest {
    full_name: String,
}

/// Response for session creation
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    session_id: String,
    session: SessionView,
}

/// Error body; carries the session view when the session still exists
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionView>,
}

fn error_response(status: StatusCode, error: String, session: Option<SessionView>) -> Response {
    (status, Json(ErrorResponse { error, session })).into_response()
}

fn session_error(err: SessionError) -> Response {
    let status = match err {
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::Busy => StatusCode::CONFLICT,
    };
    error_response(status, err.to_string(), None)
}

fn flow_error(err: FlowError, session: Option<SessionView>) -> Response {
    let status = match &err {
        FlowError::Validation(_) => StatusCode::BAD_REQUEST,
        FlowError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        FlowError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        FlowError::InvalidTransition { .. } => StatusCode::CONFLICT,
    };
    error_response(status, err.user_message(), session)
}

/// `Content-Disposition` value that always forms a valid header.
fn attachment_disposition(filename: &str) -> HeaderValue {
    let safe: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// API server state containing all service dependencies
pub struct ApiServer {
    /// Runs verification transitions
    verifier: Arc<Verifier>,

    /// Per-visitor verification sessions
    sessions: Arc<SessionStore>,

    /// Website origin allowed to call the API; any origin when unset
    allowed_origin: Option<HeaderValue>,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `verifier` - Verification state machine
    /// * `sessions` - Session registry
    /// * `allowed_origin` - CORS origin of the public website; any origin when `None`
    ///
    /// # Errors
    /// Returns an error if `allowed_origin` is not a valid header value.
    pub fn new(
        verifier: Verifier,
        sessions: SessionStore,
        allowed_origin: Option<&str>,
    ) -> Result<Self, InvalidHeaderValue> {
        let allowed_origin = allowed_origin.map(HeaderValue::from_str).transpose()?;
        Ok(ApiServer {
            verifier: Arc::new(verifier),
            sessions: Arc::new(sessions),
            allowed_origin,
        })
    }

    fn cors(&self) -> CorsLayer {
        let origin = match &self.allowed_origin {
            Some(origin) => AllowOrigin::exact(origin.clone()),
            None => AllowOrigin::from(Any),
        };

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .expose_headers([header::CONTENT_DISPOSITION])
    }

    /// Builds the router with all API routes
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(Self::health_handler))
            .route("/verify/sessions", post(Self::create_session_handler))
            .route("/verify/sessions/:id", get(Self::get_session_handler))
            .route("/verify/sessions/:id/search", post(Self::search_handler))
            .route("/verify/sessions/:id/confirm", post(Self::confirm_handler))
            .route("/verify/sessions/:id/reset", post(Self::reset_handler))
            .route("/verify/sessions/:id/download", get(Self::download_handler))
            .layer(self.cors())
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    ///
    /// # Errors
    /// Returns an error if the address can't be bound or serving fails.
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Verification API listening on http://{}", addr);
        axum::serve(listener, app).await
    }

    /// Liveness probe
    ///
    /// # Endpoint
    /// GET /health
    async fn health_handler() -> impl IntoResponse {
        Json(serde_json::json!({ "status": "ok" }))
    }

    // =====================
    // Session Handlers
    // =====================

    /// Starts a new verification session
    ///
    /// # Endpoint
    /// POST /verify/sessions
    ///
    /// # Responses
    /// - 201 Created: session id and initial view
    async fn create_session_handler(State(state): State<Arc<ApiServer>>) -> impl IntoResponse {
        let (session_id, session) = state.sessions.create();
        (
            StatusCode::CREATED,
            Json(CreateSessionResponse {
                session_id,
                session,
            }),
        )
    }

    /// Returns the current session view
    ///
    /// # Endpoint
    /// GET /verify/sessions/:id
    async fn get_session_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> Response {
        match state.sessions.view(&id) {
            Ok(view) => (StatusCode::OK, Json(view)).into_response(),
            Err(e) => session_error(e),
        }
    }

    /// Resets the session to its initial step
    ///
    /// # Endpoint
    /// POST /verify/sessions/:id/reset
    async fn reset_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> Response {
        match state.sessions.reset(&id) {
            Ok(view) => (StatusCode::OK, Json(view)).into_response(),
            Err(e) => session_error(e),
        }
    }

    // =====================
    // Verification Handlers
    // =====================

    /// Searches for a certificate by registration number
    ///
    /// # Endpoint
    /// POST /verify/sessions/:id/search
    ///
    /// # Request Body
    /// `{ "registrationNo": "..." }`
    ///
    /// # Responses
    /// - 200 OK: updated view (also when nothing was found; see `errorMessage`)
    /// - 400 Bad Request: empty registration number
    /// - 404 Not Found: unknown session
    /// - 409 Conflict: session busy or not in the initial step
    /// - 503 Service Unavailable: record store unreachable
    async fn search_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        Json(payload): Json<SearchRequest>,
    ) -> Response {
        let mut checkout = match state.sessions.checkout(&id) {
            Ok(checkout) => checkout,
            Err(e) => return session_error(e),
        };

        let result = state
            .verifier
            .search(&mut checkout.session, &payload.registration_no)
            .await;
        let view = match state.sessions.commit(checkout) {
            Ok(view) => view,
            Err(e) => return session_error(e),
        };

        match result {
            Ok(_) => (StatusCode::OK, Json(view)).into_response(),
            Err(e) => flow_error(e, Some(view)),
        }
    }

    /// Confirms the certificate holder's full name
    ///
    /// # Endpoint
    /// POST /verify/sessions/:id/confirm
    ///
    /// # Request Body
    /// `{ "fullName": "..." }`
    ///
    /// # Responses
    /// - 200 OK: updated view (also on mismatch; see `errorMessage`)
    /// - 400 Bad Request: empty name
    /// - 404 Not Found: unknown session
    /// - 409 Conflict: session busy or not in the confirm step
    async fn confirm_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        Json(payload): Json<ConfirmNameRequest>,
    ) -> Response {
        let mut checkout = match state.sessions.checkout(&id) {
            Ok(checkout) => checkout,
            Err(e) => return session_error(e),
        };

        let result = state
            .verifier
            .confirm_name(&mut checkout.session, &payload.full_name);
        let view = match state.sessions.commit(checkout) {
            Ok(view) => view,
            Err(e) => return session_error(e),
        };

        match result {
            Ok(_) => (StatusCode::OK, Json(view)).into_response(),
            Err(e) => flow_error(e, Some(view)),
        }
    }

    /// Downloads the verified certificate
    ///
    /// # Endpoint
    /// GET /verify/sessions/:id/download
    ///
    /// # Responses
    /// - 200 OK: `application/pdf` attachment
    /// - 404 Not Found: unknown session
    /// - 409 Conflict: session busy or not verified
    /// - 500 Internal Server Error: rendering failed; safe to retry
    async fn download_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> Response {
        let checkout = match state.sessions.checkout(&id) {
            Ok(checkout) => checkout,
            Err(e) => return session_error(e),
        };

        let result = state.verifier.download(&checkout.session).await;
        let view = match state.sessions.commit(checkout) {
            Ok(view) => view,
            Err(e) => return session_error(e),
        };

        match result {
            Ok(artifact) => (
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static(artifact.content_type)),
                    (header::CONTENT_DISPOSITION, attachment_disposition(&artifact.filename)),
                ],
                artifact.bytes,
            )
                .into_response(),
            Err(e) => flow_error(e, Some(view)),
        }
    }
}

// Implement Clone for ApiServer to use with Axum's State
impl Clone for ApiServer {
    fn clone(&self) -> Self {
        ApiServer {
            verifier: Arc::clone(&self.verifier),
            sessions: Arc::clone(&self.sessions),
            allowed_origin: self.allowed_origin.clone(),
        }
    }
}
