//! HTTP front door: one `/api` route for GET and POST.
//!
//! Parameters come from the JSON body when the request declares a JSON
//! content type, from the query string otherwise. Every answer is HTTP 200
//! with a [`Response`] body; failures are reported in its `errors` field.

use crate::api::{RawParams, Response, Service};
use crate::error::ServiceError;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::routing::get;
use axum::{Json, Router};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Service>,
    /// Upper bound on one engine invocation.
    pub timeout: Duration,
}

impl AppState {
    pub fn new(service: Service, timeout: Duration) -> Self {
        Self { service: Arc::new(service), timeout }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/api", get(handle_api).post(handle_api)).with_state(state)
}

/// Bind `addr` and serve until Ctrl-C or SIGTERM.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await.map_err(|err| {
        error!(addr = %addr, error = %err, "failed to bind");
        err
    })?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown requested");
}

async fn handle_api(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Response> {
    let params = if is_json(&headers) {
        match params_from_json(&body) {
            Ok(params) => params,
            Err(err) => {
                debug!(error = %err, "rejected request body");
                return Json(Response::failure(&err));
            }
        }
    } else {
        query.into_iter().collect()
    };

    Json(process(&state, params).await)
}

/// Run the blocking pipeline off the async workers, bounded by the state's
/// timeout.
async fn process(state: &AppState, params: RawParams) -> Response {
    let service = Arc::clone(&state.service);
    let task = tokio::task::spawn_blocking(move || service.process(&params));

    match tokio::time::timeout(state.timeout, task).await {
        Ok(Ok(response)) => response,
        Ok(Err(join_err)) => {
            let err = if join_err.is_panic() {
                ServiceError::Panic(panic_message(join_err.into_panic()))
            } else {
                ServiceError::Panic(join_err.to_string())
            };
            error!(error = %err, "request processing crashed");
            Response::failure(&err)
        }
        Err(_) => {
            let err = ServiceError::Timeout(state.timeout);
            warn!(timeout = ?state.timeout, "request timed out");
            Response::failure(&err)
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn params_from_json(body: &[u8]) -> Result<RawParams, ServiceError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|err| ServiceError::Body(format!("invalid JSON body: {err}")))?;

    match value {
        serde_json::Value::Object(map) => Ok(RawParams::from_json_object(map)),
        _ => Err(ServiceError::Body("JSON body must be an object".to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "engine panicked".to_string()
    }
}
