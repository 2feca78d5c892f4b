use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rw_core::{Collector, Durations, Snapshot};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::{CLIENT_HEADER, ErrorBody};

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// Routes for one collector.
pub fn router(collector: Arc<Collector>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/clock", get(clock))
        .route("/tick", post(tick))
        .route("/durations", put(put_durations))
        .with_state(collector)
}

/// Serves `collector` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    collector: Arc<Collector>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "collector listening");
    axum::serve(listener, router(collector))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!(%addr, "collector stopped");
    Ok(())
}

fn client_label(headers: &HeaderMap) -> &str {
    headers
        .get(CLIENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous")
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn clock(State(collector): State<Arc<Collector>>, headers: HeaderMap) -> Json<Snapshot> {
    tracing::debug!(client = client_label(&headers), "get");
    Json(collector.get())
}

async fn tick(State(collector): State<Arc<Collector>>, headers: HeaderMap) -> StatusCode {
    let last_activity = collector.tick();
    tracing::debug!(client = client_label(&headers), %last_activity, "tick");
    StatusCode::NO_CONTENT
}

async fn put_durations(
    State(collector): State<Arc<Collector>>,
    headers: HeaderMap,
    Json(durations): Json<Durations>,
) -> Response {
    let client = client_label(&headers);
    match collector.put(durations) {
        Ok(()) => {
            tracing::info!(
                client,
                work_minutes = durations.work_minutes,
                rest_minutes = durations.rest_minutes,
                "durations updated"
            );
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            tracing::warn!(client, error = %e, "rejected durations");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
