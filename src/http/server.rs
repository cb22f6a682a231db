use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::routing::post;
use tower_http::cors::{Any, CorsLayer};

use super::params::{LogParams, StatusBody};
use crate::error::IngestError;
use crate::ingest::AnswerIngestService;

#[derive(Clone)]
struct AppState {
    ingest: Arc<AnswerIngestService>,
}

/// Routes for the answer ingress, with permissive CORS on every response.
pub fn router(ingest: Arc<AnswerIngestService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::POST, Method::OPTIONS]);

    Router::new()
        .route("/log", post(log_answer).options(options_ok))
        .layer(cors)
        .with_state(AppState { ingest })
}

async fn options_ok() -> Json<StatusBody> {
    Json(StatusBody {
        status: "ok".to_string(),
        message: None,
        response: None,
    })
}

/// Receive a question, generate and patch the answer, and report the outcome.
///
/// The ingest itself blocks (network call, file I/O), so it runs on the
/// blocking pool.
async fn log_answer(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<StatusBody>) {
    let params: LogParams = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!("rejected /log payload: {err}");
            return error(format!("invalid JSON payload: {err}"));
        }
    };

    let request = params.into_request();
    let ingest = Arc::clone(&state.ingest);
    let outcome = tokio::task::spawn_blocking(move || ingest.ingest(&request)).await;

    match outcome {
        Ok(Ok(receipt)) => (
            StatusCode::OK,
            Json(StatusBody {
                status: "success".to_string(),
                message: Some("Request logged and document updated".to_string()),
                response: Some(receipt.answer),
            }),
        ),
        Ok(Err(IngestError::AlreadyBusy)) => (
            StatusCode::OK,
            Json(StatusBody::new(
                "busy",
                "another answer is still being processed; request dropped",
            )),
        ),
        Ok(Err(err)) => {
            tracing::warn!("error logging request: {err}");
            error(err.to_string())
        }
        Err(err) => error(format!("ingest task failed: {err}")),
    }
}

fn error(message: String) -> (StatusCode, Json<StatusBody>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StatusBody::new("error", message)),
    )
}
