//! HTTP API.
//!
//! Handlers only read a snapshot of the price table, they never wait for a
//! refresh in progress.

use std::{
    path::PathBuf,
    sync::Arc,
};

use axum::{
    extract::{
        Path,
        State,
    },
    http::StatusCode,
    response::{
        IntoResponse,
        Response,
    },
    routing::{
        get,
        post,
    },
    Json,
    Router,
};
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tower_http::{
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    atomic_swap::AtomicSwap,
    conversion::{
        self,
        ConvertError,
    },
    price_table::PriceTable,
    usage_event::UsageEvent,
};



/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<AtomicSwap<PriceTable>>,
    pub events: mpsc::Sender<UsageEvent>,
}



#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Convert(#[from] ConvertError),
}



#[derive(Serialize)]
struct ErrorBody {
    error: String,
}



impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Convert(ConvertError::NoDataAvailable) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Convert(ConvertError::InvalidAmount) => StatusCode::BAD_REQUEST,
            ApiError::Convert(ConvertError::UnknownSymbol { .. }) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}



pub type ApiResult<T> = Result<T, ApiError>;



#[derive(Deserialize)]
struct ConvertParams {
    from: String,

    #[serde(default)]
    amount: Option<String>,

    #[serde(default)]
    to: Option<String>,
}



#[derive(Serialize)]
struct ConvertResponse {
    result: String,
}



/// GET /api/coins - List available symbols.
async fn list_coins(State(state): State<AppState>) -> Json<Vec<String>> {
    let table = state.table.load();
    Json(conversion::list_symbols(&table))
}



/// GET /api/convert/{from}/{amount}/{to} - amount and to are optional.
async fn convert(State(state): State<AppState>, Path(params): Path<ConvertParams>)
    -> ApiResult<Json<ConvertResponse>>
{
    let table = state.table.load();
    let amount = params.amount.as_deref().unwrap_or("1");

    let result = conversion::convert(&table, &params.from, amount, params.to.as_deref())?;

    Ok(Json(ConvertResponse {
        result,
    }))
}



/// POST /api/log/{key} - Record opaque client usage event.
///
/// Always answers 200 with empty body, telemetry must never break the client.
/// Recording the event itself is left to the storage.
async fn log_event(State(state): State<AppState>, Path(key): Path<String>) -> StatusCode {
    let event = UsageEvent::new(&key);

    if !event.known {
        warn!(%key, "unknown usage event key");
    }

    // Losing telemetry is better than making the client wait for storage.
    if let Err(..) = state.events.try_send(event) {
        warn!(%key, "usage event storage can not keep up, dropping event");
    }

    StatusCode::OK
}



/// Builds API router. Everything outside /api is served from `static_dir`.
pub fn app_router(state: AppState, static_dir: &str) -> Router {
    let static_service = ServeDir::new(PathBuf::from(static_dir));

    Router::new()
        .route("/api/coins", get(list_coins))
        .route("/api/convert/{from}", get(convert))
        .route("/api/convert/{from}/{amount}", get(convert))
        .route("/api/convert/{from}/{amount}/{to}", get(convert))
        .route("/api/log/{key}", post(log_event))
        .with_state(state)
        .fallback_service(static_service)
        .layer(TraceLayer::new_for_http())
}
