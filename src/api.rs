//! JSON HTTP surface for the web and mobile front ends.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::models::{
    CalculationResult, Card, PaymentSuggestion, SUGGESTED_PAYMENT_METHODS, SpendingSuggestion,
    Transaction,
};
use crate::{
    Error, calculate_card_reward, db, rank_cards, suggest_payment_method, suggest_spending_target,
};

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> crate::Result<T>) -> Result<T, ApiError> {
        let conn = self.db.lock().map_err(|_| ApiError::LockPoisoned)?;
        Ok(f(&conn)?)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Engine(Error),
    LockPoisoned,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Engine(Error::InvalidInput(msg)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, format!("invalid input: {msg}"))
            }
            ApiError::Engine(Error::CardNotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("card not found: {id}"))
            }
            ApiError::Engine(err) => {
                error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            ApiError::LockPoisoned => {
                error!("database lock poisoned");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub card_id: String,
    pub transaction: Transaction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalculateResponse<'a> {
    #[serde(flatten)]
    result: CalculationResult<'a>,
    suggestion: Option<PaymentSuggestion>,
    spending_suggestion: Option<SpendingSuggestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    pub transaction: Transaction,
    /// Restricts the ranking to these cards, in this order
    #[serde(default)]
    pub card_ids: Option<Vec<String>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/cards", get(list_cards).post(upsert_card))
        .route("/api/cards/:id", delete(remove_card))
        .route("/api/calculate", post(calculate))
        .route("/api/rank", post(rank))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn list_cards(State(state): State<AppState>) -> Result<Json<Vec<Card>>, ApiError> {
    let cards = state.with_conn(db::list_cards)?;
    Ok(Json(cards))
}

async fn upsert_card(
    State(state): State<AppState>,
    Json(card): Json<Card>,
) -> Result<Json<Card>, ApiError> {
    state.with_conn(|conn| db::upsert_card(conn, &card))?;
    Ok(Json(card))
}

async fn remove_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.with_conn(|conn| db::remove_card(conn, &id))? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::CardNotFound(id).into())
    }
}

async fn calculate(
    State(state): State<AppState>,
    Json(req): Json<CalculateRequest>,
) -> Result<Response, ApiError> {
    let card = state
        .with_conn(|conn| db::get_card(conn, &req.card_id))?
        .ok_or_else(|| Error::CardNotFound(req.card_id.clone()))?;

    let result = calculate_card_reward(&card, &req.transaction)?;
    let suggestion = suggest_payment_method(&card, &req.transaction, SUGGESTED_PAYMENT_METHODS)?;
    let spending_suggestion = suggest_spending_target(&card, &req.transaction)?;
    Ok(Json(CalculateResponse {
        result,
        suggestion,
        spending_suggestion,
    })
    .into_response())
}

async fn rank(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<Response, ApiError> {
    let catalog = state.with_conn(db::list_cards)?;
    let selected: Vec<&Card> = match &req.card_ids {
        Some(ids) => ids
            .iter()
            .filter_map(|id| catalog.iter().find(|c| &c.id == id))
            .collect(),
        None => catalog.iter().collect(),
    };

    let results = rank_cards(selected, &req.transaction)?;
    Ok(Json(results).into_response())
}
