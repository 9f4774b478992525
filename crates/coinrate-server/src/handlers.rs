use axum::extract::{Query, State};
use axum::Json;
use coinrate::market_data::{Aggregation, PriceError};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::{RateDto, RateQuery};
use crate::state::AppState;

/// Split a `fsyms` value into symbols. Entries are trimmed; a missing value or
/// any empty entry is rejected.
pub fn parse_symbols(fsyms: Option<&str>) -> Result<Vec<String>, PriceError> {
    let raw = fsyms
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PriceError::InvalidParameter("fsyms is required".to_string()))?;

    let symbols: Vec<String> = raw.split(',').map(|s| s.trim().to_string()).collect();
    if symbols.iter().any(String::is_empty) {
        return Err(PriceError::InvalidParameter(format!(
            "fsyms contains an empty symbol: {raw:?}"
        )));
    }
    Ok(symbols)
}

async fn serve_rates(
    state: &AppState,
    fsyms: Option<&str>,
    aggregation: Aggregation,
) -> Result<Json<Vec<RateDto>>, ApiError> {
    let symbols = parse_symbols(fsyms)?;
    let observations = state.service.get_or_refresh(&symbols, aggregation).await?;
    let rates = observations
        .iter()
        .map(|obs| RateDto::from_observation(obs, &state.display))
        .collect();
    Ok(Json(rates))
}

pub async fn get_current_rate(
    State(state): State<AppState>,
    Query(query): Query<RateQuery>,
) -> Result<Json<Vec<RateDto>>, ApiError> {
    serve_rates(&state, query.fsyms.as_deref(), Aggregation::Latest).await
}

pub async fn get_min_rate(
    State(state): State<AppState>,
    Query(query): Query<RateQuery>,
) -> Result<Json<Vec<RateDto>>, ApiError> {
    serve_rates(&state, query.fsyms.as_deref(), Aggregation::Min).await
}

pub async fn get_max_rate(
    State(state): State<AppState>,
    Query(query): Query<RateQuery>,
) -> Result<Json<Vec<RateDto>>, ApiError> {
    serve_rates(&state, query.fsyms.as_deref(), Aggregation::Max).await
}

pub async fn get_avg_rate(
    State(state): State<AppState>,
    Query(query): Query<RateQuery>,
) -> Result<Json<Vec<RateDto>>, ApiError> {
    serve_rates(&state, query.fsyms.as_deref(), Aggregation::Avg).await
}

#[derive(Debug, Deserialize)]
pub struct AggregatedRateQuery {
    pub fsyms: Option<String>,
    pub agg: Option<String>,
}

/// `GET /v1/rates?fsyms=BTC&agg=min`; `agg` defaults to latest.
pub async fn get_rates(
    State(state): State<AppState>,
    Query(query): Query<AggregatedRateQuery>,
) -> Result<Json<Vec<RateDto>>, ApiError> {
    let aggregation = match query.agg.as_deref() {
        None => Aggregation::default(),
        Some(raw) => raw
            .parse::<Aggregation>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    };
    serve_rates(&state, query.fsyms.as_deref(), aggregation).await
}

pub async fn health() -> &'static str {
    "ok"
}
