use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use tweetdesk_types::{InscriptionRecord, InscriptionStats, InscriptionView, RankedWallet, WalletCount};

use crate::{
    api::{ApiError, ApiResult},
    db::repositories::InscriptionRepository,
    filter::{parse_conditions, Condition},
    rootverse::{image_url, to_view},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ColumnQuery {
    pub column: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConditionsQuery {
    pub conditions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RankedQuery {
    pub min_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub subrace: Option<String>,
}

fn required_conditions(query: &ConditionsQuery) -> ApiResult<Vec<Condition>> {
    match query.conditions.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(parse_conditions(text)?),
        _ => Err(ApiError::BadRequest("No conditions specified".to_string())),
    }
}

/// GET /rootverse/distinct_values?column=
pub async fn distinct_values(
    State(state): State<AppState>,
    Query(query): Query<ColumnQuery>,
) -> ApiResult<Json<BTreeMap<String, i64>>> {
    let column = query
        .column
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No column specified".to_string()))?;

    let repo = InscriptionRepository::new(state.count_db.pool.clone());
    Ok(Json(repo.distinct_values(&column)?))
}

/// GET /rootverse/query?conditions=
pub async fn query(
    State(state): State<AppState>,
    Query(query): Query<ConditionsQuery>,
) -> ApiResult<Json<Vec<InscriptionView>>> {
    let conditions = required_conditions(&query)?;
    let repo = InscriptionRepository::new(state.count_db.pool.clone());
    let views = repo
        .query(&conditions)?
        .into_iter()
        .map(|record| to_view(record, &state.lookups.pfp))
        .collect();
    Ok(Json(views))
}

/// GET /rootverse/wallet_count?conditions=
pub async fn wallet_count(
    State(state): State<AppState>,
    Query(query): Query<ConditionsQuery>,
) -> ApiResult<Json<Vec<WalletCount>>> {
    let conditions = required_conditions(&query)?;
    let repo = InscriptionRepository::new(state.count_db.pool.clone());
    Ok(Json(repo.wallet_count(&conditions)?))
}

/// GET /rootverse/ranked_wallets?min_count=
pub async fn ranked_wallets(
    State(state): State<AppState>,
    Query(query): Query<RankedQuery>,
) -> ApiResult<Json<Vec<RankedWallet>>> {
    let repo = InscriptionRepository::new(state.count_db.pool.clone());
    Ok(Json(repo.ranked_wallets(query.min_count)?))
}

/// GET /rootverse/stats?subrace=
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<InscriptionStats>> {
    let repo = InscriptionRepository::new(state.count_db.pool.clone());
    let subrace_count = match query.subrace.as_deref() {
        Some(subrace) => Some(repo.subrace_count(subrace)?),
        None => None,
    };

    Ok(Json(InscriptionStats {
        total_rows: repo.row_count()?,
        distinct_wallets: repo.distinct_count("wallet")?,
        subrace: query.subrace,
        subrace_count,
    }))
}

/// GET /rootverse/root/:inscription_id
pub async fn root(
    State(state): State<AppState>,
    Path(inscription_id): Path<String>,
) -> ApiResult<Json<InscriptionRecord>> {
    let repo = InscriptionRepository::new(state.count_db.pool.clone());
    repo.by_inscription(&inscription_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Inscription {} not found", inscription_id)))
}

/// GET /rootverse/root/PFP/inscriptions/:inscription_id - Redirect to the image
pub async fn pfp_by_inscription(
    State(state): State<AppState>,
    Path(inscription_id): Path<String>,
) -> ApiResult<Response> {
    let repo = InscriptionRepository::new(state.count_db.pool.clone());
    let record = repo
        .by_inscription(&inscription_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Inscription {} not found", inscription_id)))?;
    redirect_to_image(&state, &record)
}

/// GET /rootverse/root/PFP/nums/:num - Redirect to the image
pub async fn pfp_by_number(
    State(state): State<AppState>,
    Path(num): Path<String>,
) -> ApiResult<Response> {
    let number: i64 = num
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid inscription number '{}'", num)))?;

    let repo = InscriptionRepository::new(state.count_db.pool.clone());
    let record = repo
        .by_number(number)?
        .ok_or_else(|| ApiError::NotFound(format!("Inscription #{} not found", number)))?;
    redirect_to_image(&state, &record)
}

fn redirect_to_image(state: &AppState, record: &InscriptionRecord) -> ApiResult<Response> {
    image_url(record, &state.lookups.pfp)
        .map(|url| (StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
        .ok_or_else(|| ApiError::NotFound(format!("No image for inscription #{}", record.number)))
}
