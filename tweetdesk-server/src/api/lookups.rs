use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use tweetdesk_types::{
    ColumnDataResponse, CsvRecord, KolUserIds, RunesQueryResponse, WalletCount,
};

use crate::{
    api::{ApiError, ApiResult},
    filter::{conditions_from_triples, Condition},
    lookups::RunesFilter,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ColumnQuery {
    pub column: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

fn required(value: Option<String>, message: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// GET /kol/userids
pub async fn kol_userids(State(state): State<AppState>) -> Json<KolUserIds> {
    Json(KolUserIds {
        userids: state.lookups.kols.userids().to_vec(),
    })
}

/// GET /runes/distinct_values?column=
pub async fn runes_distinct_values(
    State(state): State<AppState>,
    Query(query): Query<ColumnQuery>,
) -> ApiResult<Json<Vec<String>>> {
    let column = required(query.column, "No column specified")?;
    Ok(Json(state.lookups.runes.distinct_values(&column)))
}

/// GET /runes/query?Name=&Telegram=&X=&DC=
pub async fn runes_query(
    State(state): State<AppState>,
    Query(filter): Query<RunesFilter>,
) -> Json<RunesQueryResponse> {
    let data = state.lookups.runes.query(&filter);
    Json(RunesQueryResponse {
        total_count: data.len(),
        data,
    })
}

/// GET /runes/social_info?name=
pub async fn runes_social_info(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> ApiResult<Json<CsvRecord>> {
    let name = required(query.name, "No name specified")?;
    state
        .lookups
        .runes
        .social_info(&name)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Name not found".to_string()))
}

/// GET /runes/column_data?column=
pub async fn runes_column_data(
    State(state): State<AppState>,
    Query(query): Query<ColumnQuery>,
) -> ApiResult<Json<ColumnDataResponse>> {
    let column = required(query.column, "No column specified")?;
    let data = state.lookups.runes.column_data(&column)?;
    Ok(Json(ColumnDataResponse {
        column,
        total_count: data.len(),
        data,
    }))
}

/// GET /og/unique_values?column=
pub async fn og_unique_values(
    State(state): State<AppState>,
    Query(query): Query<ColumnQuery>,
) -> ApiResult<Json<BTreeMap<String, usize>>> {
    let column = required(query.column, "Column parameter is required")?;
    Ok(Json(state.lookups.og.unique_values(&column)?))
}

/// POST /og/query - Rows matching every condition
pub async fn og_query(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Vec<CsvRecord>>> {
    let conditions = conditions_from_body(&body)?;
    Ok(Json(state.lookups.og.query(&conditions)?))
}

/// POST /og/query_and_sort_wallets - Wallet counts among matching rows
pub async fn og_query_and_sort_wallets(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Vec<WalletCount>>> {
    let conditions = conditions_from_body(&body)?;
    Ok(Json(state.lookups.og.wallet_counts(&conditions)?))
}

/// `conditions` is either a JSON array of triples or a string holding one.
pub fn conditions_from_body(body: &Value) -> ApiResult<Vec<Condition>> {
    let missing = || ApiError::BadRequest("Conditions are required".to_string());

    let triples = match body.get("conditions") {
        Some(Value::Array(items)) if !items.is_empty() => items.clone(),
        Some(Value::String(text)) if !text.trim().is_empty() => {
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(items)) if !items.is_empty() => items,
                Ok(Value::Array(_)) => return Err(missing()),
                _ => {
                    return Err(ApiError::BadRequest(
                        "Conditions must be a JSON array of [column, operator, value]".to_string(),
                    ))
                }
            }
        }
        _ => return Err(missing()),
    };

    Ok(conditions_from_triples(&triples)?)
}
