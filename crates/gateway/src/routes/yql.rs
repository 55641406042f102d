use axum::{
    extract::{Query, State},
    http::HeaderValue,
};
use hyper::{header::CONTENT_TYPE, HeaderMap};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::{gateway, AppState};

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct YqlParams {
    /// Legacy YQL statement, either a location search or a forecast lookup
    pub q: Option<String>,
}

#[utoipa::path(
    get,
    path = "v1/yql",
    params(YqlParams),
    responses(
        (status = OK, description = "Legacy location list or forecast document", content_type = "application/xml", body = String),
        (status = BAD_REQUEST, description = "Missing, malformed or unsupported query"),
        (status = NOT_FOUND, description = "No shard for the search text or no location for the woeid"),
        (status = INTERNAL_SERVER_ERROR, description = "Shard unreadable or forecast could not be rendered"),
        (status = BAD_GATEWAY, description = "Upstream forecast provider failed"),
        (status = GATEWAY_TIMEOUT, description = "Upstream forecast provider timed out")
    ))]
pub async fn yql(
    State(state): State<Arc<AppState>>,
    Query(params): Query<YqlParams>,
) -> Result<(HeaderMap, String), gateway::Error> {
    let body = state
        .gateway
        .handle(params.q.as_deref())
        .await
        .inspect_err(|e| log::warn!("yql query failed ({}): {}", e.status(), e))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/xml; charset=utf-8"),
    );
    Ok((headers, body))
}
