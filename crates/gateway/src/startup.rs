use crate::{
    gateway::QueryGateway,
    health,
    location_index::LocationIndex,
    provider::OpenMeteoClient,
    routes, yql, ForecastProvider, LocationData,
};
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper::{
    header::{ACCEPT, CONTENT_TYPE},
    Method,
};
use log::{info, warn};
use std::{sync::Arc, time::Duration};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub struct AppState {
    pub gateway: QueryGateway,
}

impl AppState {
    pub fn new(
        locations: Arc<dyn LocationData>,
        provider: Arc<dyn ForecastProvider>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            gateway: QueryGateway::new(locations, provider, request_timeout),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(routes::yql::yql, routes::health::health),
    tags(
        (name = "wxshim gateway", description = "legacy weather XML queries answered from gazetteer shards and an upstream forecast API")
    )
)]
struct ApiDoc;

/// Settings needed to wire the gateway's collaborators together
#[derive(Clone, Debug)]
pub struct GatewaySettings {
    pub data_dir: String,
    pub provider_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub retries: u32,
    pub cache_ttl: Duration,
}

pub async fn build_app_state(settings: GatewaySettings) -> Result<AppState, anyhow::Error> {
    let index = LocationIndex::open(&settings.data_dir)
        .await
        .map_err(|e| anyhow!("error opening location shards: {}", e))?;
    if index.is_empty().await {
        warn!("no locations found under {}", settings.data_dir);
    }

    let provider = OpenMeteoClient::new(
        &settings.provider_url,
        &settings.user_agent,
        settings.request_timeout,
        settings.retries,
        settings.cache_ttl,
    )
    .map_err(|e| anyhow!("error setting up forecast client: {}", e))?;

    Ok(AppState::new(
        Arc::new(index),
        Arc::new(provider),
        settings.request_timeout,
    ))
}

pub fn app(app_state: AppState) -> Router {
    let api_docs = ApiDoc::openapi();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/v1/yql", get(yql))
        .route("/health", get(health))
        .with_state(Arc::new(app_state))
        .layer(middleware::from_fn(log_request))
        .merge(Scalar::with_url("/docs", api_docs))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default();
    info!(target: "http_request","new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}

