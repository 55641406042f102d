use crate::helpers::{
    forecast_sample, spawn_app, spawn_app_with_timeout, MockProvider, StalledProvider,
    PARIS_WOEID,
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
};
use gateway::provider;
use hyper::{header, Method};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

fn yql_request(q: &str) -> Request<Body> {
    let url = reqwest::Url::parse_with_params("http://localhost/v1/yql", &[("q", q)]).unwrap();
    let uri = format!("{}?{}", url.path(), url.query().unwrap_or_default());
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn search_query(text: &str) -> String {
    format!(r#"select * from partner.weather.locations where query="{text}" and lang="en-US""#)
}

fn forecast_query(woeid: i64) -> String {
    format!("select * from partner.weather.forecasts where woeid={woeid} and unit=\"c\"")
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn idle_provider() -> Arc<MockProvider> {
    let mut provider = MockProvider::new();
    provider.expect_forecast().never();
    Arc::new(provider)
}

#[tokio::test]
async fn location_search_returns_matching_records() {
    let test_app = spawn_app(idle_provider()).await;

    let response = test_app
        .app
        .oneshot(yql_request(&search_query("paris")))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("application/xml"));

    let body = body_text(response).await;
    assert!(body.starts_with("<?xml"));
    assert!(body.contains(r#"yahoo:count="2""#));
    assert!(body.contains(r#"woeid="2988507""#));
    assert!(body.contains(r#"woeid="4717560""#));
    assert!(body.contains(r#"state="TX""#));
    assert!(!body.contains("Pau"));
}

#[tokio::test]
async fn location_search_without_hits_is_an_empty_result() {
    let test_app = spawn_app(idle_provider()).await;

    let response = test_app
        .app
        .oneshot(yql_request(&search_query("Pxyz")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(r#"yahoo:count="0""#));
    assert!(!body.contains("<location"));
}

#[tokio::test]
async fn location_search_for_missing_shard_is_not_found() {
    let test_app = spawn_app(idle_provider()).await;

    let response = test_app
        .app
        .oneshot(yql_request(&search_query("Berlin")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "No data file for letter 'B'");
}

#[tokio::test]
async fn location_search_over_corrupt_row_is_server_error() {
    let test_app = spawn_app(idle_provider()).await;

    let response = test_app
        .app
        .oneshot(yql_request(&search_query("Lille")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn bad_queries_are_rejected() {
    let test_app = spawn_app(idle_provider()).await;

    let missing = Request::builder()
        .uri("/v1/yql")
        .body(Body::empty())
        .unwrap();
    let response = test_app.app.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Missing query parameter");

    let response = test_app
        .app
        .clone()
        .oneshot(yql_request("select * from weather.bylocation"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Unsupported query type");

    let response = test_app
        .app
        .clone()
        .oneshot(yql_request(&search_query("")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = test_app
        .app
        .oneshot(yql_request("select * from partner.weather.forecasts where woeid=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forecast_renders_legacy_document() {
    let mut provider = MockProvider::new();
    provider
        .expect_forecast()
        .withf(|lat, lon| *lat == 48.85341 && *lon == 2.3488)
        .times(1)
        .returning(|_, _| Ok(forecast_sample()));
    let test_app = spawn_app(Arc::new(provider)).await;

    let response = test_app
        .app
        .oneshot(yql_request(&forecast_query(PARIS_WOEID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.starts_with("<query "));
    assert!(body.contains(r#"yahoo:created="2012-10-30T11:36:42Z""#));
    assert!(body.contains(r#"city="Paris""#));
    assert!(body.contains(r#"country="Europe/Paris""#));
    assert!(body.contains(r#"locationID="ASXX0075""#));
    // `temp` carries the apparent temperature like feelsLike
    assert!(body.contains(r#"temp="17.0""#));
    assert!(!body.contains(r#"temp="18.4""#));
    assert!(body.contains(r#"feelsLike="17.0""#));
    assert!(body.contains(r#"sunrise="05:47 AM""#));
    assert!(body.contains(r#"sunset24="21:49""#));
    // first forecast day is Tuesday, temperatures taken from Monday
    assert!(body.contains(r#"<day dayOfWeek="2" poP="">"#));
    assert!(body.contains(r#"high="21.0" low="11.0""#));
    assert_eq!(body.matches("<day ").count(), 6);
    // hourly block starts seven hours after the current hour
    assert!(body.contains(r#"<hour time24="17:00">"#));
    assert!(body.contains(r#"code="11" poP="40.0" temp="22.0""#));
    assert_eq!(body.matches("<hour ").count(), 12);
}

#[tokio::test]
async fn forecast_for_unknown_woeid_is_not_found() {
    let test_app = spawn_app(idle_provider()).await;

    let response = test_app
        .app
        .oneshot(yql_request(&forecast_query(1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_text(response).await,
        "No matching WOEID 1 found in data files"
    );
}

#[tokio::test]
async fn provider_failure_is_bad_gateway() {
    let mut provider = MockProvider::new();
    provider.expect_forecast().times(1).returning(|_, _| {
        Err(provider::Error::Status {
            status: 503,
            body: "upstream down".to_string(),
        })
    });
    let test_app = spawn_app(Arc::new(provider)).await;

    let response = test_app
        .app
        .oneshot(yql_request(&forecast_query(PARIS_WOEID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn short_forecast_is_server_error() {
    let mut provider = MockProvider::new();
    provider.expect_forecast().times(1).returning(|_, _| {
        let mut sample = forecast_sample();
        sample.daily.time.truncate(5);
        Ok(sample)
    });
    let test_app = spawn_app(Arc::new(provider)).await;

    let response = test_app
        .app
        .oneshot(yql_request(&forecast_query(PARIS_WOEID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn stalled_provider_times_out() {
    let test_app =
        spawn_app_with_timeout(Arc::new(StalledProvider), Duration::from_millis(50)).await;

    let response = test_app
        .app
        .oneshot(yql_request(&forecast_query(PARIS_WOEID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn health_probe_answers_ok() {
    let test_app = spawn_app(idle_provider()).await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = test_app.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}
