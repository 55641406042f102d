//! Upstream forecast collaborator: trait seam plus the Open-Meteo client

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use time::{macros::format_description, Date, PrimitiveDateTime};
use tokio::sync::Mutex;

use crate::{CurrentConditions, DailySeries, ForecastSample, HourlySeries};

pub const CURRENT_VARIABLES: [&str; 7] = [
    "temperature_2m",
    "relative_humidity_2m",
    "apparent_temperature",
    "is_day",
    "weather_code",
    "wind_speed_10m",
    "wind_direction_10m",
];
pub const HOURLY_VARIABLES: [&str; 5] = [
    "temperature_2m",
    "dew_point_2m",
    "precipitation_probability",
    "weather_code",
    "visibility",
];
pub const DAILY_VARIABLES: [&str; 6] = [
    "weather_code",
    "temperature_2m_max",
    "temperature_2m_min",
    "sunrise",
    "sunset",
    "precipitation_probability_max",
];
pub const FORECAST_DAYS: u8 = 14;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("forecast request failed: {0}")]
    Request(String),
    #[error("forecast provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid forecast response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastSample, Error>;
}

type CacheKey = (u64, u64);

pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    base_url: String,
    cache_ttl: Duration,
    cache: Mutex<HashMap<CacheKey, (Instant, ForecastSample)>>,
}

impl OpenMeteoClient {
    pub fn new(
        base_url: &str,
        user_agent: &str,
        timeout: Duration,
        max_retries: u32,
        cache_ttl: Duration,
    ) -> Result<Self, Error> {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_ttl,
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn cached(&self, key: CacheKey) -> Option<ForecastSample> {
        let cache = self.cache.lock().await;
        cache
            .get(&key)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.cache_ttl)
            .map(|(_, sample)| sample.clone())
    }

    async fn store(&self, key: CacheKey, sample: ForecastSample) {
        if self.cache_ttl.is_zero() {
            return;
        }
        let mut cache = self.cache.lock().await;
        cache.retain(|_, (stored_at, _)| stored_at.elapsed() < self.cache_ttl);
        cache.insert(key, (Instant::now(), sample));
    }

    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<ForecastSample, Error> {
        let url = format!("{}/v1/forecast", self.base_url);
        let params = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("current", CURRENT_VARIABLES.join(",")),
            ("hourly", HOURLY_VARIABLES.join(",")),
            ("daily", DAILY_VARIABLES.join(",")),
            ("timezone", "auto".to_string()),
            ("forecast_days", FORECAST_DAYS.to_string()),
        ];

        debug!("requesting forecast for {},{}", latitude, longitude);
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        trace!("forecast body: {}", body);

        let wire: WireResponse =
            serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))?;
        ForecastSample::try_from(wire)
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastSample, Error> {
        let key = (latitude.to_bits(), longitude.to_bits());
        if let Some(sample) = self.cached(key).await {
            debug!("forecast cache hit for {},{}", latitude, longitude);
            return Ok(sample);
        }
        let sample = self.fetch(latitude, longitude).await?;
        self.store(key, sample.clone()).await;
        Ok(sample)
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    timezone: String,
    #[serde(default)]
    timezone_abbreviation: String,
    #[serde(default)]
    current: WireCurrent,
    #[serde(default)]
    hourly: WireHourly,
    #[serde(default)]
    daily: WireDaily,
}

#[derive(Debug, Default, Deserialize)]
struct WireCurrent {
    time: Option<String>,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    is_day: Option<f64>,
    weather_code: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    dew_point_2m: Vec<Option<f64>>,
    precipitation_probability: Vec<Option<f64>>,
    weather_code: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireDaily {
    time: Vec<String>,
    weather_code: Vec<Option<f64>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    sunrise: Vec<Option<String>>,
    sunset: Vec<Option<String>>,
    precipitation_probability_max: Vec<Option<f64>>,
}

fn parse_local_time(value: &str) -> Result<PrimitiveDateTime, Error> {
    let minutes = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    let seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    PrimitiveDateTime::parse(value, &minutes)
        .or_else(|_| PrimitiveDateTime::parse(value, &seconds))
        .map_err(|e| Error::Decode(format!("bad timestamp {:?}: {}", value, e)))
}

fn parse_date(value: &str) -> Result<Date, Error> {
    Date::parse(value, &format_description!("[year]-[month]-[day]"))
        .map_err(|e| Error::Decode(format!("bad date {:?}: {}", value, e)))
}

fn to_codes(values: Vec<Option<f64>>) -> Vec<Option<i64>> {
    values
        .into_iter()
        .map(|v| v.map(|c| c.round() as i64))
        .collect()
}

fn parse_optional_times(values: Vec<Option<String>>) -> Result<Vec<Option<PrimitiveDateTime>>, Error> {
    values
        .iter()
        .map(|v| v.as_deref().map(parse_local_time).transpose())
        .collect()
}

impl TryFrom<WireResponse> for ForecastSample {
    type Error = Error;

    fn try_from(val: WireResponse) -> Result<Self, Self::Error> {
        let current = CurrentConditions {
            time: val.current.time.as_deref().map(parse_local_time).transpose()?,
            temperature: val.current.temperature_2m,
            relative_humidity: val.current.relative_humidity_2m,
            apparent_temperature: val.current.apparent_temperature,
            is_day: val.current.is_day.map(|d| d != 0.0),
            weather_code: val.current.weather_code.map(|c| c.round() as i64),
            wind_speed: val.current.wind_speed_10m,
            wind_direction: val.current.wind_direction_10m,
        };

        let hourly = HourlySeries {
            time: val
                .hourly
                .time
                .iter()
                .map(|t| parse_local_time(t))
                .collect::<Result<_, _>>()?,
            temperature: val.hourly.temperature_2m,
            dew_point: val.hourly.dew_point_2m,
            precipitation_probability: val.hourly.precipitation_probability,
            weather_code: to_codes(val.hourly.weather_code),
        };

        let daily = DailySeries {
            time: val
                .daily
                .time
                .iter()
                .map(|d| parse_date(d))
                .collect::<Result<_, _>>()?,
            weather_code: to_codes(val.daily.weather_code),
            temperature_max: val.daily.temperature_2m_max,
            temperature_min: val.daily.temperature_2m_min,
            sunrise: parse_optional_times(val.daily.sunrise)?,
            sunset: parse_optional_times(val.daily.sunset)?,
            precipitation_probability_max: val.daily.precipitation_probability_max,
        };

        Ok(ForecastSample {
            latitude: val.latitude,
            longitude: val.longitude,
            timezone: val.timezone,
            timezone_abbreviation: val.timezone_abbreviation,
            current,
            hourly,
            daily,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BODY: &str = r#"{
        "latitude": 48.86,
        "longitude": 2.3399997,
        "timezone": "Europe/Paris",
        "timezone_abbreviation": "CEST",
        "current": {
            "time": "2024-06-02T10:15",
            "interval": 900,
            "temperature_2m": 18.4,
            "relative_humidity_2m": 72,
            "apparent_temperature": 17.9,
            "is_day": 1,
            "weather_code": 3,
            "wind_speed_10m": 11.2,
            "wind_direction_10m": 247
        },
        "hourly": {
            "time": ["2024-06-02T00:00", "2024-06-02T01:00"],
            "temperature_2m": [14.1, null],
            "dew_point_2m": [9.0, 8.8],
            "precipitation_probability": [0, 15],
            "weather_code": [3, 61],
            "visibility": [24140.0, 24140.0]
        },
        "daily": {
            "time": ["2024-06-02"],
            "weather_code": [61],
            "temperature_2m_max": [21.3],
            "temperature_2m_min": [12.0],
            "sunrise": ["2024-06-02T05:48"],
            "sunset": ["2024-06-02T21:48"],
            "precipitation_probability_max": [68]
        }
    }"#;

    fn client(server: &MockServer, ttl: Duration) -> OpenMeteoClient {
        OpenMeteoClient::new(&server.uri(), "wxshim-test", Duration::from_secs(5), 0, ttl)
            .unwrap()
    }

    #[test]
    fn converts_wire_response() {
        let wire: WireResponse = serde_json::from_str(BODY).unwrap();
        let sample = ForecastSample::try_from(wire).unwrap();

        assert_eq!(sample.timezone_abbreviation, "CEST");
        assert_eq!(sample.current.time, Some(datetime!(2024-06-02 10:15)));
        assert_eq!(sample.current.relative_humidity, Some(72.0));
        assert_eq!(sample.current.is_day, Some(true));
        assert_eq!(sample.current.weather_code, Some(3));
        assert_eq!(sample.hourly.len(), 2);
        assert_eq!(sample.hourly.temperature[1], None);
        assert_eq!(sample.hourly.weather_code[1], Some(61));
        assert_eq!(sample.daily.time, vec![date!(2024 - 06 - 02)]);
        assert_eq!(sample.daily.sunrise[0], Some(datetime!(2024-06-02 05:48)));
    }

    #[test]
    fn rejects_bad_timestamps() {
        let body = BODY.replace("2024-06-02T01:00", "tomorrow");
        let wire: WireResponse = serde_json::from_str(&body).unwrap();
        assert!(matches!(
            ForecastSample::try_from(wire),
            Err(Error::Decode(_))
        ));
    }

    #[tokio::test]
    async fn requests_expected_variables() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "48.85"))
            .and(query_param("longitude", "2.35"))
            .and(query_param("timezone", "auto"))
            .and(query_param("forecast_days", "14"))
            .and(query_param(
                "daily",
                "weather_code,temperature_2m_max,temperature_2m_min,sunrise,sunset,precipitation_probability_max",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .expect(1)
            .mount(&server)
            .await;

        let sample = client(&server, Duration::ZERO)
            .forecast(48.85, 2.35)
            .await
            .unwrap();
        assert_eq!(sample.timezone, "Europe/Paris");
    }

    #[tokio::test]
    async fn caches_responses_per_coordinate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .expect(2)
            .mount(&server)
            .await;

        let provider = client(&server, Duration::from_secs(3600));
        provider.forecast(48.85, 2.35).await.unwrap();
        provider.forecast(48.85, 2.35).await.unwrap();
        provider.forecast(40.71, -74.0).await.unwrap();
    }

    #[tokio::test]
    async fn surfaces_upstream_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad latitude"))
            .mount(&server)
            .await;

        let err = client(&server, Duration::ZERO)
            .forecast(100.0, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn surfaces_undecodable_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server, Duration::ZERO)
            .forecast(1.0, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
