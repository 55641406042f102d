use async_trait::async_trait;
use axum::Router;
use gateway::{
    app, provider, AppState, CurrentConditions, DailySeries, ForecastProvider, ForecastSample,
    HourlySeries, LocationIndex,
};
use mockall::mock;
use std::{fs, path::Path, sync::Arc, time::Duration};
use tempfile::TempDir;
use time::macros::{date, datetime};

mock! {
    pub Provider {}
    #[async_trait]
    impl ForecastProvider for Provider {
        async fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastSample, provider::Error>;
    }
}

/// Provider that never answers within any reasonable request timeout
pub struct StalledProvider;

#[async_trait]
impl ForecastProvider for StalledProvider {
    async fn forecast(&self, _: f64, _: f64) -> Result<ForecastSample, provider::Error> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(provider::Error::Request("stalled".to_string()))
    }
}

pub struct TestApp {
    pub app: Router,
    // keeps the shard directory alive for the test's duration
    _data_dir: TempDir,
}

pub const PARIS_WOEID: i64 = 2988507;

pub fn gazetteer_row(id: i64, name: &str, country: &str, admin1: &str, lat: f64, lon: f64) -> String {
    format!(
        "{id}\t{name}\t{name}\t\t{lat}\t{lon}\tP\tPPL\t{country}\t\t{admin1}\t\t\t\t1000\t\t\tUTC\t2024-01-01\n"
    )
}

fn write_shards(dir: &Path) {
    fs::write(
        dir.join("P.txt"),
        [
            gazetteer_row(PARIS_WOEID, "Paris", "FR", "11", 48.85341, 2.3488),
            gazetteer_row(4717560, "Paris", "US", "TX", 33.66094, -95.55551),
            gazetteer_row(2988506, "Pau", "FR", "75", 43.3, -0.37),
        ]
        .concat(),
    )
    .unwrap();
    fs::write(
        dir.join("L.txt"),
        [
            gazetteer_row(2996944, "Lyon", "FR", "84", 45.75, 4.85),
            "2998324\tLille\tbroken row\n".to_string(),
        ]
        .concat(),
    )
    .unwrap();
}

pub async fn spawn_app(provider: Arc<dyn ForecastProvider>) -> TestApp {
    spawn_app_with_timeout(provider, Duration::from_secs(5)).await
}

pub async fn spawn_app_with_timeout(
    provider: Arc<dyn ForecastProvider>,
    request_timeout: Duration,
) -> TestApp {
    let data_dir = tempfile::tempdir().unwrap();
    write_shards(data_dir.path());
    let index = LocationIndex::open(data_dir.path()).await.unwrap();

    TestApp {
        app: app(AppState::new(Arc::new(index), provider, request_timeout)),
        _data_dir: data_dir,
    }
}

/// Eight days and nineteen hours starting Sunday 2024-06-02 in Paris
pub fn forecast_sample() -> ForecastSample {
    let day0 = date!(2024 - 06 - 02);
    let hour0 = datetime!(2024-06-02 10:00);
    let days = 8;
    let hours = 19;
    ForecastSample {
        latitude: 48.86,
        longitude: 2.34,
        timezone: "Europe/Paris".to_string(),
        timezone_abbreviation: "CEST".to_string(),
        current: CurrentConditions {
            time: Some(datetime!(2024-06-02 10:15)),
            temperature: Some(18.4),
            relative_humidity: Some(72.0),
            apparent_temperature: Some(17.0),
            is_day: Some(true),
            weather_code: Some(3),
            wind_speed: Some(11.5),
            wind_direction: Some(250.0),
        },
        hourly: HourlySeries {
            time: (0..hours)
                .map(|i| hour0 + time::Duration::hours(i))
                .collect(),
            temperature: (0..hours).map(|i| Some(15.0 + i as f64)).collect(),
            dew_point: (0..hours).map(|_| Some(9.0)).collect(),
            precipitation_probability: (0..hours).map(|_| Some(40.0)).collect(),
            weather_code: (0..hours).map(|_| Some(61)).collect(),
        },
        daily: DailySeries {
            time: (0..days).map(|i| day0 + time::Duration::days(i)).collect(),
            weather_code: (0..days).map(|_| Some(0)).collect(),
            temperature_max: (0..days).map(|i| Some(20.0 + i as f64)).collect(),
            temperature_min: (0..days).map(|i| Some(10.0 + i as f64)).collect(),
            sunrise: (0..days)
                .map(|i| Some(datetime!(2024-06-02 05:47) + time::Duration::days(i)))
                .collect(),
            sunset: (0..days)
                .map(|i| Some(datetime!(2024-06-02 21:49) + time::Duration::days(i)))
                .collect(),
            precipitation_probability_max: (0..days).map(|_| Some(10.0)).collect(),
        },
    }
}
