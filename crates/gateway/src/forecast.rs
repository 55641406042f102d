//! Request-scoped forecast data shared by the provider and the legacy adapter

use time::{Date, PrimitiveDateTime};

/// Minimal projection of a gazetteer record needed to request a forecast
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Current-conditions snapshot. Fields are optional because the upstream may
/// omit any of them; the adapter decides which ones are required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentConditions {
    pub time: Option<PrimitiveDateTime>,
    pub temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub is_day: Option<bool>,
    pub weather_code: Option<i64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
}

/// Hourly series, index 0 is the current local hour
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlySeries {
    pub time: Vec<PrimitiveDateTime>,
    pub temperature: Vec<Option<f64>>,
    pub dew_point: Vec<Option<f64>>,
    pub precipitation_probability: Vec<Option<f64>>,
    pub weather_code: Vec<Option<i64>>,
}

impl HourlySeries {
    /// Number of hours for which every variable is present
    pub fn len(&self) -> usize {
        [
            self.time.len(),
            self.temperature.len(),
            self.dew_point.len(),
            self.precipitation_probability.len(),
            self.weather_code.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Daily series, index 0 is the current local day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    pub time: Vec<Date>,
    pub weather_code: Vec<Option<i64>>,
    pub temperature_max: Vec<Option<f64>>,
    pub temperature_min: Vec<Option<f64>>,
    pub sunrise: Vec<Option<PrimitiveDateTime>>,
    pub sunset: Vec<Option<PrimitiveDateTime>>,
    pub precipitation_probability_max: Vec<Option<f64>>,
}

impl DailySeries {
    /// Number of days for which every variable is present
    pub fn len(&self) -> usize {
        [
            self.time.len(),
            self.weather_code.len(),
            self.temperature_max.len(),
            self.temperature_min.len(),
            self.sunrise.len(),
            self.sunset.len(),
            self.precipitation_probability_max.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One upstream forecast response. All timestamps are already local wall
/// clock time for the requested coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub timezone_abbreviation: String,
    pub current: CurrentConditions,
    pub hourly: HourlySeries,
    pub daily: DailySeries,
}
