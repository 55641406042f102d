//! Translation of an upstream forecast into the legacy weather document.
//!
//! The legacy clients read fixed positions out of the upstream series rather
//! than dates, so every position used here is a named constant.

use time::{Date, PrimitiveDateTime};

use super::codes::{
    day_of_week, format_decimal, format_time_12h, format_time_24h, precipitation_display,
    translate_weather_code,
};
use super::xml::XmlDoc;
use super::{write_meta_block, Error, YAHOO_LANG, YAHOO_NAMESPACE};
use crate::{ForecastSample, ResolvedLocation};

/// Daily index whose sunrise and sunset are shown with current conditions
pub const CURRENT_SUN_DAY: usize = 1;
/// First daily index of the forecast block
pub const FORECAST_FIRST_DAY: usize = 2;
/// Days in the forecast block
pub const FORECAST_DAY_COUNT: usize = 6;
/// High/low of a forecast day are read this many positions before the day itself
pub const FORECAST_TEMPERATURE_LAG: usize = 1;
/// Display-only probability of precipitation for the forecast days. Legacy
/// clients expect this exact ramp; it is not derived from upstream data.
pub const FORECAST_POP_PLACEHOLDER: [&str; FORECAST_DAY_COUNT] =
    ["", "20", "40", "60", "80", "100"];
/// First hourly index of the hourly block
pub const HOURLY_FIRST_HOUR: usize = 7;
/// Hours in the hourly block
pub const HOURLY_COUNT: usize = 12;

pub const MIN_DAILY_SAMPLES: usize = FORECAST_FIRST_DAY + FORECAST_DAY_COUNT;
pub const MIN_HOURLY_SAMPLES: usize = HOURLY_FIRST_HOUR + HOURLY_COUNT;

const DOCUMENT_CREATED: &str = "2012-10-30T11:36:42Z";
const LOCATION_ID: &str = "ASXX0075";
const BAROMETER: &str = "1005";
const EXTENDED_FORECAST_URL: &str = "https://notdbrand.com";

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyCurrent {
    pub temp: String,
    pub feels_like: String,
    pub percent_humidity: i64,
    pub sunrise: String,
    pub sunrise24: String,
    pub sunset: String,
    pub sunset24: String,
    pub time: String,
    pub time24: String,
    pub wind_direction_degree: String,
    pub wind_speed: String,
    pub code: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyDay {
    pub day_of_week: u8,
    pub pop: &'static str,
    pub high: String,
    pub low: String,
    pub code: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyHour {
    pub time24: String,
    pub code: i64,
    pub pop: String,
    pub temp: String,
}

/// Fully translated forecast, ready to be written as XML
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyForecast {
    pub woeid: i64,
    pub city: String,
    pub country: String,
    pub latitude: String,
    pub longitude: String,
    pub timezone: String,
    pub current: LegacyCurrent,
    pub days: Vec<LegacyDay>,
    pub hours: Vec<LegacyHour>,
}

/// Maps an upstream sample onto the legacy fields. Pure: no clock, no I/O.
pub fn translate(
    location: &ResolvedLocation,
    sample: &ForecastSample,
) -> Result<LegacyForecast, Error> {
    if sample.daily.len() < MIN_DAILY_SAMPLES {
        return Err(Error::InsufficientData {
            series: "daily",
            needed: MIN_DAILY_SAMPLES,
            got: sample.daily.len(),
        });
    }
    if sample.hourly.len() < MIN_HOURLY_SAMPLES {
        return Err(Error::InsufficientData {
            series: "hourly",
            needed: MIN_HOURLY_SAMPLES,
            got: sample.hourly.len(),
        });
    }

    Ok(LegacyForecast {
        woeid: location.id,
        city: location.name.clone(),
        country: sample.timezone.clone(),
        latitude: format_decimal(sample.latitude),
        longitude: format_decimal(sample.longitude),
        timezone: sample.timezone_abbreviation.clone(),
        current: translate_current(sample)?,
        days: translate_days(sample)?,
        hours: translate_hours(sample)?,
    })
}

fn translate_current(sample: &ForecastSample) -> Result<LegacyCurrent, Error> {
    let current = &sample.current;
    let daily = &sample.daily;
    let time = required(current.time, "current.time")?;
    let sunrise = required(daily.sunrise[CURRENT_SUN_DAY], "daily.sunrise")?;
    let sunset = required(daily.sunset[CURRENT_SUN_DAY], "daily.sunset")?;

    // legacy clients always received the apparent temperature as `temp`
    let apparent = format_decimal(required(
        current.apparent_temperature,
        "current.apparent_temperature",
    )?);

    Ok(LegacyCurrent {
        temp: apparent.clone(),
        feels_like: apparent,
        percent_humidity: required(current.relative_humidity, "current.relative_humidity_2m")?
            .trunc() as i64,
        sunrise: format_time_12h(sunrise),
        sunrise24: format_time_24h(sunrise),
        sunset: format_time_12h(sunset),
        sunset24: format_time_24h(sunset),
        time: format_time_12h(time),
        time24: format_time_24h(time),
        wind_direction_degree: format_decimal(required(
            current.wind_direction,
            "current.wind_direction_10m",
        )?),
        wind_speed: format_decimal(required(current.wind_speed, "current.wind_speed_10m")?),
        code: translate_weather_code(required(current.weather_code, "current.weather_code")?),
    })
}

fn translate_days(sample: &ForecastSample) -> Result<Vec<LegacyDay>, Error> {
    let daily = &sample.daily;
    (0..FORECAST_DAY_COUNT)
        .map(|slot| {
            let day = FORECAST_FIRST_DAY + slot;
            let temps = day - FORECAST_TEMPERATURE_LAG;
            let date: Date = daily.time[day];
            Ok(LegacyDay {
                day_of_week: day_of_week(date),
                pop: FORECAST_POP_PLACEHOLDER[slot],
                high: format_decimal(required(
                    daily.temperature_max[temps],
                    "daily.temperature_2m_max",
                )?),
                low: format_decimal(required(
                    daily.temperature_min[temps],
                    "daily.temperature_2m_min",
                )?),
                code: translate_weather_code(required(
                    daily.weather_code[day],
                    "daily.weather_code",
                )?),
            })
        })
        .collect()
}

fn translate_hours(sample: &ForecastSample) -> Result<Vec<LegacyHour>, Error> {
    let hourly = &sample.hourly;
    (HOURLY_FIRST_HOUR..HOURLY_FIRST_HOUR + HOURLY_COUNT)
        .map(|hour| {
            let at: PrimitiveDateTime = hourly.time[hour];
            Ok(LegacyHour {
                time24: format_time_24h(at),
                code: translate_weather_code(required(
                    hourly.weather_code[hour],
                    "hourly.weather_code",
                )?),
                pop: precipitation_display(hourly.precipitation_probability[hour]),
                temp: format_decimal(required(
                    hourly.temperature[hour],
                    "hourly.temperature_2m",
                )?),
            })
        })
        .collect()
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, Error> {
    value.ok_or_else(|| Error::MalformedInput(field.to_string()))
}

impl LegacyForecast {
    pub fn to_xml(&self) -> Result<String, Error> {
        let woeid = self.woeid.to_string();
        let mut doc = XmlDoc::new();

        doc.open(
            "query",
            &[
                ("xmlns:yahoo", YAHOO_NAMESPACE),
                ("yahoo:count", "2"),
                ("yahoo:created", DOCUMENT_CREATED),
                ("yahoo:lang", YAHOO_LANG),
            ],
        )?;
        write_meta_block(&mut doc)?;
        write_meta_block(&mut doc)?;

        doc.open("results", &[])?;

        doc.open("results", &[])?;
        doc.open(
            "location",
            &[
                ("city", self.city.as_str()),
                ("country", self.country.as_str()),
                ("latitude", self.latitude.as_str()),
                ("locationID", LOCATION_ID),
                ("longitude", self.longitude.as_str()),
                ("state", ""),
                ("woeid", woeid.as_str()),
            ],
        )?;
        self.write_currently(&mut doc)?;
        self.write_days(&mut doc)?;
        doc.close("location")?;
        doc.close("results")?;

        doc.open("results", &[])?;
        doc.open("location", &[("woeid", woeid.as_str())])?;
        self.write_hours(&mut doc)?;
        doc.close("location")?;
        doc.close("results")?;

        doc.close("results")?;
        doc.close("query")?;
        doc.finish()
    }

    fn write_currently(&self, doc: &mut XmlDoc) -> Result<(), Error> {
        let c = &self.current;
        let humidity = c.percent_humidity.to_string();
        doc.open(
            "currently",
            &[
                ("barometer", BAROMETER),
                ("barometricTrend", ""),
                ("dewpoint", ""),
                ("feelsLike", c.feels_like.as_str()),
                ("heatIndex", c.feels_like.as_str()),
                ("moonfacevisible", ""),
                ("moonphase", ""),
                ("percentHumidity", humidity.as_str()),
                ("sunrise", c.sunrise.as_str()),
                ("sunrise24", c.sunrise24.as_str()),
                ("sunset", c.sunset.as_str()),
                ("sunset24", c.sunset24.as_str()),
                ("temp", c.temp.as_str()),
                ("tempBgcolor", ""),
                ("time", c.time.as_str()),
                ("time24", c.time24.as_str()),
                ("timezone", self.timezone.as_str()),
                ("tz", self.timezone.as_str()),
                ("visibility", ""),
                ("windChill", c.feels_like.as_str()),
                ("windDirection", ""),
                ("windDirectionDegree", c.wind_direction_degree.as_str()),
                ("windSpeed", c.wind_speed.as_str()),
            ],
        )?;
        doc.empty("condition", &[("code", c.code.to_string().as_str())])?;
        doc.close("currently")
    }

    fn write_days(&self, doc: &mut XmlDoc) -> Result<(), Error> {
        doc.open("forecast", &[])?;
        for day in &self.days {
            doc.open(
                "day",
                &[
                    ("dayOfWeek", day.day_of_week.to_string().as_str()),
                    ("poP", day.pop),
                ],
            )?;
            doc.empty("temp", &[("high", day.high.as_str()), ("low", day.low.as_str())])?;
            doc.empty("condition", &[("code", day.code.to_string().as_str())])?;
            doc.close("day")?;
        }
        doc.text("extended_forecast_url", EXTENDED_FORECAST_URL)?;
        doc.close("forecast")
    }

    fn write_hours(&self, doc: &mut XmlDoc) -> Result<(), Error> {
        doc.open("hourlyforecast", &[])?;
        for hour in &self.hours {
            doc.open("hour", &[("time24", hour.time24.as_str())])?;
            doc.empty(
                "condition",
                &[
                    ("code", hour.code.to_string().as_str()),
                    ("poP", hour.pop.as_str()),
                    ("temp", hour.temp.as_str()),
                ],
            )?;
            doc.close("hour")?;
        }
        doc.close("hourlyforecast")
    }
}

/// Builds the complete legacy forecast document for one location
pub fn render_forecast(
    location: &ResolvedLocation,
    sample: &ForecastSample,
) -> Result<String, Error> {
    translate(location, sample)?.to_xml()
}
