//! Value conversions required by the legacy XML format

use time::{Date, PrimitiveDateTime};

/// Legacy icon shown for any upstream code missing from [`WEATHER_CODE_TABLE`]
pub const DEFAULT_LEGACY_CODE: i64 = 27;

/// Upstream (WMO) weather code to legacy icon code
pub const WEATHER_CODE_TABLE: [(i64, i64); 28] = [
    (0, 32),  // clear sky -> sun
    (1, 30),  // mainly clear -> partly cloudy
    (2, 30),  // partly cloudy
    (3, 27),  // overcast -> cloudy
    (45, 23), // fog -> haze
    (48, 23),
    (51, 11), // drizzle -> rain
    (53, 11),
    (55, 11),
    (56, 25), // freezing drizzle -> ice
    (57, 25),
    (61, 11), // rain
    (63, 11),
    (65, 11),
    (66, 25), // freezing rain -> ice
    (67, 25),
    (71, 15), // snowfall -> snow
    (73, 15),
    (75, 15),
    (77, 13), // snow grains -> flurries
    (80, 39), // rain showers -> sun and rain
    (81, 39),
    (82, 39),
    (85, 35), // snow showers -> rain and snow
    (86, 35),
    (95, 0),  // thunderstorm -> lightning
    (96, 17), // thunderstorm with hail -> hail
    (99, 17),
];

/// Only probabilities above this are printed in the hourly block
pub const PRECIPITATION_DISPLAY_THRESHOLD: f64 = 0.1;

pub fn translate_weather_code(code: i64) -> i64 {
    WEATHER_CODE_TABLE
        .iter()
        .find(|(upstream, _)| *upstream == code)
        .map(|(_, legacy)| *legacy)
        .unwrap_or(DEFAULT_LEGACY_CODE)
}

/// Sunday = 0 .. Saturday = 6
pub fn day_of_week(date: Date) -> u8 {
    date.weekday().number_days_from_sunday()
}

/// `hh:mm AM` / `hh:mm PM`
pub fn format_time_12h(at: PrimitiveDateTime) -> String {
    let hour = match at.hour() % 12 {
        0 => 12,
        h => h,
    };
    let period = if at.hour() < 12 { "AM" } else { "PM" };
    format!("{:02}:{:02} {}", hour, at.minute(), period)
}

/// `HH:MM`
pub fn format_time_24h(at: PrimitiveDateTime) -> String {
    format!("{:02}:{:02}", at.hour(), at.minute())
}

/// Hourly probability of precipitation: the value itself when above the
/// threshold, otherwise an empty string (never `0`).
pub fn precipitation_display(probability: Option<f64>) -> String {
    match probability {
        Some(p) if p > PRECIPITATION_DISPLAY_THRESHOLD => format_number(p),
        _ => String::new(),
    }
}

/// Rounds to two decimals and prints the shortest form, always keeping a
/// fractional part (`21` prints as `21.0`).
pub fn format_decimal(value: f64) -> String {
    format_number((value * 100.0).round() / 100.0)
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let printed = value.to_string();
    if printed.contains('.') {
        printed
    } else {
        format!("{}.0", printed)
    }
}
