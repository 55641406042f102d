//! Recognition of the two legacy YQL query kinds

use regex::Regex;
use std::sync::LazyLock;

pub const LOCATIONS_MARKER: &str = "partner.weather.locations";
pub const FORECASTS_MARKER: &str = "partner.weather.forecasts";
const SEARCH_MARKER: &str = "where query=";

static WOEID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"woeid=(\d+)").expect("woeid pattern compiles"));

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Missing query parameter")]
    Missing,
    #[error("Invalid or empty query parameter")]
    EmptySearch,
    #[error("WOEID not found in the query string.")]
    MissingWoeid,
    #[error("Unsupported query type")]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LegacyQuery {
    /// Free-text location search
    Locations { text: String },
    /// Forecast for a gazetteer id
    Forecast { woeid: i64 },
}

impl LegacyQuery {
    pub fn parse(q: Option<&str>) -> Result<Self, Error> {
        let q = q.filter(|q| !q.is_empty()).ok_or(Error::Missing)?;

        if q.contains(LOCATIONS_MARKER) {
            search_text(q).map(|text| LegacyQuery::Locations { text })
        } else if q.contains(FORECASTS_MARKER) {
            woeid(q).map(|woeid| LegacyQuery::Forecast { woeid })
        } else {
            Err(Error::Unsupported)
        }
    }
}

/// Text after `where query=`, without the surrounding quotes
fn search_text(q: &str) -> Result<String, Error> {
    let start = q.find(SEARCH_MARKER).ok_or(Error::EmptySearch)? + SEARCH_MARKER.len();
    let rest = &q[start..];
    let rest = rest.strip_prefix('"').unwrap_or(rest);
    let text = rest.split('"').next().unwrap_or_default().trim();
    if text.is_empty() {
        return Err(Error::EmptySearch);
    }
    Ok(text.to_string())
}

fn woeid(q: &str) -> Result<i64, Error> {
    WOEID
        .captures(q)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or(Error::MissingWoeid)
}
