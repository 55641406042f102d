//! Legacy weather XML protocol: value conversions, the forecast adapter and
//! the location search responder.

pub mod codes;
pub mod forecast;
mod search;
mod xml;

pub use forecast::{render_forecast, translate, LegacyForecast};
pub use search::render_search;

use xml::XmlDoc;

pub const YAHOO_NAMESPACE: &str = "http://www.yahooapis.com/v1/base.rng";
pub const YAHOO_LANG: &str = "en-US";

const MOBILE_URL: &str = "https://openweathermap.org/";
const TWC_MOBILE_URL: &str = "https://apps.apple.com/us/app/openweather/id1535923697";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("insufficient {series} forecast data: need {needed} samples, got {got}")]
    InsufficientData {
        series: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("malformed forecast input: missing {0}")]
    MalformedInput(String),
    #[error("failed to render xml: {0}")]
    Render(String),
}

/// `meta/weather` block with the static links and units legacy clients expect
fn write_meta_block(doc: &mut XmlDoc) -> Result<(), Error> {
    doc.open("meta", &[])?;
    doc.open("weather", &[])?;
    doc.text("yahoo_mobile_url", MOBILE_URL)?;
    doc.text("twc_mobile_url", TWC_MOBILE_URL)?;
    doc.empty(
        "units",
        &[
            ("distanceUnits", "km"),
            ("pressureUnits", "mb"),
            ("speedUnits", "km/h"),
            ("tempUnits", "C"),
        ],
    )?;
    doc.close("weather")?;
    doc.close("meta")
}
