use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use wxshim_core::GazetteerRecord;

use super::xml::XmlDoc;
use super::{Error, YAHOO_LANG, YAHOO_NAMESPACE};

const LOCATION_ID: &str = "0000";

/// Location search response listing every candidate record
pub fn render_search(records: &[GazetteerRecord], created: OffsetDateTime) -> Result<String, Error> {
    let created = created
        .format(&Rfc3339)
        .map_err(|e| Error::Render(e.to_string()))?;
    let count = records.len().to_string();

    let mut doc = XmlDoc::new();
    doc.declaration()?;
    doc.open(
        "query",
        &[
            ("xmlns:yahoo", YAHOO_NAMESPACE),
            ("yahoo:count", count.as_str()),
            ("yahoo:created", created.as_str()),
            ("yahoo:lang", YAHOO_LANG),
        ],
    )?;
    doc.open("results", &[])?;
    for record in records {
        let city = record.name.as_deref().unwrap_or_default();
        let country = record.country_code.as_str();
        let state = record.admin1_code();
        let woeid = record.id.to_string();
        doc.empty(
            "location",
            &[
                ("city", city),
                ("country", country),
                ("countryAbbr", country),
                ("state", state),
                ("stateAbbr", state),
                ("locationID", LOCATION_ID),
                ("woeid", woeid.as_str()),
            ],
        )?;
    }
    doc.close("results")?;
    doc.close("query")?;
    doc.finish()
}
