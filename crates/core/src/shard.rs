//! Gazetteer shard format
//!
//! The gazetteer is split into 27 shard files named after the first letter of
//! each place name (`A.txt` .. `Z.txt`) plus `Misc.txt` for names that are
//! missing or start with anything else. Every line is one record with the 19
//! gazetteer columns separated by tabs, in the order of [`COLUMNS`].
//!
//! Shards written by older tooling spell empty values as `nan` and integer
//! columns as floats (`1200.0`); the parser accepts both.

use std::fmt;
use std::str::FromStr;

/// Number of tab separated columns per shard line
pub const FIELD_COUNT: usize = 19;

/// Extension of every shard file
pub const SHARD_EXTENSION: &str = "txt";

/// Gazetteer column order
pub const COLUMNS: [&str; FIELD_COUNT] = [
    "geonameid",
    "name",
    "asciiname",
    "alternatenames",
    "latitude",
    "longitude",
    "feature_class",
    "feature_code",
    "country_code",
    "cc2",
    "admin1_code",
    "admin2_code",
    "admin3_code",
    "admin4_code",
    "population",
    "elevation",
    "dem",
    "timezone",
    "modification_date",
];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("expected {FIELD_COUNT} columns, found {0}")]
    FieldCount(usize),
    #[error("invalid value for {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// One of the 27 shard buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShardKey {
    /// Uppercase ASCII letter `A`..=`Z`
    Letter(char),
    Misc,
}

impl ShardKey {
    /// All keys in the fixed scan order: `A`..`Z`, then `Misc`
    pub fn all() -> impl Iterator<Item = ShardKey> {
        ('A'..='Z')
            .map(ShardKey::Letter)
            .chain(std::iter::once(ShardKey::Misc))
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self, SHARD_EXTENSION)
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardKey::Letter(c) => write!(f, "{}", c),
            ShardKey::Misc => write!(f, "Misc"),
        }
    }
}

/// Computes the shard for a place name, or for a search phrase.
///
/// Takes the first character, uppercases it and keeps it only if the result
/// is a single letter in `A`..=`Z`. Everything else lands in `Misc`.
pub fn shard_key(name: Option<&str>) -> ShardKey {
    let Some(first) = name.and_then(|n| n.chars().next()) else {
        return ShardKey::Misc;
    };
    let mut upper = first.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => ShardKey::Letter(c),
        _ => ShardKey::Misc,
    }
}

/// A single gazetteer row
#[derive(Debug, Clone, PartialEq)]
pub struct GazetteerRecord {
    pub id: i64,
    pub name: Option<String>,
    pub ascii_name: String,
    pub alternate_names: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub feature_class: String,
    pub feature_code: String,
    pub country_code: String,
    pub cc2: String,
    pub admin_codes: [String; 4],
    pub population: u64,
    pub elevation: Option<i64>,
    pub dem: Option<i64>,
    pub timezone: String,
    pub modification_date: String,
}

impl GazetteerRecord {
    pub fn shard_key(&self) -> ShardKey {
        shard_key(self.name.as_deref())
    }

    /// State code as shown by the legacy search response
    pub fn admin1_code(&self) -> &str {
        &self.admin_codes[0]
    }
}

impl FromStr for GazetteerRecord {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != FIELD_COUNT {
            return Err(Error::FieldCount(fields.len()));
        }

        let text = |idx: usize| -> String {
            let value = fields[idx];
            if is_missing(value) {
                String::new()
            } else {
                value.to_string()
            }
        };

        Ok(GazetteerRecord {
            id: parse_int(fields[0], COLUMNS[0])?
                .ok_or_else(|| invalid(COLUMNS[0], fields[0]))?,
            name: Some(fields[1])
                .filter(|n| !is_missing(n))
                .map(str::to_string),
            ascii_name: text(2),
            alternate_names: fields[3]
                .split(',')
                .filter(|n| !is_missing(n))
                .map(str::to_string)
                .collect(),
            latitude: parse_float(fields[4], COLUMNS[4])?,
            longitude: parse_float(fields[5], COLUMNS[5])?,
            feature_class: text(6),
            feature_code: text(7),
            country_code: text(8),
            cc2: text(9),
            admin_codes: [text(10), text(11), text(12), text(13)],
            population: parse_int(fields[14], COLUMNS[14])?
                .map(|p| p.max(0) as u64)
                .unwrap_or(0),
            elevation: parse_int(fields[15], COLUMNS[15])?,
            dem: parse_int(fields[16], COLUMNS[16])?,
            timezone: text(17),
            modification_date: text(18),
        })
    }
}

/// Reads only the id column, used when indexing without decoding whole rows
pub fn parse_id(line: &str) -> Result<i64, Error> {
    let raw = line.split('\t').next().unwrap_or_default();
    parse_int(raw, COLUMNS[0])?.ok_or_else(|| invalid(COLUMNS[0], raw))
}

/// Reads only the name column
pub fn parse_name(line: &str) -> Option<&str> {
    line.split('\t').nth(1).filter(|n| !is_missing(n))
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value == "nan"
}

fn invalid(field: &'static str, value: &str) -> Error {
    Error::InvalidField {
        field,
        value: value.to_string(),
    }
}

fn parse_int(value: &str, field: &'static str) -> Result<Option<i64>, Error> {
    let value = value.trim();
    if is_missing(value) {
        return Ok(None);
    }
    if let Ok(v) = value.parse::<i64>() {
        return Ok(Some(v));
    }
    // float spelled integers, e.g. "1200.0"
    match value.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.is_finite() => Ok(Some(v as i64)),
        _ => Err(invalid(field, value)),
    }
}

fn parse_float(value: &str, field: &'static str) -> Result<f64, Error> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(field, value))
}
