pub mod forecast;
pub mod gateway;
pub mod legacy;
pub mod location_index;
pub mod provider;
pub mod query;
mod routes;
mod startup;
mod utils;

pub use forecast::{CurrentConditions, DailySeries, ForecastSample, HourlySeries, ResolvedLocation};
pub use gateway::QueryGateway;
pub use location_index::{LocationData, LocationIndex};
pub use provider::{ForecastProvider, OpenMeteoClient};
pub use query::LegacyQuery;
pub use routes::*;
pub use startup::*;
pub use utils::*;
