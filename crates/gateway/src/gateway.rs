use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{debug, info};
use std::{sync::Arc, time::Duration};
use time::OffsetDateTime;

use crate::{
    legacy::{self, render_forecast, render_search},
    location_index::{self, LocationData},
    provider::{self, ForecastProvider},
    query::{self, LegacyQuery},
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] query::Error),
    #[error(transparent)]
    Location(#[from] location_index::Error),
    #[error(transparent)]
    Legacy(#[from] legacy::Error),
    #[error("forecast provider failed: {0}")]
    Provider(#[from] provider::Error),
    #[error("forecast provider did not answer within {0:?}")]
    ProviderTimeout(Duration),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Query(_) => StatusCode::BAD_REQUEST,
            Error::Location(location_index::Error::InvalidQuery) => StatusCode::BAD_REQUEST,
            Error::Location(
                location_index::Error::ShardNotFound(_) | location_index::Error::IdNotFound(_),
            ) => StatusCode::NOT_FOUND,
            Error::Location(_) | Error::Legacy(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Provider(_) => StatusCode::BAD_GATEWAY,
            Error::ProviderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Dispatches legacy queries to the location index or to the forecast
/// provider plus the legacy adapter. Holds its collaborators for the life of
/// the process.
pub struct QueryGateway {
    locations: Arc<dyn LocationData>,
    provider: Arc<dyn ForecastProvider>,
    provider_timeout: Duration,
}

impl QueryGateway {
    pub fn new(
        locations: Arc<dyn LocationData>,
        provider: Arc<dyn ForecastProvider>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            locations,
            provider,
            provider_timeout,
        }
    }

    /// Answers one raw `q` parameter with a legacy XML document
    pub async fn handle(&self, q: Option<&str>) -> Result<String, Error> {
        match LegacyQuery::parse(q)? {
            LegacyQuery::Locations { text } => self.search(&text).await,
            LegacyQuery::Forecast { woeid } => self.forecast(woeid).await,
        }
    }

    pub async fn search(&self, text: &str) -> Result<String, Error> {
        let records = self.locations.search(text).await?;
        debug!("location search {:?}: {} results", text, records.len());
        Ok(render_search(&records, OffsetDateTime::now_utc())?)
    }

    pub async fn forecast(&self, woeid: i64) -> Result<String, Error> {
        let location = self.locations.resolve_by_id(woeid).await?;
        info!(
            "forecast for {} ({}) at {},{}",
            location.name, location.id, location.latitude, location.longitude
        );

        let sample = tokio::time::timeout(
            self.provider_timeout,
            self.provider
                .forecast(location.latitude, location.longitude),
        )
        .await
        .map_err(|_| Error::ProviderTimeout(self.provider_timeout))??;

        Ok(render_forecast(&location, &sample)?)
    }
}
