//! # One wake cycle
//!
//! Connect → fetch tides → fetch offset → localise → plan → render, strictly
//! in that order, stopping at the first failure. Sleeping is left to the
//! caller so the outcome can be logged (or acted on) first.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt::Write;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, Credentials};
use crate::http::{FetchError, HttpClient};
use crate::local_time::{self, TimeError};
use crate::network::{self, ConnectError, Radio};
use crate::panel::{Panel, PanelError};
use crate::planner;
use crate::renderer::{self, RenderReport};
use crate::{tide_data, timezone, TideSample};

/// Any failure that ends a cycle early, tagged with the stage that failed.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("tide fetch failed: {0}")]
    Tides(#[source] FetchError),

    #[error("timezone fetch failed: {0}")]
    Timezone(#[source] FetchError),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("display failed: {0}")]
    Display(#[from] PanelError),
}

/// The two remote data sources a cycle reads.
#[async_trait]
pub trait ForecastSource {
    async fn fetch_tides(&self) -> Result<Vec<TideSample>, FetchError>;

    /// Current offset of the configured zone from UTC, in hours.
    async fn fetch_utc_offset_hours(&self) -> Result<f64, FetchError>;
}

/// [`ForecastSource`] backed by the tide and timezone HTTP APIs.
pub struct ApiForecast {
    http: HttpClient,
    config: Config,
    tide_api_key: String,
    timezone_api_key: String,
}

impl ApiForecast {
    pub fn new(config: &Config, credentials: &Credentials) -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpClient::new(&config.http)?,
            config: config.clone(),
            tide_api_key: credentials.tide_api_key.clone(),
            timezone_api_key: credentials.timezone_api_key.clone(),
        })
    }
}

#[async_trait]
impl ForecastSource for ApiForecast {
    async fn fetch_tides(&self) -> Result<Vec<TideSample>, FetchError> {
        let location = &self.config.location;
        tide_data::fetch_tides(
            &self.http,
            &self.config.tide_api.endpoint,
            &self.tide_api_key,
            location.latitude,
            location.longitude,
            location.days,
        )
        .await
    }

    async fn fetch_utc_offset_hours(&self) -> Result<f64, FetchError> {
        timezone::fetch_utc_offset_hours(
            &self.http,
            &self.config.timezone_api.endpoint,
            &self.timezone_api_key,
            &self.config.timezone_api.zone,
        )
        .await
    }
}

const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format the header date, falling back to ISO order on a bad format string.
fn format_date(local_now: NaiveDateTime, format: &str) -> String {
    let mut date = String::new();
    if write!(date, "{}", local_now.format(format)).is_err() {
        warn!(format, "invalid date_format, using {}", FALLBACK_DATE_FORMAT);
        date = local_now.format(FALLBACK_DATE_FORMAT).to_string();
    }
    date
}

/// Summary of a completed cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub samples: usize,
    pub offset_hours: f64,
    pub date: String,
    pub render: RenderReport,
}

/// Run one cycle up to (not including) sleep.
///
/// `now` only determines the date printed on the header row.
pub async fn run_cycle<R, S, P>(
    config: &Config,
    credentials: &Credentials,
    radio: &mut R,
    source: &S,
    panel: &mut P,
    now: DateTime<Utc>,
) -> Result<CycleReport, CycleError>
where
    R: Radio,
    S: ForecastSource,
    P: Panel,
{
    network::connect(radio, credentials)?;

    let samples = source.fetch_tides().await.map_err(CycleError::Tides)?;
    let offset_hours = source
        .fetch_utc_offset_hours()
        .await
        .map_err(CycleError::Timezone)?;

    let events = local_time::normalize(&samples, offset_hours)?;

    let local_now = local_time::shift(now.naive_utc(), offset_hours)?;
    let date = format_date(local_now, &config.display.date_format);

    let lines = planner::plan(&config.display.layout(), &config.title, &date, &events);
    info!(
        events = events.len(),
        lines = lines.len(),
        date = %date,
        "display planned"
    );

    let render = renderer::render(panel, config.display.ink, &lines)?;

    Ok(CycleReport {
        samples: samples.len(),
        offset_hours,
        date,
        render,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn formats_date_with_configured_pattern() {
        assert_eq!(format_date(noon(), "%a %d %b"), "Sat 01 Jun");
        assert_eq!(format_date(noon(), "%d/%m"), "01/06");
    }

    #[test]
    fn bad_pattern_falls_back() {
        assert_eq!(format_date(noon(), "%Q"), "2024-06-01");
    }
}
