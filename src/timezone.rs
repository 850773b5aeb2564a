//! Current UTC offset for a named zone, from the timezone API.
//!
//! `GET {endpoint}?key={key}&format=json&fields=gmtOffset&by=zone&zone={zone}`
//! answers `{"status": "OK", "message": "", "gmtOffset": 46800}`; the offset
//! is in seconds and is returned here in hours.

use reqwest::Url;
use serde::Deserialize;
use tracing::info;

use crate::http::{build_url, FetchError, HttpClient};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZoneResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    gmt_offset: Option<i64>,
}

pub fn timezone_url(endpoint: &str, api_key: &str, zone: &str) -> Result<Url, FetchError> {
    build_url(
        endpoint,
        &[
            ("key", api_key.to_string()),
            ("format", "json".to_string()),
            ("fields", "gmtOffset".to_string()),
            ("by", "zone".to_string()),
            ("zone", zone.to_string()),
        ],
    )
}

/// Fetch the offset of `zone` from UTC, in hours, as of right now.
pub async fn fetch_utc_offset_hours(
    http: &HttpClient,
    endpoint: &str,
    api_key: &str,
    zone: &str,
) -> Result<f64, FetchError> {
    let url = timezone_url(endpoint, api_key, zone)?;
    let resp = http.get("timezone", url).await?;
    let hours = parse_utc_offset_hours(resp.status.as_u16(), &resp.body)?;
    info!(zone, hours, "UTC offset resolved");
    Ok(hours)
}

/// Decode a timezone API body into an offset in hours.
pub fn parse_utc_offset_hours(status: u16, body: &str) -> Result<f64, FetchError> {
    let response: ZoneResponse =
        serde_json::from_str(body).map_err(|source| FetchError::Json { status, source })?;

    if response.status.as_deref() == Some("FAILED") {
        return Err(FetchError::Api {
            status,
            message: response.message.unwrap_or_default(),
        });
    }

    match response.gmt_offset {
        Some(seconds) => Ok(seconds as f64 / 3600.0),
        None => Err(FetchError::Json {
            status,
            source: serde::de::Error::missing_field("gmtOffset"),
        }),
    }
}
