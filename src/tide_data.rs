//! # Tide Data Fetching
//!
//! Downloads tide turning points for one location from the tide API.
//!
//! ## Request
//! `GET {endpoint}?apikey={key}&lat={lat}&long={long}&numberOfDays={n}`
//!
//! ## Response
//! ```json
//! {
//!   "metadata": { "...": "..." },
//!   "values": [
//!     { "time": "2024-06-01T03:15:00Z", "value": 0.8 },
//!     { "time": "2024-06-01T09:31:00Z", "value": "2.61" }
//!   ]
//! }
//! ```
//! Heights arrive as numbers or numeric strings depending on the API version;
//! both are accepted. Samples keep the response order, which is chronological.
//!
//! ## Error Handling
//! There is no fallback data source. Any failure (transport, non-JSON body,
//! missing `values`, unparsable height) propagates as [`FetchError`] and ends
//! the cycle.

use reqwest::Url;
use serde::Deserialize;
use tracing::info;

use crate::http::{build_url, FetchError, HttpClient};
use crate::TideSample;

#[derive(Deserialize)]
struct TideResponse {
    values: Vec<RawValue>,
}

#[derive(Deserialize)]
struct RawValue {
    time: String,
    value: Height,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Height {
    Number(f32),
    Text(String),
}

impl Height {
    fn metres(self) -> Result<f32, FetchError> {
        match self {
            Height::Number(v) => Ok(v),
            Height::Text(s) => s.trim().parse().map_err(|_| FetchError::Height(s)),
        }
    }
}

/// Build the tide API request URL.
///
/// ```
/// use tide_clock_lib::tide_data::tide_url;
///
/// let url = tide_url("https://tides.example/data", "k", -36.84, 174.77, 1).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://tides.example/data?apikey=k&lat=-36.84&long=174.77&numberOfDays=1"
/// );
/// ```
pub fn tide_url(
    endpoint: &str,
    api_key: &str,
    latitude: f64,
    longitude: f64,
    days: u32,
) -> Result<Url, FetchError> {
    build_url(
        endpoint,
        &[
            ("apikey", api_key.to_string()),
            ("lat", latitude.to_string()),
            ("long", longitude.to_string()),
            ("numberOfDays", days.to_string()),
        ],
    )
}

/// Fetch the tide samples for `days` days at (`latitude`, `longitude`).
///
/// One request, no retry beyond what the [`HttpClient`] is configured for.
pub async fn fetch_tides(
    http: &HttpClient,
    endpoint: &str,
    api_key: &str,
    latitude: f64,
    longitude: f64,
    days: u32,
) -> Result<Vec<TideSample>, FetchError> {
    let url = tide_url(endpoint, api_key, latitude, longitude, days)?;
    let resp = http.get("tides", url).await?;
    let samples = parse_tides(resp.status.as_u16(), &resp.body)?;
    info!(count = samples.len(), "tide samples received");
    Ok(samples)
}

/// Decode a tide API body into samples, preserving order.
///
/// `status` only decorates the error; it is not checked.
pub fn parse_tides(status: u16, body: &str) -> Result<Vec<TideSample>, FetchError> {
    let response: TideResponse =
        serde_json::from_str(body).map_err(|source| FetchError::Json { status, source })?;

    response
        .values
        .into_iter()
        .map(|raw| {
            Ok(TideSample {
                time: raw.time,
                height_m: raw.value.metres()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use mockito::{Matcher, Server};

    #[test]
    fn parses_numeric_and_string_heights() {
        let body = r#"{
            "metadata": {"latitude": "-36.84", "longitude": "174.77", "height": "MSL=1.5"},
            "values": [
                {"time": "2024-06-01T03:15:00Z", "value": 0.8},
                {"time": "2024-06-01T09:31:00Z", "value": "2.61"},
                {"time": "2024-06-01T15:40:00Z", "value": 0.55}
            ]
        }"#;
        let samples = parse_tides(200, body).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].time, "2024-06-01T03:15:00Z");
        assert_eq!(samples[0].height_m, 0.8);
        assert_eq!(samples[1].height_m, 2.61);
        assert_eq!(samples[2].time, "2024-06-01T15:40:00Z");
    }

    #[test]
    fn empty_values_is_not_an_error() {
        let samples = parse_tides(200, r#"{"values": []}"#).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn error_page_fails_at_parsing() {
        let err = parse_tides(401, "<html>Unauthorized</html>").unwrap_err();
        match err {
            FetchError::Json { status, .. } => assert_eq!(status, 401),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn fetch_sends_query_and_decodes_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/data")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("apikey".into(), "k".into()),
                Matcher::UrlEncoded("numberOfDays".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"values": [{"time": "2024-06-01T03:15:00Z", "value": "0.8"}]}"#)
            .create_async()
            .await;

        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let endpoint = format!("{}/data", server.url());
        let samples = fetch_tides(&http, &endpoint, "k", -36.84, 174.77, 1)
            .await
            .unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].height_m, 0.8);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_page_reaches_the_parser() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/data")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_header("content-type", "text/html")
            .with_body("<html><body>401 Unauthorized</body></html>")
            .expect(1)
            .create_async()
            .await;

        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let endpoint = format!("{}/data", server.url());
        let err = fetch_tides(&http, &endpoint, "bad", -36.84, 174.77, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Json { status: 401, .. }));
        mock.assert_async().await;
    }

    #[test]
    fn missing_values_field_fails() {
        let err = parse_tides(200, r#"{"message": "quota exceeded"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Json { .. }));
    }

    #[test]
    fn non_numeric_height_fails() {
        let body = r#"{"values": [{"time": "2024-06-01T03:15:00Z", "value": "n/a"}]}"#;
        let err = parse_tides(200, body).unwrap_err();
        assert!(matches!(err, FetchError::Height(ref s) if s == "n/a"));
    }

    #[test]
    fn url_carries_query_in_order() {
        let url = tide_url("https://tides.example/data", "secret", -36.5, 174.25, 2).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("apikey".to_string(), "secret".to_string()),
                ("lat".to_string(), "-36.5".to_string()),
                ("long".to_string(), "174.25".to_string()),
                ("numberOfDays".to_string(), "2".to_string()),
            ]
        );
    }
}
