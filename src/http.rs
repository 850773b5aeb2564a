//! # HTTP plumbing shared by the two API fetchers
//!
//! Both APIs are plain `GET` + JSON over TLS. The response status is logged
//! but deliberately not checked: an error page fails later, when the body is
//! decoded, which keeps the failure point the same for "bad status" and
//! "bad body".
//!
//! The client carries the hardening knobs from `[http]`: a per-request
//! timeout and a bounded number of retries for transport errors and 5xx
//! responses, spaced by a doubling delay starting at [`RETRY_DELAY`]. With
//! the defaults there is exactly one attempt.

use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::HttpConfig;

/// Wait before the first retry; doubles for each retry after that.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Errors that can occur while fetching or decoding an API response.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Endpoint in the config is not a URL
    #[error("invalid endpoint {endpoint}: {reason}")]
    Endpoint { endpoint: String, reason: String },

    /// Transport failure (DNS, TLS, timeout, connection reset)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Body is not the JSON shape we expect
    #[error("malformed response (HTTP {status}): {source}")]
    Json {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// A tide height that is neither a number nor a numeric string
    #[error("invalid tide height {0:?}")]
    Height(String),

    /// The API answered but reported a failure of its own
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

/// Status and body of a completed request.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
}

/// Thin wrapper over `reqwest::Client` with the clock's retry policy.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    retries: u32,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        Ok(Self {
            client: builder.build()?,
            retries: config.retries,
        })
    }

    /// GET `url` and return its status and body text.
    ///
    /// `label` names the API in logs; the URL itself carries the API key and
    /// is never logged.
    pub async fn get(&self, label: &str, url: Url) -> Result<Response, FetchError> {
        let mut attempt = 0;
        let mut delay = RETRY_DELAY;
        loop {
            attempt += 1;
            debug!(api = label, attempt, "sending request");

            let outcome = match self.client.get(url.clone()).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    match resp.text().await {
                        Ok(body) => Ok(Response { status, body }),
                        Err(e) => Err(e),
                    }
                }
                Err(e) => Err(e),
            };

            let retryable = match &outcome {
                Ok(resp) => resp.status.is_server_error(),
                Err(_) => true,
            };
            if retryable && attempt <= self.retries {
                match &outcome {
                    Ok(resp) => warn!(
                        api = label,
                        status = resp.status.as_u16(),
                        attempt,
                        "server error, retrying"
                    ),
                    Err(e) => warn!(api = label, attempt, "request failed, retrying: {}", e),
                }
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                continue;
            }

            let resp = outcome?;
            info!(api = label, status = resp.status.as_u16(), "response received");
            return Ok(resp);
        }
    }
}

/// Join `params` onto `endpoint` as a query string, in order.
pub fn build_url(endpoint: &str, params: &[(&str, String)]) -> Result<Url, FetchError> {
    Url::parse_with_params(endpoint, params).map_err(|e| FetchError::Endpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::net::TcpListener;
    use std::time::Instant;

    fn client(retries: u32) -> HttpClient {
        HttpClient::new(&HttpConfig {
            timeout_secs: 5,
            retries,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn server_error_is_retried_then_succeeds() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/data")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let healthy = server
            .mock("GET", "/data")
            .with_status(200)
            .with_body(r#"{"values": []}"#)
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/data", server.url())).unwrap();
        let started = Instant::now();
        let resp = client(1).get("test", url).await.unwrap();

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, r#"{"values": []}"#);
        assert!(started.elapsed() >= RETRY_DELAY);
        failing.assert_async().await;
        healthy.assert_async().await;
    }

    #[tokio::test]
    async fn no_retries_means_one_attempt() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/data")
            .with_status(503)
            .with_body("busy")
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/data", server.url())).unwrap();
        let resp = client(0).get("test", url).await.unwrap();

        assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.body, "busy");
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let mut server = Server::new_async().await;
        let denied = server
            .mock("GET", "/data")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/data", server.url())).unwrap();
        let resp = client(3).get("test", url).await.unwrap();

        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        denied.assert_async().await;
    }

    #[tokio::test]
    async fn transport_error_surfaces_after_retries() {
        // Bind then drop so nothing is listening on the port
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = Url::parse(&format!("http://127.0.0.1:{port}/data")).unwrap();

        let started = Instant::now();
        let err = client(1).get("test", url).await.unwrap_err();

        assert!(matches!(err, FetchError::Http(_)));
        assert!(started.elapsed() >= RETRY_DELAY);
    }

    #[test]
    fn build_url_keeps_parameter_order() {
        let url = build_url(
            "https://example.com/data",
            &[("b", "2".to_string()), ("a", "1".to_string())],
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://example.com/data?b=2&a=1");
    }

    #[test]
    fn build_url_rejects_relative_endpoint() {
        let err = build_url("not a url", &[]).unwrap_err();
        assert!(matches!(err, FetchError::Endpoint { .. }));
    }

    #[test]
    fn client_builds_with_and_without_timeout() {
        assert!(HttpClient::new(&HttpConfig::default()).is_ok());
        let no_timeout = HttpConfig {
            timeout_secs: 0,
            retries: 2,
        };
        assert!(HttpClient::new(&no_timeout).is_ok());
    }

    #[test]
    fn error_messages_name_the_failure() {
        let err = FetchError::Api {
            status: 400,
            message: "Invalid API key.".to_string(),
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("Invalid API key"));
    }
}
