//! The one network capability the lookup pipeline needs: GET a URL and
//! hand back its JSON body.

use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fetches a JSON document from a URL.
///
/// Implemented over HTTP by [`HttpFetcher`]; tests substitute canned
/// responses.
pub trait JsonFetcher: Send + Sync {
    fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds the HTTP client. `timeout` of `None` leaves requests unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl JsonFetcher for HttpFetcher {
    async fn get_json(&self, url: &str, headers: &[(&str, &str)]) -> Result<Value, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let body = request
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_headers_and_returns_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo.json"))
            .and(header("User-Agent", "IP-Grabber-Beta/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ip": "198.51.100.1" })))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(None).unwrap();
        let body = fetcher
            .get_json(
                &format!("{}/geo.json", server.uri()),
                &[("User-Agent", "IP-Grabber-Beta/1.0")],
            )
            .await
            .unwrap();

        assert_eq!(body["ip"], "198.51.100.1");
    }

    #[tokio::test]
    async fn error_status_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Some(Duration::from_secs(5))).unwrap();
        let result = fetcher.get_json(&server.uri(), &[]).await;
        assert!(matches!(result, Err(FetchError::Http(_))));
    }

    #[tokio::test]
    async fn non_json_body_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(None).unwrap();
        assert!(fetcher.get_json(&server.uri(), &[]).await.is_err());
    }
}
