//! Rate-limited, retrying, cancellable fetch gateway.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::http::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
use super::{FetchError, FetchSettings};

/// Status and final location of a resolved URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlCheck {
    pub status: u16,
    pub final_url: String,
}

impl UrlCheck {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shared access point for all outbound HTTP.
///
/// Every request first takes a permit for its host (when the host has a
/// configured limit) and then a global permit. Both are held for one
/// attempt, including the body read, and released on every exit path.
/// Backoff sleeps between retries hold no permits.
///
/// The gateway is shared by `Arc` between the engine and every
/// collaborator; it has no global state of its own.
pub struct FetchGateway {
    client: Arc<dyn HttpClient>,
    settings: FetchSettings,
    permits: Semaphore,
    host_permits: HashMap<String, Semaphore>,
    cancellation: CancellationToken,
}

struct RequestPermits<'a> {
    _host: Option<SemaphorePermit<'a>>,
    _global: SemaphorePermit<'a>,
}

impl FetchGateway {
    /// Creates a gateway backed by reqwest.
    pub fn new(
        settings: FetchSettings,
        cancellation: CancellationToken,
    ) -> Result<Self, FetchError> {
        let client = ReqwestClient::new(&settings)?;
        Ok(Self::with_client(Arc::new(client), settings, cancellation))
    }

    /// Creates a gateway over an arbitrary transport.
    pub fn with_client(
        client: Arc<dyn HttpClient>,
        settings: FetchSettings,
        cancellation: CancellationToken,
    ) -> Self {
        let host_permits = settings
            .host_limits
            .iter()
            .map(|(host, limit)| (host.to_string(), Semaphore::new(limit)))
            .collect();

        Self {
            client,
            permits: Semaphore::new(
                settings
                    .max_concurrent_requests
                    .clamp(1, Semaphore::MAX_PERMITS),
            ),
            host_permits,
            settings,
            cancellation,
        }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Token observed by every wait inside the gateway.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Fetches a URL and returns the body. Non-2xx responses are errors.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.fetch_request(HttpRequest::get(url)).await
    }

    /// Fetches a URL with extra request headers.
    pub async fn fetch_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Bytes, FetchError> {
        let request = headers
            .iter()
            .fold(HttpRequest::get(url), |request, (name, value)| {
                request.with_header(*name, *value)
            });
        self.fetch_request(request).await
    }

    /// Fetches a URL and decodes the body as text, replacing invalid UTF-8.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.fetch(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Fetches a URL and decodes the body as JSON.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.fetch(url).await?;
        decode_json(url, &body)
    }

    /// Like [`fetch_json`](Self::fetch_json), sending `Accept: application/json`.
    ///
    /// Some APIs serve HTML to clients that do not ask for JSON.
    pub async fn fetch_json_accepting<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, FetchError> {
        let body = self
            .fetch_with_headers(url, &[("Accept", "application/json")])
            .await?;
        decode_json(url, &body)
    }

    /// Fetches a URL and decodes the body as XML.
    pub async fn fetch_xml<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let text = self.fetch_text(url).await?;
        quick_xml::de::from_str(&text).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            format: "XML",
            reason: e.to_string(),
        })
    }

    /// Follows redirects and returns the final URL without reading the body.
    pub async fn final_redirect_url(&self, url: &str) -> Result<String, FetchError> {
        let response = self.execute(HttpRequest::get(url).without_body()).await?;
        ensure_success(url, &response)?;
        Ok(response.final_url)
    }

    /// Resolves a URL, returning its final status whatever it is.
    ///
    /// Retries still apply, so a 5xx here means the server kept failing.
    pub async fn check_url(&self, url: &str) -> Result<UrlCheck, FetchError> {
        let response = self.execute(HttpRequest::get(url).without_body()).await?;
        Ok(UrlCheck {
            status: response.status,
            final_url: response.final_url,
        })
    }

    async fn fetch_request(&self, request: HttpRequest) -> Result<Bytes, FetchError> {
        let url = request.url.clone();
        let response = self.execute(request).await?;
        ensure_success(&url, &response)?;
        Ok(response.body)
    }

    /// Runs a request with permits, retries and cancellation.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let host = request_host(&request.url)?;
        let mut attempt = 0;

        loop {
            let outcome = {
                let _permits = self.acquire(&request.url, &host).await?;
                tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => return Err(cancelled(&request.url)),
                    outcome = self.client.send(&request) => outcome,
                }
            };

            let retryable = match &outcome {
                Ok(response) => is_retryable_status(response.status),
                Err(e) => e.is_transient(),
            };
            if !retryable || attempt >= self.settings.max_retries {
                if let Ok(response) = &outcome {
                    debug!(url = %request.url, status = response.status, "Request complete");
                }
                return outcome;
            }

            let delay = self.settings.retry_delay(attempt);
            attempt += 1;
            let reason = match &outcome {
                Ok(response) => format!("HTTP {}", response.status),
                Err(e) => e.to_string(),
            };
            warn!(
                url = %request.url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "Retrying request"
            );

            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => return Err(cancelled(&request.url)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn acquire(&self, url: &str, host: &str) -> Result<RequestPermits<'_>, FetchError> {
        let host_semaphore = self
            .settings
            .host_limits
            .limit_for(host)
            .and_then(|(configured, _)| self.host_permits.get(configured));

        // Host first, so a throttled host never pins global slots while waiting
        let host_permit = match host_semaphore {
            Some(semaphore) => Some(self.wait_for(semaphore, url).await?),
            None => None,
        };
        let global = self.wait_for(&self.permits, url).await?;

        Ok(RequestPermits {
            _host: host_permit,
            _global: global,
        })
    }

    async fn wait_for<'a>(
        &'a self,
        semaphore: &'a Semaphore,
        url: &str,
    ) -> Result<SemaphorePermit<'a>, FetchError> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(cancelled(url)),
            permit = semaphore.acquire() => permit.map_err(|_| cancelled(url)),
        }
    }
}

fn request_host(url: &str) -> Result<String, FetchError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        })
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn ensure_success(url: &str, response: &HttpResponse) -> Result<(), FetchError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status {
            url: url.to_string(),
            status: response.status,
        })
    }
}

fn decode_json<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice(body).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        format: "JSON",
        reason: e.to_string(),
    })
}

fn cancelled(url: &str) -> FetchError {
    FetchError::Cancelled {
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{MockHttpClient, MockReply};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::future::BoxFuture;
    use serde::Deserialize;

    fn fast_settings() -> FetchSettings {
        FetchSettings::new()
            .with_max_retries(2)
            .with_retry_delays(Duration::from_millis(1), Duration::from_millis(2))
    }

    fn gateway(mock: MockHttpClient) -> (FetchGateway, Arc<MockHttpClient>) {
        let mock = Arc::new(mock);
        let gateway = FetchGateway::with_client(
            mock.clone(),
            fast_settings(),
            CancellationToken::new(),
        );
        (gateway, mock)
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let (gateway, _) = gateway(MockHttpClient::new().with_page("https://a.example/", "hello"));
        let body = gateway.fetch_text("https://a.example/").await.unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let (gateway, mock) = gateway(MockHttpClient::new());
        let err = gateway.fetch("https://a.example/missing").await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                url: "https://a.example/missing".into(),
                status: 404
            }
        );
        // 404 is not retried
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let (gateway, mock) = gateway(
            MockHttpClient::new()
                .with_reply("https://a.example/", MockReply::status(503))
                .with_reply("https://a.example/", MockReply::status(502))
                .with_reply("https://a.example/", MockReply::ok("ok")),
        );
        let body = gateway.fetch_text("https://a.example/").await.unwrap();
        assert_eq!(body, "ok");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let (gateway, mock) = gateway(
            MockHttpClient::new().with_reply(
                "https://a.example/",
                MockReply::Error(FetchError::Request {
                    url: "https://a.example/".into(),
                    reason: "connection refused".into(),
                }),
            ),
        );
        let err = gateway.fetch("https://a.example/").await.unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
        // One attempt plus two retries
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_without_request() {
        let (gateway, mock) = gateway(MockHttpClient::new());
        let err = gateway.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_final_redirect_url() {
        let (gateway, mock) = gateway(MockHttpClient::new().with_reply(
            "https://a.example/latest",
            MockReply::redirect("https://mirror.example/os-1.2.iso"),
        ));
        let url = gateway
            .final_redirect_url("https://a.example/latest")
            .await
            .unwrap();
        assert_eq!(url, "https://mirror.example/os-1.2.iso");
        assert!(!mock.requests()[0].read_body);
    }

    #[tokio::test]
    async fn test_check_url_reports_status_without_error() {
        let (gateway, _) = gateway(
            MockHttpClient::new().with_reply("https://a.example/x", MockReply::status(403)),
        );
        let check = gateway.check_url("https://a.example/x").await.unwrap();
        assert_eq!(check.status, 403);
        assert!(!check.is_success());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Series {
        version: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Feed {
        title: String,
    }

    #[tokio::test]
    async fn test_json_and_xml_decoding() {
        let (gateway, mock) = gateway(
            MockHttpClient::new()
                .with_page("https://api.example/series", r#"{"version":"24.04"}"#)
                .with_page("https://api.example/feed", "<feed><title>Releases</title></feed>")
                .with_page("https://api.example/broken", "{"),
        );

        let series: Series = gateway
            .fetch_json_accepting("https://api.example/series")
            .await
            .unwrap();
        assert_eq!(series.version, "24.04");
        assert_eq!(
            mock.requests()[0].headers,
            vec![("Accept".to_string(), "application/json".to_string())]
        );

        let feed: Feed = gateway.fetch_xml("https://api.example/feed").await.unwrap();
        assert_eq!(feed.title, "Releases");

        let err = gateway
            .fetch_json::<Series>("https://api.example/broken")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode { format: "JSON", .. }));
    }

    #[tokio::test]
    async fn test_cancelled_gateway_fails_fast() {
        let (gateway, mock) = gateway(MockHttpClient::new().with_page("https://a.example/", "x"));
        gateway.cancellation_token().cancel();
        let err = gateway.fetch("https://a.example/").await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(mock.calls(), 0);
    }

    /// Transport that tracks how many requests overlap.
    #[derive(Default)]
    struct CountingClient {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl HttpClient for CountingClient {
        fn send<'a>(
            &'a self,
            request: &'a HttpRequest,
        ) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
            Box::pin(async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(HttpResponse {
                    status: 200,
                    final_url: request.url.clone(),
                    body: Bytes::new(),
                })
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_host_limit_caps_concurrency() {
        let client = Arc::new(CountingClient::default());
        let gateway = Arc::new(FetchGateway::with_client(
            client.clone(),
            FetchSettings::new().with_max_concurrent_requests(50),
            CancellationToken::new(),
        ));

        let mut handles = Vec::new();
        for i in 0..40 {
            let gateway = gateway.clone();
            handles.push(tokio::spawn(async move {
                let url = format!("https://downloads.sourceforge.net/file{i}");
                gateway.fetch(&url).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(client.peak.load(Ordering::SeqCst) <= 5);
        assert_eq!(client.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_global_limit_is_clamped() {
        let mut settings = fast_settings();
        settings.max_concurrent_requests = usize::MAX;
        let mock = Arc::new(MockHttpClient::new().with_page("https://a.example/x", "ok"));
        let gateway = FetchGateway::with_client(mock, settings, CancellationToken::new());

        assert_eq!(gateway.fetch_text("https://a.example/x").await.unwrap(), "ok");
    }
}
