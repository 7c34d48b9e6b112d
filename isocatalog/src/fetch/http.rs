//! HTTP transport abstraction for testability.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;

use super::{FetchError, FetchSettings};

/// Maximum redirects followed before a request is failed.
pub const MAX_REDIRECTS: usize = 10;

/// A single GET request handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// When false the transport returns as soon as headers arrive.
    pub read_body: bool,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            read_body: true,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn without_body(mut self) -> Self {
        self.read_body = false;
        self
    }
}

/// Response from one transport attempt, after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// URL of the last hop in the redirect chain.
    pub final_url: String,
    /// Empty unless the body was requested and the status was 2xx.
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP transport operations.
///
/// One call is one attempt: implementations follow redirects but never
/// retry. Non-2xx statuses are returned as responses, not errors; only
/// network-level failures are `Err`.
///
/// The method returns a boxed future so the gateway can hold an
/// `Arc<dyn HttpClient>` and tests can substitute a stub.
pub trait HttpClient: Send + Sync {
    fn send<'a>(&'a self, request: &'a HttpRequest)
        -> BoxFuture<'a, Result<HttpResponse, FetchError>>;
}

/// Real HTTP transport using reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the timeouts and user agent from `settings`.
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        Self::build(
            settings.request_timeout,
            settings.connect_timeout,
            &settings.user_agent,
        )
    }

    fn build(
        timeout: Duration,
        connect_timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn send<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
        Box::pin(async move {
            let mut builder = self.client.get(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder.send().await.map_err(|e| FetchError::Request {
                url: request.url.clone(),
                reason: e.to_string(),
            })?;

            let status = response.status();
            let final_url = response.url().to_string();

            // Error pages are never decoded, so their bodies are left unread
            let body = if request.read_body && status.is_success() {
                response.bytes().await.map_err(|e| FetchError::Body {
                    url: request.url.clone(),
                    reason: e.to_string(),
                })?
            } else {
                Bytes::new()
            };

            Ok(HttpResponse {
                status: status.as_u16(),
                final_url,
                body,
            })
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    /// Scripted reply of the mock transport.
    #[derive(Debug, Clone)]
    pub enum MockReply {
        Response {
            status: u16,
            final_url: Option<String>,
            body: Bytes,
        },
        Error(FetchError),
    }

    impl MockReply {
        pub fn ok(body: impl Into<Bytes>) -> Self {
            MockReply::Response {
                status: 200,
                final_url: None,
                body: body.into(),
            }
        }

        pub fn status(status: u16) -> Self {
            MockReply::Response {
                status,
                final_url: None,
                body: Bytes::new(),
            }
        }

        pub fn redirect(final_url: impl Into<String>) -> Self {
            MockReply::Response {
                status: 200,
                final_url: Some(final_url.into()),
                body: Bytes::new(),
            }
        }
    }

    /// Mock transport keyed by URL.
    ///
    /// Each URL holds a queue of replies; the last reply repeats once the
    /// queue is down to one entry. Unknown URLs answer 404.
    #[derive(Default)]
    pub struct MockHttpClient {
        routes: Mutex<HashMap<String, VecDeque<MockReply>>>,
        requests: Mutex<Vec<HttpRequest>>,
        calls: AtomicUsize,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_reply(self, url: &str, reply: MockReply) -> Self {
            self.routes
                .lock()
                .entry(url.to_string())
                .or_default()
                .push_back(reply);
            self
        }

        pub fn with_page(self, url: &str, body: &str) -> Self {
            self.with_reply(url, MockReply::ok(body.to_string()))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().clone()
        }
    }

    impl HttpClient for MockHttpClient {
        fn send<'a>(
            &'a self,
            request: &'a HttpRequest,
        ) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(request.clone());

            let reply = {
                let mut routes = self.routes.lock();
                match routes.get_mut(&request.url) {
                    Some(queue) if queue.len() > 1 => queue.pop_front(),
                    Some(queue) => queue.front().cloned(),
                    None => None,
                }
            };

            let result = match reply.unwrap_or(MockReply::status(404)) {
                MockReply::Response {
                    status,
                    final_url,
                    body,
                } => Ok(HttpResponse {
                    status,
                    final_url: final_url.unwrap_or_else(|| request.url.clone()),
                    body: if request.read_body && (200..300).contains(&status) {
                        body
                    } else {
                        Bytes::new()
                    },
                }),
                MockReply::Error(e) => Err(e),
            };

            Box::pin(async move { result })
        }
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::get("https://a.example/")
            .with_header("Accept", "application/json")
            .without_body();
        assert_eq!(request.headers.len(), 1);
        assert!(!request.read_body);
    }

    #[test]
    fn test_reqwest_client_builds_from_settings() {
        assert!(ReqwestClient::new(&FetchSettings::default()).is_ok());
    }

    #[tokio::test]
    async fn test_mock_replays_queue_then_repeats_last() {
        let mock = MockHttpClient::new()
            .with_reply("https://a/", MockReply::status(503))
            .with_reply("https://a/", MockReply::ok("done"));
        let request = HttpRequest::get("https://a/");

        assert_eq!(mock.send(&request).await.unwrap().status, 503);
        assert_eq!(mock.send(&request).await.unwrap().body, Bytes::from("done"));
        assert_eq!(mock.send(&request).await.unwrap().body, Bytes::from("done"));
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_unknown_url_is_not_found() {
        let mock = MockHttpClient::new();
        let response = mock.send(&HttpRequest::get("https://nowhere/")).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }
}
