//! Outbound HTTP for catalog collaborators.
//!
//! All network traffic goes through a single [`FetchGateway`], which bounds
//! concurrency globally and per host, retries transient failures and
//! observes the run's cancellation token.
//!
//! ```text
//! collaborator ──► FetchGateway ──► host permit ──► global permit ──► HttpClient
//!                       │                                                 │
//!                       └──────────── retry with backoff ◄── 429 / 5xx ◄──┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let gateway = FetchGateway::new(FetchSettings::default(), CancellationToken::new())?;
//! let page = gateway.fetch_text("https://dl-cdn.alpinelinux.org/alpine/").await?;
//! ```

mod error;
mod gateway;
mod http;
mod settings;

pub use error::FetchError;
pub use gateway::{FetchGateway, UrlCheck};
pub use http::{HttpClient, HttpRequest, HttpResponse, ReqwestClient, MAX_REDIRECTS};
pub use settings::{
    FetchSettings, HostLimits, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MAX_RETRIES,
};

#[cfg(test)]
pub use http::tests::{MockHttpClient, MockReply};
