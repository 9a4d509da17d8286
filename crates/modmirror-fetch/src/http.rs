use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Status line and streaming body of a response.
///
/// Non-2xx statuses are responses, not errors; the caller classifies them.
pub struct HttpResponse<E> {
    pub status: u16,
    pub body: BoxStream<'static, std::result::Result<Bytes, E>>,
}

impl<E> std::fmt::Debug for HttpResponse<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Asynchronous HTTP client abstraction.
///
/// Implementations handle their own redirect following and timeouts. An
/// `Err` means no response was received at all.
pub trait HttpClient: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(
        &self,
        url: &str,
    ) -> impl Future<Output = std::result::Result<HttpResponse<Self::Error>, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_client {
    use std::time::Duration;

    use super::*;
    use crate::error::{FetchError, Result};

    /// Production HTTP client implementation using reqwest.
    #[derive(Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new() -> Result<Self> {
            let client = reqwest::Client::builder()
                .user_agent(concat!("modmirror/", env!("CARGO_PKG_VERSION")))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| FetchError::Client(e.into()))?;
            Ok(Self { client })
        }

        pub fn from_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn get(
            &self,
            url: &str,
        ) -> std::result::Result<HttpResponse<Self::Error>, Self::Error> {
            let response = self.client.get(url).send().await?;
            let status = response.status().as_u16();
            Ok(HttpResponse {
                status,
                body: Box::pin(response.bytes_stream()),
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestClient;
