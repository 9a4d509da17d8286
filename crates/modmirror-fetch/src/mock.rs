//! Scripted [`HttpClient`] for exercising the pipeline without a network.
//!
//! Replies are queued per URL and consumed in order; the last queued reply
//! is sticky and answers every later request. Unknown URLs get a 404.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::Semaphore;

use crate::http::{BoxStream, HttpClient, HttpResponse};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub String);

#[derive(Debug, Clone)]
pub enum MockReply {
    /// A response whose body is delivered as the given chunks.
    Body { status: u16, chunks: Vec<Bytes> },
    /// A response whose body yields `chunks` and then fails.
    BrokenBody { chunks: Vec<Bytes>, error: String },
    /// The request fails before any response arrives.
    Transport(String),
    /// The request never completes.
    Pending,
    /// Wait for a permit on the gate, then answer with the inner reply.
    Gated(Arc<Semaphore>, Box<MockReply>),
}

impl MockReply {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::Body {
            status: 200,
            chunks: vec![body.into()],
        }
    }

    pub fn status(status: u16) -> Self {
        Self::Body {
            status,
            chunks: Vec::new(),
        }
    }

    /// Split `body` into `chunk_size` pieces to exercise incremental readers.
    pub fn chunked(body: impl Into<Bytes>, chunk_size: usize) -> Self {
        let body = body.into();
        let chunk_size = chunk_size.max(1);
        let chunks = (0..body.len())
            .step_by(chunk_size)
            .map(|start| body.slice(start..(start + chunk_size).min(body.len())))
            .collect();
        Self::Body {
            status: 200,
            chunks,
        }
    }

    pub fn gated(self, gate: Arc<Semaphore>) -> Self {
        Self::Gated(gate, Box::new(self))
    }
}

#[derive(Default)]
pub struct MockHttpClient {
    routes: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<String>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for `url`.
    pub fn reply(&self, url: impl Into<String>, reply: MockReply) -> &Self {
        lock(&self.routes)
            .entry(url.into())
            .or_default()
            .push_back(reply);
        self
    }

    /// Every URL requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        lock(&self.requests).iter().filter(|u| *u == url).count()
    }

    fn next_reply(&self, url: &str) -> MockReply {
        lock(&self.requests).push(url.to_string());
        let mut routes = lock(&self.routes);
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(MockReply::status(404)),
            Some(queue) => queue.front().cloned().unwrap_or(MockReply::status(404)),
            None => MockReply::status(404),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn answer(mut reply: MockReply) -> Result<HttpResponse<MockError>, MockError> {
    loop {
        reply = match reply {
            MockReply::Body { status, chunks } => {
                let body: BoxStream<'static, Result<Bytes, MockError>> =
                    Box::pin(futures_util::stream::iter(chunks.into_iter().map(Ok)));
                return Ok(HttpResponse { status, body });
            }
            MockReply::BrokenBody { chunks, error } => {
                let items = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(MockError(error))));
                return Ok(HttpResponse {
                    status: 200,
                    body: Box::pin(futures_util::stream::iter(items)),
                });
            }
            MockReply::Transport(message) => return Err(MockError(message)),
            MockReply::Pending => std::future::pending().await,
            MockReply::Gated(gate, inner) => {
                // A closed gate means the test is over; answer right away.
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
                *inner
            }
        };
    }
}

impl HttpClient for MockHttpClient {
    type Error = MockError;

    async fn get(&self, url: &str) -> Result<HttpResponse<MockError>, MockError> {
        let reply = self.next_reply(url);
        answer(reply).await
    }
}
