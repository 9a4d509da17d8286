use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use modmirror_fetch::{BoxStream, HttpClient};
use tracing::debug;
use url::Url;

use crate::decoder::FeedDecoder;
use crate::error::{IndexError, Result};
use crate::record::IndexRecord;

/// Issues one index request per page.
pub struct IndexPoller<C> {
    client: Arc<C>,
    index_url: Url,
}

impl<C: HttpClient> IndexPoller<C> {
    pub fn new(client: Arc<C>, index_url: &str) -> Result<Self> {
        let index_url = Url::parse(index_url).map_err(|source| IndexError::Url {
            url: index_url.to_string(),
            source,
        })?;
        Ok(Self { client, index_url })
    }

    /// The index URL with `since` appended, or unchanged for an empty cursor.
    pub fn page_url(&self, since: &str) -> Url {
        let mut url = self.index_url.clone();
        if !since.is_empty() {
            url.query_pairs_mut().append_pair("since", since);
        }
        url
    }

    /// Request the page starting at `since`. Records are decoded lazily as
    /// the body streams in.
    pub async fn open_page(&self, since: &str) -> Result<FeedPage<C::Error>> {
        let url = self.page_url(since).to_string();
        debug!(%url, "requesting index page");
        let response = self
            .client
            .get(&url)
            .await
            .map_err(|e| IndexError::Transport {
                url: url.clone(),
                source: e.into(),
            })?;
        if response.status != 200 {
            return Err(IndexError::Status {
                url,
                status: response.status,
            });
        }
        Ok(FeedPage {
            url,
            body: response.body,
            decoder: FeedDecoder::new(),
            yielded: 0,
            done: false,
        })
    }
}

/// A finite, lazily decoded sequence of records from one response.
pub struct FeedPage<E> {
    url: String,
    body: BoxStream<'static, std::result::Result<Bytes, E>>,
    decoder: FeedDecoder,
    yielded: usize,
    done: bool,
}

impl<E> FeedPage<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Next record. `None` once the page is exhausted; an error ends the
    /// page and every later call returns `None`.
    pub async fn next(&mut self) -> Option<Result<IndexRecord>> {
        loop {
            if self.done {
                return None;
            }
            match self.decoder.next_record() {
                Ok(Some(record)) => {
                    self.yielded += 1;
                    return Some(Ok(record));
                }
                Ok(None) => {}
                Err(e) => return self.end(Err(e)),
            }
            match self.body.next().await {
                Some(Ok(chunk)) => self.decoder.push(&chunk),
                Some(Err(e)) => {
                    let error = IndexError::Body {
                        url: self.url.clone(),
                        source: e.into(),
                    };
                    return self.end(Err(error));
                }
                None => {
                    let finished = self.decoder.finish();
                    return self.end(finished);
                }
            }
        }
    }

    fn end(&mut self, result: Result<()>) -> Option<Result<IndexRecord>> {
        self.done = true;
        result.err().map(Err)
    }

    /// Records yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
