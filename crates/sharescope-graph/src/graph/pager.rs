//! Lazy, restartable pagination over `@odata.nextLink`.

use futures::stream::{self, Stream};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

use crate::graph::api_client::GraphApiClient;
use crate::graph::error::{GraphError, GraphResult};

/// Deserialize each record of a collection.  Records that do not fit `T`
/// are logged and counted instead of failing the whole page.
pub fn decode_records<T: DeserializeOwned>(records: &[Value], context: &str) -> (Vec<T>, usize) {
    let mut items = Vec::with_capacity(records.len());
    let mut skipped = 0;
    for (index, record) in records.iter().enumerate() {
        match serde_json::from_value::<T>(record.clone()) {
            Ok(item) => items.push(item),
            Err(e) => {
                skipped += 1;
                warn!(
                    "{}: skipping record {} (id {}): {}",
                    context,
                    index,
                    record["id"].as_str().unwrap_or("?"),
                    e
                );
            }
        }
    }
    (items, skipped)
}

/// Every item of a collection plus the number of records that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Walks a collection endpoint page by page.  Nothing is fetched until
/// [`Pager::next_page`] is awaited; [`Pager::restart`] rewinds to page one.
pub struct Pager<'a, T> {
    client: &'a GraphApiClient,
    path: String,
    query: Vec<(String, String)>,
    cursor: Cursor,
    pages_fetched: usize,
    skipped: usize,
    _item: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> Pager<'a, T> {
    pub fn new(client: &'a GraphApiClient, path: impl Into<String>, query: &[(&str, &str)]) -> Self {
        Self {
            client,
            path: path.into(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            cursor: Cursor::Start,
            pages_fetched: 0,
            skipped: 0,
            _item: PhantomData,
        }
    }

    /// Fetch the next page, or `None` once the continuation links run out.
    pub async fn next_page(&mut self) -> GraphResult<Option<Vec<T>>> {
        let resp = match self.cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => {
                let query: Vec<(&str, &str)> = self
                    .query
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                self.client.get(&self.path, &query).await?
            }
            // The continuation link already carries the original query.
            Cursor::Next(ref link) => self.client.get(link, &[]).await?,
        };

        self.pages_fetched += 1;
        self.cursor = match resp["@odata.nextLink"].as_str() {
            Some(next) if !next.is_empty() => Cursor::Next(next.to_string()),
            _ => Cursor::Done,
        };

        let records = resp["value"].as_array().map(Vec::as_slice).unwrap_or_default();
        let (items, skipped) = decode_records::<T>(records, &self.path);
        self.skipped += skipped;
        debug!(
            "{}: page {} with {} items",
            self.path,
            self.pages_fetched,
            items.len()
        );
        Ok(Some(items))
    }

    /// Rewind to the first page.
    pub fn restart(&mut self) {
        self.cursor = Cursor::Start;
        self.pages_fetched = 0;
        self.skipped = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Done
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Records skipped so far because they did not deserialize.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Drain every remaining page.
    pub async fn collect_all(self) -> GraphResult<Vec<T>> {
        Ok(self.collect_counted().await?.items)
    }

    /// Drain every remaining page, keeping the skipped-record count.
    pub async fn collect_counted(mut self) -> GraphResult<Collected<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(Collected {
            items,
            skipped: self.skipped,
        })
    }

    /// The remaining pages as a stream.
    pub fn into_stream(self) -> impl Stream<Item = GraphResult<Vec<T>>> + 'a
    where
        T: 'a,
    {
        stream::try_unfold(self, |mut pager| async move {
            Ok::<_, GraphError>(pager.next_page().await?.map(|page| (page, pager)))
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
