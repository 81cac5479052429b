use super::{cancel::CancelSignal, error::Error};

use async_trait::async_trait;
use std::{
    collections::VecDeque,
    pin::Pin,
    task::{ready, Context, Poll},
    time::Duration,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::Stream;
use tracing::{debug, warn};

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub more: bool,
}

/// A listing operation driven by an exclusive-start cursor.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send + 'static;

    /// Return the page starting after `cursor`, or the first page for `None`.
    async fn fetch(&self, cursor: Option<String>) -> Result<Page<Self::Item>, Error>;

    /// The cursor to continue after `item`.
    fn cursor_of(&self, item: &Self::Item) -> String;
}

/// Walks a [`PageSource`] page by page until its more-flag is false.
///
/// Every request is raced against the cancel signal and the optional per-request timeout. The
/// first error ends the listing.
#[derive(Debug)]
pub struct Paginator<S: PageSource> {
    source: S,
    signal: CancelSignal,
    timeout: Option<Duration>,
    cursor: Option<String>,
    pages: usize,
    done: bool,
}

impl<S: PageSource> Paginator<S> {
    pub fn new(source: S, signal: CancelSignal) -> Self {
        Self {
            source,
            signal,
            timeout: None,
            cursor: None,
            pages: 0,
            done: false,
        }
    }

    /// Set a timeout applied to each page request.
    pub fn timeout(self, timeout: Option<Duration>) -> Self {
        Self { timeout, ..self }
    }

    /// Fetch the next page. Returns `None` once the listing is exhausted or has failed.
    pub async fn next_page(&mut self) -> Option<Result<Vec<S::Item>, Error>> {
        if self.done {
            return None;
        }

        let cursor = self.cursor.clone();
        let Page { items, more } = match self
            .signal
            .guard(self.timeout, self.source.fetch(cursor))
            .await
        {
            Ok(page) => page,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        self.pages += 1;
        debug!(page = self.pages, items = items.len(), more, "Fetched page");

        match items.last() {
            Some(last) if more => self.cursor = Some(self.source.cursor_of(last)),
            None if more => {
                warn!(
                    page = self.pages,
                    "Unexpected empty page with more results. Stop paginating."
                );
                self.done = true;
            }
            _ => self.done = true,
        }

        Some(Ok(items))
    }

    /// Fetch every page and return all items in listing order.
    pub async fn collect(mut self) -> Result<Vec<S::Item>, Error> {
        let mut items = vec![];

        while let Some(page) = self.next_page().await {
            items.append(&mut page?);
        }

        Ok(items)
    }
}

impl<S: PageSource + 'static> Paginator<S> {
    /// Run the paginator on a separate task and receive its items as a stream.
    ///
    /// Pages are handed over whole, so a cancelled or failed page never yields part of its
    /// items. Up to `buffer` pages are held before the task waits for the consumer.
    pub fn into_stream(self, buffer: usize) -> PageStream<S::Item> {
        let (tx, rx) = mpsc::channel(buffer.max(1));

        let task = tokio::spawn(async move {
            self.produce(tx).await;
        });

        PageStream::new(rx, task)
    }

    async fn produce(mut self, tx: mpsc::Sender<Result<Vec<S::Item>, Error>>) {
        while let Some(page) = self.next_page().await {
            let page = match page {
                Ok(_) if self.signal.is_cancelled() => {
                    self.done = true;
                    Err(Error::Cancelled)
                }
                page => page,
            };

            if tx.send(page).await.is_err() {
                debug!("Page stream receiver dropped. Stop paginating.");
                return;
            }
        }
    }
}

/// Items of a [`Paginator`] running on its own task.
///
/// Yields `Err` at most once, as its last item. Dropping the stream aborts the paginator task.
#[derive(Debug)]
pub struct PageStream<T> {
    receiver: mpsc::Receiver<Result<Vec<T>, Error>>,
    buffered: VecDeque<T>,
    task: JoinHandle<()>,
}

impl<T> PageStream<T> {
    fn new(receiver: mpsc::Receiver<Result<Vec<T>, Error>>, task: JoinHandle<()>) -> Self {
        Self {
            receiver,
            buffered: VecDeque::new(),
            task,
        }
    }
}

impl<T> Drop for PageStream<T> {
    fn drop(&mut self) {
        self.receiver.close();
        self.task.abort();
    }
}

// Fields are never pinned.
impl<T> Unpin for PageStream<T> {}

impl<T> Stream for PageStream<T> {
    type Item = Result<T, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            match ready!(self.receiver.poll_recv(cx)) {
                Some(Ok(page)) => self.buffered.extend(page),
                Some(Err(err)) => {
                    self.receiver.close();
                    return Poll::Ready(Some(Err(err)));
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
