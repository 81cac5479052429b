use super::{
    cancel::{self, CancelHandle, CancelSignal},
    client::FirehoseClient,
    error::Error,
    materialize::{Context as RecordContext, Materializer},
    paginate::{Page, PageSource, Paginator},
    row::{Datum, Resource},
    schema::{firehose, Column, Extractor, Schema},
    tags,
    writer::RowWriter,
};

use async_trait::async_trait;
use serde_json::Value;
use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::{
    sync::mpsc,
    task::{JoinError, JoinSet},
};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

/// Delivery stream names, continued by the last name seen.
#[derive(Debug, Clone)]
struct DeliveryStreamNames<Client> {
    client: Client,
}

#[async_trait]
impl<Client: FirehoseClient> PageSource for DeliveryStreamNames<Client> {
    type Item = String;

    async fn fetch(&self, cursor: Option<String>) -> Result<Page<String>, Error> {
        self.client
            .list_delivery_streams(cursor)
            .await
            .map(|output| Page {
                items: output.names,
                more: output.has_more,
            })
    }

    fn cursor_of(&self, item: &String) -> String {
        item.clone()
    }
}

/// Fetches one delivery stream and turns it into a [`Resource`].
#[derive(Debug, Clone)]
struct DetailFetcher<Client> {
    client: Client,
    schema: Arc<Schema>,
    context: Arc<RecordContext>,
    signal: CancelSignal,
    timeout: Option<Duration>,
}

impl<Client: FirehoseClient> DetailFetcher<Client> {
    /// Return `None` when the delivery stream disappeared after being listed.
    async fn fetch(self, name: String) -> Result<Option<Resource>, Error> {
        let described = self
            .signal
            .guard(self.timeout, self.client.describe_delivery_stream(&name))
            .await;

        let record = match described {
            Ok(record) => record,
            Err(Error::NotFound(_)) => {
                debug!(name, "Delivery stream not found. Skip it.");
                return Ok(None);
            }
            Err(err) => return Err(Error::detail(name, err)),
        };

        let mut resource = Materializer::new(&self.schema, &self.context).materialize(&name, &record);

        let tag_columns = self
            .schema
            .root()
            .columns()
            .iter()
            .filter(|column| matches!(column.extractor(), Extractor::Tags))
            .map(Column::name)
            .collect::<Vec<&str>>();

        if tag_columns.is_empty() {
            return Ok(Some(resource));
        }

        match tags::collect_tags(&self.client, &name, self.signal.clone(), self.timeout).await {
            Ok(tags) => {
                if let Some(root) = resource.root_mut() {
                    let datum = Datum::Json(Value::Object(tags));
                    for column in tag_columns {
                        root.set(column, datum.clone());
                    }
                }
            }
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                warn!("Unexpected error during listing tags: {err}. Leave tags of {name} empty.");
            }
        }

        Ok(Some(resource))
    }
}

enum Event {
    Cancelled,
    Listed(Option<Result<String, Error>>),
    Fetched(Result<Result<Option<Resource>, Error>, JoinError>),
}

/// The fetching half of the inventory.
#[derive(Debug)]
struct InventoryProducer<Client>
where
    Client: FirehoseClient + 'static,
{
    fetcher: DetailFetcher<Client>,
    concurrency: usize,
    sender: mpsc::Sender<Result<Resource, Error>>,
}

impl<Client> InventoryProducer<Client>
where
    Client: FirehoseClient + 'static,
{
    /// List every delivery stream and fetch their details on at most `concurrency` tasks.
    async fn run(self) {
        let DetailFetcher {
            client,
            signal,
            timeout,
            ..
        } = self.fetcher.clone();

        let mut listing = Paginator::new(DeliveryStreamNames { client }, signal.clone())
            .timeout(timeout)
            .into_stream(1);
        let mut listing_open = true;
        let mut workers = JoinSet::new();

        let mut listed = 0usize;
        let mut skipped = 0usize;

        while listing_open || !workers.is_empty() {
            let event = tokio::select! {
                biased;
                _ = signal.cancelled() => Event::Cancelled,
                Some(joined) = workers.join_next() => Event::Fetched(joined),
                next = listing.next(), if listing_open && workers.len() < self.concurrency => {
                    Event::Listed(next)
                }
            };

            match event {
                Event::Cancelled => {
                    workers.abort_all();
                    debug!("Inventory cancelled. Stop fetching delivery streams.");
                    self.send(Err(Error::Cancelled)).await;
                    return;
                }
                Event::Listed(None) => listing_open = false,
                Event::Listed(Some(Ok(name))) => {
                    listed += 1;
                    workers.spawn(self.fetcher.clone().fetch(name));
                }
                Event::Listed(Some(Err(err))) => {
                    workers.abort_all();
                    error!("Unexpected error during listing delivery streams: {err}. Stop inventory.");
                    self.send(Err(Error::list(err))).await;
                    return;
                }
                Event::Fetched(Ok(Ok(Some(resource)))) => {
                    if !self.send(Ok(resource)).await {
                        workers.abort_all();
                        return;
                    }
                }
                Event::Fetched(Ok(Ok(None))) => skipped += 1,
                Event::Fetched(Ok(Err(err))) => {
                    workers.abort_all();
                    error!("Unexpected error during fetching delivery stream: {err}. Stop inventory.");
                    self.send(Err(err)).await;
                    return;
                }
                Event::Fetched(Err(err)) => {
                    workers.abort_all();
                    error!("Unexpected error during joining detail task: {err}. Stop inventory.");
                    self.send(Err(Error::Disconnected(err.to_string()))).await;
                    return;
                }
            }
        }

        info!(listed, skipped, "Completed delivery stream inventory");
    }

    /// Return false if the stream has been dropped.
    async fn send(&self, item: Result<Resource, Error>) -> bool {
        if let Err(err) = self.sender.send(item).await {
            debug!("Inventory stream receiver dropped: {err}");
            return false;
        }
        true
    }
}

/// Completed counts of [`InventoryStream::write_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub resources: usize,
    pub rows: usize,
}

/// Represent the inventory of delivery streams.
///
/// This struct receives resources from the fetching half and emits them as Rust Stream. Resources
/// arrive in completion order. After an error item the stream ends.
///
/// Listing and describing failures are wrapped with the stage they happened at, see
/// [`Error::stage`]. Cancelling through the [`CancelHandle`] ends the stream with a bare
/// [`Error::Cancelled`] whose stage is `None`, whichever stage was running.
#[derive(Debug)]
pub struct InventoryStream {
    receiver: mpsc::Receiver<Result<Resource, Error>>,
    handle: Option<CancelHandle>,
}

impl InventoryStream {
    /// Get the [`CancelHandle`] that stops the inventory.
    ///
    /// Once you take the handle from this method, you can't take it anymore because this method
    /// also passes the ownership of the handle. Dropping the stream cancels through the handle
    /// only while the stream still owns it.
    ///
    /// ```rust,no_run
    /// use aws_config::BehaviorVersion;
    /// use firehose_inventory as inventory;
    ///
    /// # async fn wrapper() {
    /// # let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    /// # let client = inventory::Client::new(&config);
    /// let mut stream = inventory::builder().client(client).build();
    /// let handle = stream.take_handle();
    /// assert!(handle.is_some());
    ///
    /// let handle = stream.take_handle();
    /// assert!(handle.is_none());
    /// # }
    /// ```
    pub fn take_handle(&mut self) -> Option<CancelHandle> {
        self.handle.take()
    }

    /// Cancel the inventory if the stream still owns its handle.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.cancel();
        }
    }

    /// Drain the stream into `writer`, one write per resource.
    ///
    /// Resources written before a failure stay written.
    pub async fn write_all<W>(mut self, writer: &W) -> Result<Summary, Error>
    where
        W: RowWriter + ?Sized,
    {
        let mut summary = Summary::default();

        while let Some(resource) = self.next().await {
            let rows = resource?.into_rows();
            summary.resources += 1;
            summary.rows += rows.len();
            writer.write(rows).await?;
        }

        Ok(summary)
    }
}

impl Stream for InventoryStream {
    type Item = Result<Resource, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for InventoryStream {
    fn drop(&mut self) {
        self.receiver.close();
        self.cancel();
    }
}

/// A builder for [`InventoryStream`].
#[derive(Debug)]
pub struct InventoryBuilder<Client>
where
    Client: FirehoseClient + 'static,
{
    client: Option<Client>,
    schema: Option<Schema>,
    account_id: String,
    region: Option<String>,
    concurrency: usize,
    buffer: usize,
    request_timeout: Option<Duration>,
}

impl<Client> InventoryBuilder<Client>
where
    Client: FirehoseClient + 'static,
{
    /// Create a new `InventoryBuilder`.
    pub fn new() -> Self {
        Self {
            client: None,
            schema: None,
            account_id: "".to_string(),
            region: None,
            concurrency: 10,
            buffer: 100,
            request_timeout: None,
        }
    }

    /// Set client to call AWS APIs.
    ///
    /// **Setting any client is required** before the build method is called.
    pub fn client(self, client: Client) -> Self {
        Self {
            client: Some(client),
            ..self
        }
    }

    /// Set the table-definition tree records are materialized with.
    ///
    /// Setting any schema is optional. If you omit calling this method, the delivery stream
    /// schema from [`firehose::schema`] is used.
    pub fn schema(self, schema: Schema) -> Self {
        Self {
            schema: Some(schema),
            ..self
        }
    }

    /// Set the account id written to account id columns and mixed into row identities.
    pub fn account_id(self, account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            ..self
        }
    }

    /// Set the region written to region columns and mixed into row identities.
    ///
    /// Setting any region is optional. If you omit calling this method, the region of the client
    /// is used.
    pub fn region(self, region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            ..self
        }
    }

    /// Set the maximum number of delivery streams fetched at the same time.
    ///
    /// This method will panic when given zero.
    ///
    /// Setting concurrency is optional. If you omit calling this method, `10` is used as default
    /// value.
    pub fn concurrency(self, concurrency: usize) -> Self {
        if concurrency == 0 {
            panic!("concurrency must be positive.");
        }

        Self {
            concurrency,
            ..self
        }
    }

    /// Set the buffer for [`tokio::sync::mpsc::channel`](tokio::sync::mpsc::channel).
    ///
    /// Resources are stored up to the buffer size unless they are consumed. Once the buffer is
    /// full, the inventory waits until resources are consumed.
    ///
    /// This method will panic when given zero as buffer size.
    ///
    /// Setting buffer size is optional. If you omit calling this method, `100` is used as default
    /// value.
    pub fn buffer(self, buffer: usize) -> Self {
        if buffer == 0 {
            panic!("buffer must be positive.");
        }

        Self { buffer, ..self }
    }

    /// Set timeout applied to every single AWS request. When None is provided requests wait
    /// until they complete or the inventory is cancelled.
    pub fn request_timeout(self, request_timeout: Option<Duration>) -> Self {
        Self {
            request_timeout,
            ..self
        }
    }

    /// Consumes the builder and constructs an [`InventoryStream`].
    ///
    /// This method will panic if no client is set.
    pub fn build(self) -> InventoryStream {
        let (handle, rx) = self.build_producer();

        InventoryStream {
            receiver: rx,
            handle: Some(handle),
        }
    }

    fn build_producer(self) -> (CancelHandle, mpsc::Receiver<Result<Resource, Error>>) {
        let client = self.client.expect("`client` is required");
        let schema = match self.schema {
            Some(schema) => schema,
            None => firehose::schema().expect("delivery stream schema is valid"),
        };
        let region = self
            .region
            .or_else(|| client.region().map(str::to_string))
            .unwrap_or_default();

        let (handle, signal) = cancel::new();
        let (tx, rx) = mpsc::channel::<Result<Resource, Error>>(self.buffer);

        let producer = InventoryProducer {
            fetcher: DetailFetcher {
                client,
                schema: Arc::new(schema),
                context: Arc::new(RecordContext::new(self.account_id, region)),
                signal,
                timeout: self.request_timeout,
            },
            concurrency: self.concurrency,
            sender: tx,
        };

        tokio::spawn(async move {
            producer.run().await;
        });

        (handle, rx)
    }
}

impl<Client> Default for InventoryBuilder<Client>
where
    Client: FirehoseClient + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Create [`InventoryBuilder`].
pub fn builder<C: FirehoseClient + 'static>() -> InventoryBuilder<C> {
    InventoryBuilder::new()
}
