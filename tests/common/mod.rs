use async_trait::async_trait;
use firehose_inventory::{
    error::Error,
    types::{record::Record, ListDeliveryStreamsOutput, ListTagsOutput, Tag},
    FirehoseClient,
};
use serde_json::{json, Value};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::time::{sleep, Duration};

pub const ACCOUNT: &str = "123456789012";
pub const REGION: &str = "eu-west-1";

#[derive(Debug, Clone)]
pub enum Detail {
    Found(Value),
    Missing,
    Failing,
    Hanging,
}

/// Delivery streams served by [`FixtureClient`], listed in insertion order.
#[derive(Debug)]
pub struct Fixture {
    streams: Vec<(String, Detail)>,
    page_size: usize,
    list_fails_after: Option<usize>,
    tags: HashMap<String, Vec<Tag>>,
    failing_tags: HashSet<String>,
    tag_page_size: usize,
    describe_delay: Option<Duration>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            streams: vec![],
            page_size: 2,
            list_fails_after: None,
            tags: HashMap::new(),
            failing_tags: HashSet::new(),
            tag_page_size: 2,
            describe_delay: None,
        }
    }

    pub fn stream(self, name: &str, detail: Detail) -> Self {
        let mut streams = self.streams;
        streams.push((name.to_string(), detail));
        Self { streams, ..self }
    }

    pub fn tags(self, name: &str, tags: &[(&str, &str)]) -> Self {
        let mut all = self.tags;
        all.insert(
            name.to_string(),
            tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect(),
        );
        Self { tags: all, ..self }
    }

    pub fn failing_tags(self, name: &str) -> Self {
        let mut failing_tags = self.failing_tags;
        failing_tags.insert(name.to_string());
        Self {
            failing_tags,
            ..self
        }
    }

    pub fn page_size(self, page_size: usize) -> Self {
        Self { page_size, ..self }
    }

    pub fn list_fails_after(self, pages: usize) -> Self {
        Self {
            list_fails_after: Some(pages),
            ..self
        }
    }

    pub fn describe_delay(self, delay: Duration) -> Self {
        Self {
            describe_delay: Some(delay),
            ..self
        }
    }

    pub fn client(self) -> FixtureClient {
        FixtureClient {
            fixture: Arc::new(self),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            list_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixtureClient {
    fixture: Arc<Fixture>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
}

impl FixtureClient {
    /// Highest number of describe calls observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn after<'a, T>(items: &'a [T], cursor: Option<&str>, key: impl Fn(&T) -> &str) -> &'a [T] {
    match cursor {
        None => items,
        Some(cursor) => match items.iter().position(|item| key(item) == cursor) {
            Some(index) => &items[index + 1..],
            None => &items[items.len()..],
        },
    }
}

#[async_trait]
impl FirehoseClient for FixtureClient {
    async fn list_delivery_streams(
        &self,
        exclusive_start_name: Option<String>,
    ) -> Result<ListDeliveryStreamsOutput, Error> {
        let page = self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fixture.list_fails_after.is_some_and(|n| page >= n) {
            return Err(Error::SdkError("ThrottlingException: rate exceeded".into()));
        }

        let rest = after(
            &self.fixture.streams,
            exclusive_start_name.as_deref(),
            |(name, _)| name.as_str(),
        );
        let size = self.fixture.page_size.min(rest.len());

        Ok(ListDeliveryStreamsOutput {
            names: rest[..size].iter().map(|(name, _)| name.clone()).collect(),
            has_more: size < rest.len(),
        })
    }

    async fn describe_delivery_stream(
        &self,
        name: impl Into<String> + Send,
    ) -> Result<Record, Error> {
        let name: String = name.into();

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(Arc::clone(&self.in_flight));
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.fixture.describe_delay {
            sleep(delay).await;
        }

        let detail = self
            .fixture
            .streams
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, detail)| detail.clone())
            .unwrap_or(Detail::Missing);

        match detail {
            Detail::Found(record) => Ok(record),
            Detail::Missing => Err(Error::NotFound(name)),
            Detail::Failing => Err(Error::SdkError("AccessDeniedException".into())),
            Detail::Hanging => std::future::pending().await,
        }
    }

    async fn list_tags(
        &self,
        name: impl Into<String> + Send,
        exclusive_start_tag_key: Option<String>,
    ) -> Result<ListTagsOutput, Error> {
        let name: String = name.into();

        if self.fixture.failing_tags.contains(&name) {
            return Err(Error::SdkError("LimitExceededException".into()));
        }

        let tags = self.fixture.tags.get(&name).map(Vec::as_slice).unwrap_or_default();
        let rest = after(tags, exclusive_start_tag_key.as_deref(), |tag| {
            tag.key.as_str()
        });
        let size = self.fixture.tag_page_size.min(rest.len());

        Ok(ListTagsOutput {
            tags: rest[..size].to_vec(),
            has_more: size < rest.len(),
        })
    }

    fn region(&self) -> Option<&str> {
        Some(REGION)
    }
}

pub fn arn(name: &str) -> String {
    format!("arn:aws:firehose:{REGION}:{ACCOUNT}:deliverystream/{name}")
}

fn processors(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "Type": "Lambda",
                "Parameters": [
                    {
                        "ParameterName": "LambdaArn",
                        "ParameterValue": format!("arn:aws:lambda:{REGION}:{ACCOUNT}:function:transform-{i}")
                    },
                    { "ParameterName": "NumberOfRetries", "ParameterValue": "3" }
                ]
            })
        })
        .collect()
}

/// Description of a delivery stream with extended S3 and OpenSearch destinations, each with
/// `processors` processors of two parameters.
pub fn record(name: &str, s3_destinations: usize, open_search: usize, processors_each: usize) -> Value {
    let mut destinations = vec![];

    for i in 0..s3_destinations {
        destinations.push(json!({
            "DestinationId": format!("destinationId-s3-{i}"),
            "ExtendedS3DestinationDescription": {
                "BucketARN": format!("arn:aws:s3:::{name}-bucket-{i}"),
                "RoleARN": format!("arn:aws:iam::{ACCOUNT}:role/firehose"),
                "BufferingHints": { "IntervalInSeconds": 300, "SizeInMBs": 5 },
                "CompressionFormat": "UNCOMPRESSED",
                "EncryptionConfiguration": { "NoEncryptionConfig": "NoEncryption" },
                "S3BackupMode": "Disabled",
                "ProcessingConfiguration": {
                    "Enabled": true,
                    "Processors": processors(processors_each)
                }
            }
        }));
    }

    for i in 0..open_search {
        destinations.push(json!({
            "DestinationId": format!("destinationId-os-{i}"),
            "AmazonopensearchserviceDestinationDescription": {
                "DomainARN": format!("arn:aws:es:{REGION}:{ACCOUNT}:domain/logs-{i}"),
                "IndexName": "logs",
                "IndexRotationPeriod": "OneDay",
                "VpcConfigurationDescription": {
                    "SubnetIds": ["subnet-1", "subnet-2"],
                    "SecurityGroupIds": ["sg-1"],
                    "RoleARN": format!("arn:aws:iam::{ACCOUNT}:role/firehose"),
                    "VpcId": "vpc-1"
                },
                "ProcessingConfiguration": {
                    "Enabled": true,
                    "Processors": processors(processors_each)
                }
            }
        }));
    }

    json!({
        "DeliveryStreamName": name,
        "DeliveryStreamARN": arn(name),
        "DeliveryStreamStatus": "ACTIVE",
        "DeliveryStreamType": "DirectPut",
        "VersionId": "1",
        "CreateTimestamp": "2023-01-05T10:00:00Z",
        "Destinations": destinations
    })
}
