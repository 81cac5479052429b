use super::{
    error::Error,
    types::{
        record::{self, Record},
        ListDeliveryStreamsOutput, ListTagsOutput, Tag,
    },
};

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_firehose::{
    error::SdkError,
    operation::describe_delivery_stream::DescribeDeliveryStreamError,
    types::DeliveryStreamDescription,
    Client as FirehoseSdkClient,
};

#[derive(Debug, Clone)]
pub struct Client {
    firehose: FirehoseSdkClient,
    region: Option<String>,
}

impl Client {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            firehose: FirehoseSdkClient::new(config),
            region: config.region().map(|region| region.to_string()),
        }
    }
}

#[async_trait]
pub trait FirehoseClient: Clone + Send + Sync {
    /// Return delivery stream names after `exclusive_start_name` and whether more follow.
    async fn list_delivery_streams(
        &self,
        exclusive_start_name: Option<String>,
    ) -> Result<ListDeliveryStreamsOutput, Error>;

    /// Return the delivery stream description decoded as a record.
    ///
    /// Fails with [`Error::NotFound`] when the delivery stream doesn't exist.
    async fn describe_delivery_stream(
        &self,
        name: impl Into<String> + Send,
    ) -> Result<Record, Error>;

    /// Return tags of the delivery stream after `exclusive_start_tag_key` and whether more
    /// follow.
    async fn list_tags(
        &self,
        name: impl Into<String> + Send,
        exclusive_start_tag_key: Option<String>,
    ) -> Result<ListTagsOutput, Error>;

    /// Region the client sends requests to, if known.
    fn region(&self) -> Option<&str> {
        None
    }
}

#[async_trait]
impl FirehoseClient for Client {
    async fn list_delivery_streams(
        &self,
        exclusive_start_name: Option<String>,
    ) -> Result<ListDeliveryStreamsOutput, Error> {
        self.firehose
            .list_delivery_streams()
            .set_exclusive_start_delivery_stream_name(exclusive_start_name)
            .send()
            .await
            .map_err(|err| Error::SdkError(Box::new(err)))
            .map(|output| ListDeliveryStreamsOutput {
                names: output.delivery_stream_names().to_vec(),
                has_more: flag(output.has_more_delivery_streams()),
            })
    }

    async fn describe_delivery_stream(
        &self,
        name: impl Into<String> + Send,
    ) -> Result<Record, Error> {
        let name: String = name.into();

        let output = self
            .firehose
            .describe_delivery_stream()
            .delivery_stream_name(&name)
            .send()
            .await
            .map_err(|err| {
                if is_not_found(&err) {
                    Error::NotFound(name.clone())
                } else {
                    Error::SdkError(Box::new(err))
                }
            })?;

        let description: Option<&DeliveryStreamDescription> =
            output.delivery_stream_description().into();

        description.map(record::decode).ok_or(Error::NotFound(name))
    }

    async fn list_tags(
        &self,
        name: impl Into<String> + Send,
        exclusive_start_tag_key: Option<String>,
    ) -> Result<ListTagsOutput, Error> {
        self.firehose
            .list_tags_for_delivery_stream()
            .delivery_stream_name(name)
            .set_exclusive_start_tag_key(exclusive_start_tag_key)
            .send()
            .await
            .map_err(|err| Error::SdkError(Box::new(err)))
            .map(|output| {
                let tags = output
                    .tags()
                    .iter()
                    .filter_map(|tag| {
                        let key: Option<&str> = tag.key().into();
                        key.map(|key| Tag {
                            key: key.to_string(),
                            value: tag.value().map(str::to_string),
                        })
                    })
                    .collect::<Vec<Tag>>();

                ListTagsOutput {
                    tags,
                    has_more: flag(output.has_more_tags()),
                }
            })
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

/// Read a more-flag that may be modeled as optional.
fn flag(value: impl Into<Option<bool>>) -> bool {
    value.into().unwrap_or(false)
}

fn is_not_found(err: &SdkError<DescribeDeliveryStreamError>) -> bool {
    err.as_service_error()
        .is_some_and(DescribeDeliveryStreamError::is_resource_not_found_exception)
}
