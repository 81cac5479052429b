use super::{
    cancel::CancelSignal,
    client::FirehoseClient,
    error::Error,
    paginate::{Page, PageSource, Paginator},
    types::Tag,
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Tag listing of one delivery stream, continued by the last tag key seen.
#[derive(Debug, Clone)]
pub struct TagSource<Client> {
    client: Client,
    name: String,
}

impl<Client: FirehoseClient> TagSource<Client> {
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

#[async_trait]
impl<Client: FirehoseClient> PageSource for TagSource<Client> {
    type Item = Tag;

    async fn fetch(&self, cursor: Option<String>) -> Result<Page<Tag>, Error> {
        self.client
            .list_tags(&self.name, cursor)
            .await
            .map(|output| Page {
                items: output.tags,
                more: output.has_more,
            })
    }

    fn cursor_of(&self, item: &Tag) -> String {
        item.key.clone()
    }
}

/// Collect every tag of the delivery stream into a single key-value map.
///
/// A tag without value maps to null. Failures are wrapped as [`Error::Tags`].
pub async fn collect_tags<Client: FirehoseClient>(
    client: &Client,
    name: &str,
    signal: CancelSignal,
    timeout: Option<Duration>,
) -> Result<Map<String, Value>, Error> {
    let tags = Paginator::new(TagSource::new(client.clone(), name), signal)
        .timeout(timeout)
        .collect()
        .await
        .map_err(|err| Error::tags(name, err))?;

    debug!(name, tags = tags.len(), "Collected tags");

    Ok(into_map(tags))
}

pub fn into_map(tags: impl IntoIterator<Item = Tag>) -> Map<String, Value> {
    tags.into_iter()
        .map(|Tag { key, value }| (key, value.map(Value::String).unwrap_or(Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cancel,
        error::Stage,
        types::{record::Record, ListDeliveryStreamsOutput, ListTagsOutput},
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct TestClient {
        pages: Arc<Mutex<std::vec::IntoIter<Result<ListTagsOutput, Error>>>>,
        cursors: Arc<Mutex<Vec<Option<String>>>>,
    }

    impl TestClient {
        fn new(pages: Vec<Result<ListTagsOutput, Error>>) -> Self {
            Self {
                pages: Arc::new(Mutex::new(pages.into_iter())),
                cursors: Arc::new(Mutex::new(vec![])),
            }
        }
    }

    #[async_trait]
    impl FirehoseClient for TestClient {
        async fn list_delivery_streams(
            &self,
            _exclusive_start_name: Option<String>,
        ) -> Result<ListDeliveryStreamsOutput, Error> {
            unimplemented!()
        }

        async fn describe_delivery_stream(
            &self,
            _name: impl Into<String> + Send,
        ) -> Result<Record, Error> {
            unimplemented!()
        }

        async fn list_tags(
            &self,
            _name: impl Into<String> + Send,
            exclusive_start_tag_key: Option<String>,
        ) -> Result<ListTagsOutput, Error> {
            self.cursors.lock().unwrap().push(exclusive_start_tag_key);
            self.pages
                .lock()
                .unwrap()
                .next()
                .unwrap_or_else(|| Ok(ListTagsOutput::default()))
        }
    }

    fn page(tags: &[(&str, &str)], has_more: bool) -> Result<ListTagsOutput, Error> {
        Ok(ListTagsOutput {
            tags: tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect(),
            has_more,
        })
    }

    #[tokio::test]
    async fn merges_all_pages_into_one_map() {
        let client = TestClient::new(vec![
            page(&[("env", "prod"), ("team", "data"), ("cost", "42")], true),
            page(&[("owner", "ops"), ("tier", "gold")], false),
        ]);

        let tags = collect_tags(&client, "orders", cancel::CancelSignal::never(), None)
            .await
            .unwrap();

        assert_eq!(tags.len(), 5);
        assert_eq!(tags.get("owner"), Some(&json!("ops")));
        assert_eq!(
            *client.cursors.lock().unwrap(),
            [None, Some("cost".to_string())]
        );
    }

    #[tokio::test]
    async fn no_tags_is_an_empty_map() {
        let client = TestClient::new(vec![page(&[], false)]);

        let tags = collect_tags(&client, "orders", cancel::CancelSignal::never(), None)
            .await
            .unwrap();

        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn failures_are_wrapped_with_the_stream_name() {
        let client = TestClient::new(vec![
            page(&[("env", "prod")], true),
            Err(Error::SdkError("access denied".into())),
        ]);

        let err = collect_tags(&client, "orders", cancel::CancelSignal::never(), None)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Tags));
        assert!(matches!(err, Error::Tags { ref name, .. } if name == "orders"));
    }

    #[test]
    fn missing_values_are_null() {
        let map = into_map([
            Tag::new("env", "prod"),
            Tag {
                key: "flag".into(),
                value: None,
            },
        ]);

        assert_eq!(Value::Object(map), json!({ "env": "prod", "flag": null }));
    }
}
