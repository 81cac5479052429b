use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct ListDeliveryStreamsOutput {
    pub names: Vec<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListTagsOutput {
    pub tags: Vec<Tag>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: Option<String>,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}
