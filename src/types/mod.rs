mod outputs;
pub mod record;

pub use outputs::{ListDeliveryStreamsOutput, ListTagsOutput, Tag};
