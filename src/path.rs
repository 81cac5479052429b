//! Dotted-path lookup into [`Record`](crate::types::record::Record)s.
//!
//! A path such as `Source.KinesisStreamSourceDescription.RoleARN` descends one map per segment.
//! When a segment meets a sequence, the rest of the path is applied to every element and the
//! non-null results are collected, so `Destinations.ExtendedS3DestinationDescription` yields
//! the description of every destination that has one. Missing or null segments resolve to
//! `None`; resolution never fails and never touches the source record.

use serde_json::Value;

const SEPARATOR: char = '.';

/// Resolve `path` against `record`. An empty path resolves to the record itself.
pub fn resolve(record: &Value, path: &str) -> Option<Value> {
    let segments = path
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<&str>>();

    match resolve_segments(record, &segments) {
        Value::Null => None,
        value => Some(value),
    }
}

/// Resolve `path` as a sequence of sub-records: absent yields none, a sequence yields each of
/// its non-null elements and anything else yields itself.
pub fn resolve_all(record: &Value, path: &str) -> Vec<Value> {
    match resolve(record, path) {
        Some(Value::Array(items)) => items.into_iter().filter(|v| !v.is_null()).collect(),
        Some(value) => vec![value],
        None => vec![],
    }
}

fn resolve_segments(value: &Value, segments: &[&str]) -> Value {
    let Some((segment, rest)) = segments.split_first() else {
        return value.clone();
    };

    match value {
        Value::Object(map) => map
            .get(*segment)
            .map(|child| resolve_segments(child, rest))
            .unwrap_or(Value::Null),
        Value::Array(items) => {
            // Each element may itself resolve to a sequence; flatten one level so that
            // `A.B` over `[{B: [x, y]}, {B: z}]` gives `[x, y, z]`.
            let found = items
                .iter()
                .map(|item| resolve_segments(item, segments))
                .flat_map(|v| match v {
                    Value::Array(inner) => inner,
                    other => vec![other],
                })
                .filter(|v| !v.is_null())
                .collect::<Vec<Value>>();

            if found.is_empty() {
                Value::Null
            } else {
                Value::Array(found)
            }
        }
        _ => Value::Null,
    }
}

/// The record field a column name maps to when no path is given:
/// `delivery_stream_name` becomes `DeliveryStreamName`.
pub fn default_path(column: &str) -> String {
    column
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
