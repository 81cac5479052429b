use super::schema::ColumnType;

use chrono::{DateTime, TimeZone, Utc};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

/// Name of the synthetic identity column every row carries.
pub const CQ_ID: &str = "cq_id";

/// A typed column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Datum {
    Null,
    String(String),
    BigInt(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Float(f64),
    StringArray(Vec<String>),
    Json(Value),
    Uuid(Uuid),
}

impl Datum {
    /// Convert a resolved value into a datum of the given column type.
    ///
    /// Returns `None` when the value has a shape the column type can't hold.
    pub fn coerce(column_type: ColumnType, value: Value) -> Option<Self> {
        if value.is_null() {
            return Some(Datum::Null);
        }

        match column_type {
            ColumnType::String => match value {
                Value::String(s) => Some(Datum::String(s)),
                Value::Number(n) => Some(Datum::String(n.to_string())),
                Value::Bool(b) => Some(Datum::String(b.to_string())),
                _ => None,
            },
            ColumnType::BigInt => match value {
                Value::Number(n) => n.as_i64().map(Datum::BigInt),
                Value::String(s) => s.parse().ok().map(Datum::BigInt),
                _ => None,
            },
            ColumnType::Bool => match value {
                Value::Bool(b) => Some(Datum::Bool(b)),
                Value::String(s) => s.parse().ok().map(Datum::Bool),
                _ => None,
            },
            ColumnType::Timestamp => match value {
                Value::String(s) => DateTime::parse_from_rfc3339(&s)
                    .ok()
                    .map(|t| Datum::Timestamp(t.with_timezone(&Utc))),
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                    .map(Datum::Timestamp),
                _ => None,
            },
            ColumnType::Float => match value {
                Value::Number(n) => n.as_f64().map(Datum::Float),
                Value::String(s) => s.parse().ok().map(Datum::Float),
                _ => None,
            },
            ColumnType::StringArray => match value {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect::<Option<Vec<String>>>()
                    .map(Datum::StringArray),
                Value::String(s) => Some(Datum::StringArray(vec![s])),
                _ => None,
            },
            ColumnType::Json => Some(Datum::Json(value)),
            ColumnType::Uuid => match value {
                Value::String(s) => Uuid::parse_str(&s).ok().map(Datum::Uuid),
                _ => None,
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Datum::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Datum::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Link from a child row to the row it was materialized under.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub column: String,
    pub id: Uuid,
}

/// One flat row of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    table: String,
    cq_id: Uuid,
    parent: Option<ParentRef>,
    values: Vec<(String, Datum)>,
}

impl Row {
    pub fn new(table: impl Into<String>, cq_id: Uuid) -> Self {
        Self {
            table: table.into(),
            cq_id,
            parent: None,
            values: vec![],
        }
    }

    /// Attach the parent reference. The reference is also stored as a column value.
    pub fn with_parent(mut self, column: impl Into<String>, id: Uuid) -> Self {
        let column = column.into();
        self.set(column.clone(), Datum::Uuid(id));
        self.parent = Some(ParentRef { column, id });
        self
    }

    pub fn table(&self) -> &str {
        self.table.as_str()
    }

    pub fn cq_id(&self) -> Uuid {
        self.cq_id
    }

    pub(crate) fn set_cq_id(&mut self, cq_id: Uuid) {
        self.cq_id = cq_id;
    }

    pub fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent.as_ref().map(|p| p.id)
    }

    /// Set a column value, replacing any earlier value of the same column.
    pub fn set(&mut self, column: impl Into<String>, datum: Datum) {
        let column = column.into();
        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some((_, value)) => *value = datum,
            None => self.values.push((column, datum)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Datum> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, datum)| datum)
    }

    /// Column values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.values.iter().map(|(name, datum)| (name.as_str(), datum))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 2))?;
        map.serialize_entry("table", &self.table)?;
        map.serialize_entry(CQ_ID, &self.cq_id)?;
        for (name, datum) in &self.values {
            map.serialize_entry(name, datum)?;
        }
        map.end()
    }
}

/// Every row materialized from one detail record, root row first.
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    rows: Vec<Row>,
}

impl Resource {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// The listing identifier the record was fetched with.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn root(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub(crate) fn root_mut(&mut self) -> Option<&mut Row> {
        self.rows.first_mut()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_of<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.iter().filter(move |row| row.table() == table)
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}
