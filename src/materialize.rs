use super::{
    path,
    row::{Datum, Resource, Row},
    schema::{Column, ContextField, Extractor, Schema, TableDef},
    types::record::Record,
};

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// Account and region the records were fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub account_id: String,
    pub region: String,
}

impl Context {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
        }
    }
}

/// Projects detail records onto a [`Schema`], producing one row per table level and one child
/// row per element of every relation.
#[derive(Debug, Clone, Copy)]
pub struct Materializer<'a> {
    schema: &'a Schema,
    context: &'a Context,
}

impl<'a> Materializer<'a> {
    pub fn new(schema: &'a Schema, context: &'a Context) -> Self {
        Self { schema, context }
    }

    /// Materialize a record fetched under `name`. Rows are ordered depth-first, root first;
    /// every row precedes its children.
    pub fn materialize(&self, name: &str, record: &Record) -> Resource {
        let mut rows = vec![];
        self.materialize_table(self.schema.root(), record, None, &mut rows);
        Resource::new(name, rows)
    }

    fn materialize_table(
        &self,
        table: &TableDef,
        record: &Value,
        parent: Option<Uuid>,
        rows: &mut Vec<Row>,
    ) {
        let row = self.build_row(table, record, parent);
        let cq_id = row.cq_id();
        rows.push(row);

        for child in table.children().iter().map(|id| self.schema.table(*id)) {
            let source = child.source().unwrap_or_default();

            for item in path::resolve_all(record, source) {
                if !item.is_object() {
                    warn!(
                        table = child.name(),
                        source, "Unexpected non-record element in relation. Skip it."
                    );
                    continue;
                }
                self.materialize_table(child, &item, Some(cq_id), rows);
            }
        }
    }

    fn build_row(&self, table: &TableDef, record: &Value, parent: Option<Uuid>) -> Row {
        let mut row = Row::new(table.name(), Uuid::nil());

        if let (Some(key), Some(parent_id)) = (table.parent_key(), parent) {
            row = row.with_parent(key, parent_id);
        }

        for column in table.columns() {
            row.set(column.name(), self.extract(table, column, record));
        }

        let cq_id = match parent {
            Some(_) => Uuid::new_v4(),
            None => self.root_id(table, &row),
        };
        row.set_cq_id(cq_id);

        row
    }

    fn extract(&self, table: &TableDef, column: &Column, record: &Value) -> Datum {
        let value = match column.extractor() {
            Extractor::Path(path) => path::resolve(record, path),
            Extractor::Custom(f) => f(record),
            Extractor::Context(ContextField::AccountId) => {
                Some(Value::String(self.context.account_id.clone()))
            }
            Extractor::Context(ContextField::Region) => {
                Some(Value::String(self.context.region.clone()))
            }
            Extractor::Tags => None,
        };

        let Some(value) = value else {
            return Datum::Null;
        };

        Datum::coerce(column.column_type(), value).unwrap_or_else(|| {
            warn!(
                table = table.name(),
                column = column.name(),
                "Unexpected value shape for {:?} column. Use null instead.",
                column.column_type(),
            );
            Datum::Null
        })
    }

    /// Stable identity of a root row: account id, region, table and primary-key values.
    /// Falls back to a random id when a primary-key value is missing.
    fn root_id(&self, table: &TableDef, row: &Row) -> Uuid {
        if table.primary_keys().is_empty() {
            return Uuid::new_v4();
        }

        let mut key = format!(
            "{}:{}:{}",
            self.context.account_id,
            self.context.region,
            table.name()
        );

        for column in table.primary_keys() {
            let value = row
                .get(column)
                .filter(|datum| !datum.is_null())
                .and_then(|datum| serde_json::to_string(datum).ok());

            match value {
                Some(value) => {
                    key.push(':');
                    key.push_str(&value);
                }
                None => return Uuid::new_v4(),
            }
        }

        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }
}
