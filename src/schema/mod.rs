//! # Table definitions
//!
//! A [`Schema`] is a tree of table definitions stored as an arena: every [`TableDef`] is
//! addressed by a [`TableId`] and links to its parent and children by id. The tree is declared
//! with nested [`TableBuilder`]s and flattened on [`TableBuilder::build`].
//!
//! ```rust
//! use firehose_inventory::schema::{Column, ColumnType, TableBuilder};
//!
//! let schema = TableBuilder::new("streams")
//!     .primary_keys(["arn"])
//!     .column(Column::path("arn", ColumnType::String, "DeliveryStreamARN"))
//!     .column(Column::new("delivery_stream_name", ColumnType::String))
//!     .relation(
//!         "Destinations.ExtendedS3DestinationDescription",
//!         TableBuilder::new("stream_s3_destinations")
//!             .parent_key("stream_cq_id")
//!             .column(Column::path("bucket_arn", ColumnType::String, "BucketARN")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.len(), 2);
//! ```

pub mod firehose;

use super::{error::Error, path, row::CQ_ID};

use serde_json::Value;
use std::collections::HashSet;

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    BigInt,
    Bool,
    Timestamp,
    Float,
    StringArray,
    Json,
    Uuid,
}

/// Values taken from the invocation rather than from the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    AccountId,
    Region,
}

/// A column extractor run against the current record.
pub type CustomFn = fn(&Value) -> Option<Value>;

/// How a column gets its value.
#[derive(Debug, Clone)]
pub enum Extractor {
    /// Dotted path into the current record.
    Path(String),
    /// Arbitrary logic over the current record.
    Custom(CustomFn),
    /// Account id or region of the invocation.
    Context(ContextField),
    /// Tag map of the resource, filled in after materialization.
    Tags,
}

#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    extractor: Extractor,
}

impl Column {
    /// A column reading the record field named after it (`version_id` reads `VersionId`).
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        let extractor = Extractor::Path(path::default_path(&name));
        Self {
            name,
            column_type,
            extractor,
        }
    }

    pub fn path(name: impl Into<String>, column_type: ColumnType, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type,
            extractor: Extractor::Path(path.into()),
        }
    }

    pub fn custom(name: impl Into<String>, column_type: ColumnType, f: CustomFn) -> Self {
        Self {
            name: name.into(),
            column_type,
            extractor: Extractor::Custom(f),
        }
    }

    pub fn context(name: impl Into<String>, field: ContextField) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::String,
            extractor: Extractor::Context(field),
        }
    }

    pub fn tags(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Json,
            extractor: Extractor::Tags,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }
}

/// Index of a table definition in its [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(usize);

#[derive(Debug, Clone)]
pub struct TableDef {
    id: TableId,
    name: String,
    columns: Vec<Column>,
    source: Option<String>,
    parent: Option<TableId>,
    parent_key: Option<String>,
    children: Vec<TableId>,
    primary_keys: Vec<String>,
}

impl TableDef {
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Path the rows of this table are taken from, relative to the parent's record.
    /// `None` for the root table.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn parent(&self) -> Option<TableId> {
        self.parent
    }

    /// Name of the column holding the parent row's `cq_id`.
    pub fn parent_key(&self) -> Option<&str> {
        self.parent_key.as_deref()
    }

    pub fn children(&self) -> &[TableId] {
        &self.children
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }
}

/// The table-definition tree, root first.
#[derive(Debug, Clone)]
pub struct Schema {
    tables: Vec<TableDef>,
}

impl Schema {
    pub fn root(&self) -> &TableDef {
        &self.tables[0]
    }

    pub fn table(&self, id: TableId) -> &TableDef {
        &self.tables[id.0]
    }

    pub fn find(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Tables in depth-first declaration order.
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of relation steps between the root and the table.
    pub fn depth(&self, id: TableId) -> usize {
        let mut depth = 0;
        let mut current = self.table(id).parent();
        while let Some(parent) = current {
            depth += 1;
            current = self.table(parent).parent();
        }
        depth
    }
}

/// Declarative builder for one table and, through [`relation`](TableBuilder::relation), its
/// descendants.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    parent_key: Option<String>,
    primary_keys: Vec<String>,
    relations: Vec<(String, TableBuilder)>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: vec![],
            parent_key: None,
            primary_keys: vec![],
            relations: vec![],
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Columns whose values, with account id and region, identify a root row across runs.
    pub fn primary_keys<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            primary_keys: keys.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Set the name of the parent reference column.
    ///
    /// Setting a parent key is optional. If you omit calling this method,
    /// `<parent table name>_cq_id` is used.
    pub fn parent_key(self, parent_key: impl Into<String>) -> Self {
        Self {
            parent_key: Some(parent_key.into()),
            ..self
        }
    }

    /// Nest a child table whose rows come from `source`, a path into this table's record.
    pub fn relation(mut self, source: impl Into<String>, child: TableBuilder) -> Self {
        self.relations.push((source.into(), child));
        self
    }

    /// Flatten the tree into a [`Schema`], validating names along the way.
    pub fn build(self) -> Result<Schema, Error> {
        let mut tables: Vec<TableDef> = vec![];
        push_table(&mut tables, self, None, None)?;

        let mut names = HashSet::new();
        for table in &tables {
            if !names.insert(table.name.as_str()) {
                return Err(Error::Schema(format!("duplicate table {}", table.name)));
            }
        }

        Ok(Schema { tables })
    }
}

fn push_table(
    tables: &mut Vec<TableDef>,
    builder: TableBuilder,
    source: Option<String>,
    parent: Option<TableId>,
) -> Result<TableId, Error> {
    let TableBuilder {
        name,
        columns,
        parent_key,
        primary_keys,
        relations,
    } = builder;

    if name.is_empty() {
        return Err(Error::Schema("table name must not be empty".to_string()));
    }

    let parent_key = parent.map(|id| {
        parent_key.unwrap_or_else(|| format!("{}_{CQ_ID}", tables[id.0].name))
    });

    let mut seen: HashSet<&str> = HashSet::from([CQ_ID]);
    if let Some(key) = parent_key.as_deref() {
        seen.insert(key);
    }
    for column in &columns {
        if !seen.insert(column.name()) {
            return Err(Error::Schema(format!(
                "duplicate column {} in table {name}",
                column.name()
            )));
        }
    }

    if let Some(key) = primary_keys.iter().find(|k| !columns.iter().any(|c| c.name() == *k)) {
        return Err(Error::Schema(format!(
            "primary key {key} is not a column of table {name}"
        )));
    }

    let id = TableId(tables.len());
    tables.push(TableDef {
        id,
        name,
        columns,
        source,
        parent,
        parent_key,
        children: vec![],
        primary_keys,
    });

    for (source, child) in relations {
        if source.trim_matches('.').is_empty() {
            return Err(Error::Schema(format!(
                "relation {} of table {} has an empty source path",
                child.name, tables[id.0].name
            )));
        }
        let child_id = push_table(tables, child, Some(source), Some(id))?;
        tables[id.0].children.push(child_id);
    }

    Ok(id)
}
