//! # Mapping Module
//!
//! Extraction turns the declared metadata of a [`Model`] into a validated
//! [`TableMapping`]. Mappings are computed once per type and kept in the
//! [`Registry`] of the owning [`Database`](crate::Database) together with
//! the primary key counters.

use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    Error, MappingError,
    dialect::Dialect,
    keys::KeyAllocator,
    model::{ColumnDescriptor, Construction, Model},
    statement::StatementCache,
};

/// The validated metadata of one mapped type, bound to one dialect.
#[derive(Debug)]
pub struct TableMapping {
    pub(crate) type_id: TypeId,
    pub(crate) table: &'static str,
    pub(crate) columns: Vec<ColumnDescriptor>,
    pub(crate) primary_key: Option<usize>,
    /// Column index of each builder parameter, empty for field-assigned types.
    pub(crate) builder_slots: Vec<usize>,
    /// Read expression of each column, in column order.
    pub(crate) projections: Vec<Cow<'static, str>>,
    /// Parameter marker of each column, in column order.
    pub(crate) placeholders: Vec<&'static str>,
    create_table: String,
    indexes: Vec<String>,
    pub(crate) statements: StatementCache,
}

impl TableMapping {
    /// Extracts and validates the mapping of `T` for `dialect`.
    ///
    /// A type without a primary key column is accepted here; operations that
    /// need one fail with [`MappingError::MissingPrimaryKey`].
    pub fn extract<T: Model>(dialect: &dyn Dialect) -> Result<Self, MappingError> {
        let table = T::table_name();
        if table.trim().is_empty() {
            return Err(MappingError::EmptyTableName { type_name: std::any::type_name::<T>() });
        }

        let columns = T::columns();
        if columns.is_empty() {
            return Err(MappingError::NoColumns { table });
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name) {
                return Err(MappingError::DuplicateColumn { table, column: column.name });
            }
        }

        let mut keys = columns.iter().enumerate().filter(|(_, c)| c.primary_key).map(|(i, _)| i);
        let primary_key = keys.next();
        if keys.next().is_some() {
            return Err(MappingError::MultiplePrimaryKeys { table });
        }

        let builder_slots = match T::construction() {
            Construction::FieldAssign { .. } => Vec::new(),
            Construction::Builder { parameters, .. } => parameters
                .iter()
                .map(|parameter| {
                    columns
                        .iter()
                        .position(|c| c.name == *parameter)
                        .ok_or(MappingError::UnresolvedBuilderParameter { table, parameter })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        let mut definitions = Vec::with_capacity(columns.len());
        let mut constraints = Vec::new();
        let mut indexes = Vec::new();
        for column in &columns {
            let clause = dialect.column_clause(column, &mut constraints)?;
            definitions.push(format!("{} {}", column.name, clause));
            indexes.extend(dialect.index_statement(table, column));
        }
        definitions.extend(constraints);
        let create_table = format!("CREATE TABLE {} ({})", table, definitions.join(", "));

        let projections = columns.iter().map(|c| dialect.select_expression(c)).collect();
        let placeholders = columns.iter().map(|c| dialect.placeholder(c)).collect();

        Ok(Self {
            type_id: TypeId::of::<T>(),
            table,
            columns,
            primary_key,
            builder_slots,
            projections,
            placeholders,
            create_table,
            indexes,
            statements: StatementCache::default(),
        })
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.primary_key.map(|i| &self.columns[i])
    }

    /// Column names of the builder parameters, in parameter order.
    pub fn builder_columns(&self) -> Vec<&'static str> {
        self.builder_slots.iter().map(|&i| self.columns[i].name).collect()
    }

    /// The `CREATE TABLE` statement, foreign key constraints last.
    pub fn create_table_statement(&self) -> &str {
        &self.create_table
    }

    pub fn drop_table_statement(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.table)
    }

    /// `CREATE INDEX` statements, issued after the table exists.
    pub fn index_statements(&self) -> &[String] {
        &self.indexes
    }

    pub(crate) fn key_index(&self) -> Result<usize, MappingError> {
        self.primary_key.ok_or(MappingError::MissingPrimaryKey { table: self.table })
    }

    pub(crate) fn key_column(&self) -> Result<&ColumnDescriptor, MappingError> {
        Ok(&self.columns[self.key_index()?])
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Per-database caches: table mappings (with their statement text) and
/// primary key counters. Dropped together when the database is rebound.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    mappings: DashMap<TypeId, Arc<TableMapping>>,
    pub(crate) keys: KeyAllocator,
}

impl Registry {
    /// Returns the cached mapping of `T`, extracting it on first use.
    ///
    /// Two callers racing on the first use may both extract; the first
    /// stored mapping wins and both get it. Failed extractions are not kept.
    pub(crate) fn mapping<T: Model>(&self, dialect: &dyn Dialect) -> Result<Arc<TableMapping>, Error> {
        let type_id = TypeId::of::<T>();
        if let Some(mapping) = self.mappings.get(&type_id) {
            return Ok(Arc::clone(mapping.value()));
        }

        let mapping = Arc::new(TableMapping::extract::<T>(dialect)?);
        log::trace!("extracted mapping of `{}`", mapping.table);

        Ok(Arc::clone(self.mappings.entry(type_id).or_insert(mapping).value()))
    }

    pub(crate) fn clear(&self) {
        self.mappings.clear();
        self.keys.clear();
    }
}
