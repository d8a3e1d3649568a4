//! # Database Module
//!
//! This module provides the data source handle of Tabula ORM: the connection
//! pool, the selected dialect and the per-source caches. Every CRUD, DDL and
//! key allocation operation of the engine is a method of [`Database`].

// ============================================================================
// External Crate Imports
// ============================================================================

use futures::future::BoxFuture;
use sqlx::{AnyPool, any::AnyArguments, any::AnyPoolOptions};
use std::any::TypeId;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    Error, Model, Schema,
    codec::{assigned_key, bind_all, instance_to_parameters, row_to_instance},
    dialect::{Dialect, DialectKind},
    mapping::{Registry, TableMapping},
    model::SemanticType,
    value::{ColumnValue, Value},
};

// ============================================================================
// Database Struct
// ============================================================================

/// The main entry point for Tabula ORM operations.
///
/// `Database` binds a connection pool to one [`Dialect`] and owns the caches
/// of that data source: table mappings, statement text and primary key
/// counters. Clones share all of it. Connecting again yields a fresh
/// `Database` with empty caches.
#[derive(Debug, Clone)]
pub struct Database {
    /// The underlying SQLx connection pool
    pub(crate) pool: AnyPool,
    pub(crate) dialect: Arc<dyn Dialect>,
    pub(crate) registry: Arc<Registry>,
}

// ============================================================================
// Database Implementation
// ============================================================================

impl Database {
    /// Creates a new DatabaseBuilder for configuring the connection.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Connects to a database using the provided connection string.
    pub async fn connect(url: &str, dialect: DialectKind) -> Result<Self, Error> {
        DatabaseBuilder::new().dialect(dialect).connect(url).await
    }

    pub fn dialect(&self) -> DialectKind {
        self.dialect.kind()
    }

    /// Returns the cached mapping of `T`, extracting it on first use.
    pub fn mapping<T: Model>(&self) -> Result<Arc<TableMapping>, Error> {
        self.registry.mapping::<T>(self.dialect.as_ref())
    }

    /// Drops every cached mapping, statement and key counter.
    pub fn reset(&self) {
        self.registry.clear();
    }

    async fn run(&self, sql: &str) -> Result<(), Error> {
        log::debug!("{}", sql);
        self.execute(sql, AnyArguments::default()).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------------

    /// Drops the tables of `schema` in reverse order, then creates them in
    /// order, each followed by its indexes.
    pub async fn create_tables(&self, schema: &Schema) -> Result<(), Error> {
        let mappings = schema.mappings(&self.registry, self.dialect.as_ref())?;

        for mapping in mappings.iter().rev() {
            self.run(&mapping.drop_table_statement()).await?;
        }

        for mapping in &mappings {
            self.run(mapping.create_table_statement()).await?;
            for index in mapping.index_statements() {
                self.run(index).await?;
            }
        }

        Ok(())
    }

    /// Drops the tables of `schema` in reverse order.
    pub async fn drop_tables(&self, schema: &Schema) -> Result<(), Error> {
        let mappings = schema.mappings(&self.registry, self.dialect.as_ref())?;
        for mapping in mappings.iter().rev() {
            self.run(&mapping.drop_table_statement()).await?;
        }
        Ok(())
    }

    /// Removes every row of the tables of `schema` and resets their key
    /// counters, so the next allocated key is 1.
    ///
    /// Tables are emptied in reverse order, dependents before their parents.
    pub async fn truncate(&self, schema: &Schema) -> Result<(), Error> {
        let mappings = schema.mappings(&self.registry, self.dialect.as_ref())?;
        let tables: Vec<&'static str> = mappings.iter().rev().map(|m| m.table).collect();

        self.dialect.truncate(self, &tables).await?;

        for mapping in &mappings {
            self.registry.keys.reset(mapping.type_id);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Primary keys
    // ------------------------------------------------------------------------

    /// Seeds the key counter of every integer-keyed type in `schema` with
    /// the largest stored key (0 for an empty table).
    ///
    /// Call once after connecting and before allocating keys; otherwise
    /// allocated keys may collide with existing rows.
    pub async fn preload(&self, schema: &Schema) -> Result<(), Error> {
        for mapping in schema.mappings(&self.registry, self.dialect.as_ref())? {
            let Some(key) = mapping.primary_key() else {
                log::debug!("`{}` has no primary key, no counter to seed", mapping.table);
                continue;
            };
            if !key.semantic.is_integer() {
                log::debug!("`{}` has a {} key, no counter to seed", mapping.table, key.semantic);
                continue;
            }

            let sql = mapping.max_key_statement()?;
            let row = self.fetch_one(&sql, AnyArguments::default()).await?;
            let seed = match self.dialect.read_value(&row, key)? {
                Value::Int(v) => i64::from(v),
                Value::Long(v) => v,
                _ => 0,
            };

            log::debug!("seeded key counter of `{}` at {}", mapping.table, seed);
            self.registry.keys.seed(mapping.type_id, seed);
        }
        Ok(())
    }

    /// Returns the next primary key of `T`. Keys of one type are unique and
    /// strictly increasing across every clone of this database.
    pub fn generate_primary_key<T: Model>(&self) -> Result<i64, Error> {
        let mapping = self.mapping::<T>()?;
        mapping.key_column()?;

        let type_id = TypeId::of::<T>();
        if !self.registry.keys.is_seeded(type_id) {
            log::warn!("allocating a key of `{}` before preload, counting from 0", mapping.table);
        }
        Ok(self.registry.keys.next(type_id))
    }

    /// Sets the key counter of `T` back to 0.
    pub fn reset_primary_key<T: Model>(&self) {
        self.registry.keys.reset(TypeId::of::<T>());
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Returns the record of `T` whose key is `id`, if any.
    pub async fn get<T, K>(&self, id: K) -> Result<Option<T>, Error>
    where
        T: Model,
        K: ColumnValue,
    {
        let mapping = self.mapping::<T>()?;
        let sql = mapping.select_by_id_statement()?;

        let mut args = AnyArguments::default();
        self.dialect.bind_value(&mut args, id.to_value(), mapping.key_column()?)?;

        match self.fetch_optional(&sql, args).await? {
            Some(row) => Ok(Some(row_to_instance(&row, &mapping, self.dialect.as_ref())?)),
            None => Ok(None),
        }
    }

    /// Returns every record of `T`.
    pub async fn get_all<T: Model>(&self) -> Result<Vec<T>, Error> {
        let mapping = self.mapping::<T>()?;
        let sql = mapping.select_all_statement();

        let rows = self.fetch_all(&sql, AnyArguments::default()).await?;
        rows.iter().map(|row| row_to_instance(row, &mapping, self.dialect.as_ref())).collect()
    }

    /// Fills `target` with every record of `T`, keyed by primary key.
    /// Returns the number of records read.
    pub async fn get_all_into<T, K>(&self, target: &mut HashMap<K, T>) -> Result<usize, Error>
    where
        T: Model,
        K: ColumnValue + Eq + Hash,
    {
        let mapping = self.mapping::<T>()?;
        let key = mapping.key_column()?;
        let sql = mapping.select_all_statement();

        let rows = self.fetch_all(&sql, AnyArguments::default()).await?;
        for row in &rows {
            let id = K::from_value(self.dialect.read_value(row, key)?).map_err(|e| e.in_column(key.name))?;
            target.insert(id, row_to_instance(row, &mapping, self.dialect.as_ref())?);
        }
        Ok(rows.len())
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Inserts `record`. Its primary key must already be assigned.
    pub async fn insert<T: Model>(&self, record: T) -> Result<T, Error> {
        let mapping = self.mapping::<T>()?;
        assigned_key(&record, &mapping)?;
        let sql = mapping.insert_statement()?;

        let mut args = AnyArguments::default();
        bind_all(self.dialect.as_ref(), &mut args, instance_to_parameters(&record, &mapping, false)?)?;

        self.execute(&sql, args).await?;
        Ok(record)
    }

    /// Inserts `records` in chunks of `batch_size`, one statement per chunk.
    /// Returns the number of rows written.
    pub async fn batch_insert<T: Model>(&self, batch_size: usize, records: &[T]) -> Result<u64, Error> {
        if batch_size == 0 {
            return Err(Error::InvalidBatchSize);
        }

        let mapping = self.mapping::<T>()?;
        for record in records {
            assigned_key(record, &mapping)?;
        }

        // Each statement binds every column of every row it carries.
        let rows_per_statement = (self.dialect.max_parameters() / mapping.columns.len()).max(1);
        let step = batch_size.min(rows_per_statement);
        if step < batch_size {
            log::debug!("splitting batches of `{}` into statements of {} rows", mapping.table, step);
        }

        let mut written = 0;
        for chunk in records.chunks(step) {
            let sql = mapping.batch_insert_statement(chunk.len())?;

            let mut args = AnyArguments::default();
            for record in chunk {
                bind_all(self.dialect.as_ref(), &mut args, instance_to_parameters(record, &mapping, false)?)?;
            }

            written += self.execute(&sql, args).await?.rows_affected();
        }

        log::debug!("batch inserted {} rows into `{}`", written, mapping.table);
        Ok(written)
    }

    /// Stores `record`: a record with an unset key gets the next allocated
    /// key and is inserted, any other record updates the row with its key.
    /// Returns the stored record.
    pub async fn put<T: Model>(&self, mut record: T) -> Result<T, Error> {
        let mapping = self.mapping::<T>()?;
        let key = mapping.key_column()?;

        match assigned_key(&record, &mapping) {
            Ok(_) => return self.update(record).await,
            Err(Error::UnsetPrimaryKey { .. }) => {}
            Err(e) => return Err(e),
        }

        if !key.semantic.is_integer() {
            return Err(Error::UnsetPrimaryKey { table: mapping.table });
        }

        let id = self.generate_primary_key::<T>()?;
        let id = match key.semantic {
            SemanticType::Int => {
                Value::Int(i32::try_from(id).map_err(|e| Error::Encode { column: key.name, source: e.into() })?)
            }
            _ => Value::Long(id),
        };
        record.set_primary_key(id)?;
        self.insert(record).await
    }

    /// Writes every non-key column of `record` to the row with its key.
    pub async fn update<T: Model>(&self, record: T) -> Result<T, Error> {
        let mapping = self.mapping::<T>()?;
        assigned_key(&record, &mapping)?;
        let sql = mapping.update_statement()?;

        let mut args = AnyArguments::default();
        bind_all(self.dialect.as_ref(), &mut args, instance_to_parameters(&record, &mapping, true)?)?;

        self.execute(&sql, args).await?;
        Ok(record)
    }

    /// Deletes the row of `record`. Returns `true` if a row was removed.
    pub async fn delete<T: Model>(&self, record: &T) -> Result<bool, Error> {
        let mapping = self.mapping::<T>()?;
        let key = mapping.key_index()?;
        let id = record.values().into_iter().nth(key).unwrap_or(Value::Null);
        self.delete_key(&mapping, id).await
    }

    /// Deletes the row of `T` whose key is `id`. Returns `true` if a row was
    /// removed.
    pub async fn delete_by_id<T, K>(&self, id: K) -> Result<bool, Error>
    where
        T: Model,
        K: ColumnValue,
    {
        let mapping = self.mapping::<T>()?;
        self.delete_key(&mapping, id.to_value()).await
    }

    async fn delete_key(&self, mapping: &TableMapping, id: Value) -> Result<bool, Error> {
        let sql = mapping.delete_by_id_statement()?;

        let mut args = AnyArguments::default();
        self.dialect.bind_value(&mut args, id, mapping.key_column()?)?;

        Ok(self.execute(&sql, args).await?.rows_affected() > 0)
    }

    /// Deletes every row of `T`. Returns the number of rows removed.
    pub async fn delete_all<T: Model>(&self) -> Result<u64, Error> {
        let mapping = self.mapping::<T>()?;
        let sql = mapping.delete_all_statement();
        Ok(self.execute(&sql, AnyArguments::default()).await?.rows_affected())
    }
}

// ============================================================================
// DatabaseBuilder Struct
// ============================================================================

/// Configures and opens a [`Database`].
#[derive(Debug, Clone)]
pub struct DatabaseBuilder {
    max_connections: u32,
    dialect: DialectKind,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self { max_connections: 5, dialect: DialectKind::Sqlite }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    fn options(&self) -> AnyPoolOptions {
        sqlx::any::install_default_drivers();
        AnyPoolOptions::new().max_connections(self.max_connections)
    }

    fn finish(self, pool: AnyPool) -> Database {
        log::debug!("opened {} data source", self.dialect);
        Database { pool, dialect: self.dialect.strategy(), registry: Arc::new(Registry::default()) }
    }

    /// Opens the pool and connects once.
    pub async fn connect(self, url: &str) -> Result<Database, Error> {
        let pool = self.options().connect(url).await?;
        Ok(self.finish(pool))
    }

    /// Builds the pool without connecting. Statement text and mappings are
    /// available right away; the first round trip opens a connection.
    pub fn connect_lazy(self, url: &str) -> Result<Database, Error> {
        let pool = self.options().connect_lazy(url)?;
        Ok(self.finish(pool))
    }
}

// ============================================================================
// Connection Trait
// ============================================================================

/// Executes statement text with bound arguments.
pub trait Connection: Send + Sync {
    /// Runs a statement that returns no rows.
    fn execute<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<sqlx::any::AnyQueryResult, sqlx::Error>>;
    /// Returns every row the query yields.
    fn fetch_all<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Vec<sqlx::any::AnyRow>, sqlx::Error>>;
    /// Returns the single row the query yields, failing when there is none.
    fn fetch_one<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<sqlx::any::AnyRow, sqlx::Error>>;
    /// Returns the first row the query yields, if any.
    fn fetch_optional<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Option<sqlx::any::AnyRow>, sqlx::Error>>;
}

impl Connection for Database {
    fn execute<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<sqlx::any::AnyQueryResult, sqlx::Error>> {
        Box::pin(async move { sqlx::query_with(sql, args).execute(&self.pool).await })
    }
    fn fetch_all<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Vec<sqlx::any::AnyRow>, sqlx::Error>> {
        Box::pin(async move { sqlx::query_with(sql, args).fetch_all(&self.pool).await })
    }
    fn fetch_one<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<sqlx::any::AnyRow, sqlx::Error>> {
        Box::pin(async move { sqlx::query_with(sql, args).fetch_one(&self.pool).await })
    }
    fn fetch_optional<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Option<sqlx::any::AnyRow>, sqlx::Error>> {
        Box::pin(async move { sqlx::query_with(sql, args).fetch_optional(&self.pool).await })
    }
}
