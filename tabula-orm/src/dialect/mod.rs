//! # Dialect Module
//!
//! A [`Dialect`] translates column metadata into DDL fragments and converts
//! values between their in-memory form and what travels over the sqlx `Any`
//! driver. There are exactly two implementations, [`SqliteDialect`] for the
//! embedded file engine and [`MySqlDialect`] for the client/server engine;
//! one is picked per database through [`DialectKind`].

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{
    Any, Arguments, Row,
    any::{AnyArguments, AnyRow},
};
use uuid::Uuid;

use crate::{
    Error, MappingError,
    database::Connection,
    model::{ColumnDescriptor, ForeignKey, SemanticType},
    value::{Value, from_epoch_day},
};

mod mysql;
mod sqlite;

pub use mysql::MySqlDialect;
pub use sqlite::SqliteDialect;

// ============================================================================
// Dialect Selection
// ============================================================================

/// The backend a [`Database`](crate::Database) talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// File-based embedded engine.
    Sqlite,
    /// Client/server engine.
    #[serde(alias = "my_sql")]
    MySql,
}

impl DialectKind {
    /// Returns the strategy implementing this dialect.
    pub fn strategy(self) -> Arc<dyn Dialect> {
        match self {
            DialectKind::Sqlite => Arc::new(SqliteDialect),
            DialectKind::MySql => Arc::new(MySqlDialect),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DialectKind::Sqlite => "sqlite",
            DialectKind::MySql => "mysql",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(DialectKind::Sqlite),
            "mysql" | "my_sql" => Ok(DialectKind::MySql),
            other => Err(format!("Unknown dialect: {}", other)),
        }
    }
}

// ============================================================================
// Dialect Trait
// ============================================================================

/// Per-backend translation of column metadata and values.
#[async_trait]
pub trait Dialect: fmt::Debug + Send + Sync {
    fn kind(&self) -> DialectKind;

    /// Largest number of bound parameters one statement may carry.
    fn max_parameters(&self) -> usize;

    /// Returns the type keyword of a column, with its length, precision and
    /// scale as the backend expects them.
    fn column_type(&self, column: &ColumnDescriptor) -> Result<String, MappingError>;

    /// Returns the column definition fragment (without the column name).
    ///
    /// A foreign key is not emitted inline; its constraint clause is pushed
    /// to `constraints` so it can follow the column list.
    fn column_clause(
        &self,
        column: &ColumnDescriptor,
        constraints: &mut Vec<String>,
    ) -> Result<String, MappingError> {
        let mut clause = self.column_type(column)?;

        if column.primary_key {
            clause.push_str(" PRIMARY KEY");
        }

        if !column.nullable {
            clause.push_str(" NOT NULL");
        }

        if let Some(key) = &column.foreign_key {
            constraints.push(self.foreign_key_clause(column, key));
        }

        Ok(clause)
    }

    fn foreign_key_clause(&self, column: &ColumnDescriptor, key: &ForeignKey) -> String {
        let mut clause = format!("FOREIGN KEY ({}) REFERENCES {}({})", column.name, key.table, key.column);

        if let Some(action) = key.on_update.as_sql() {
            clause.push_str(" ON UPDATE ");
            clause.push_str(action);
        }

        if let Some(action) = key.on_delete.as_sql() {
            clause.push_str(" ON DELETE ");
            clause.push_str(action);
        }

        clause
    }

    /// Returns the `CREATE INDEX` statement of a column, if it declares one.
    fn index_statement(&self, table: &str, column: &ColumnDescriptor) -> Option<String> {
        let index = column.index.as_ref()?;
        let unique = if index.unique { "UNIQUE " } else { "" };
        Some(format!("CREATE {}INDEX {} ON {}({})", unique, index.name, table, column.name))
    }

    /// Returns the expression a SELECT list uses to read a column.
    fn select_expression(&self, column: &ColumnDescriptor) -> Cow<'static, str> {
        Cow::Borrowed(column.name)
    }

    /// Returns the parameter marker used to write a column.
    fn placeholder(&self, _column: &ColumnDescriptor) -> &'static str {
        "?"
    }

    /// Reads one column of a result row.
    fn read_value(&self, row: &AnyRow, column: &ColumnDescriptor) -> Result<Value, Error>;

    /// Binds one value as the next statement parameter. NULL is bound with
    /// the type of the column so the backend sees a typed NULL.
    fn bind_value<'q>(
        &self,
        args: &mut AnyArguments<'q>,
        value: Value,
        column: &ColumnDescriptor,
    ) -> Result<(), Error>;

    /// Removes every row of the given tables.
    async fn truncate(&self, conn: &dyn Connection, tables: &[&'static str]) -> Result<(), Error>;
}

// ============================================================================
// Shared Helpers
// ============================================================================

/// Value produced for a NULL read from `column`.
///
/// Non-nullable primitive-like columns fall back to their zero value; every
/// other column keeps the NULL.
pub(crate) fn absent(column: &ColumnDescriptor) -> Value {
    if column.nullable {
        return Value::Null;
    }

    match column.semantic {
        SemanticType::Int => Value::Int(0),
        SemanticType::Long => Value::Long(0),
        SemanticType::Boolean => Value::Bool(false),
        SemanticType::String => Value::Text(String::new()),
        SemanticType::Bytes => Value::Bytes(Vec::new()),
        _ => Value::Null,
    }
}

pub(crate) fn get<'r, T>(row: &'r AnyRow, column: &ColumnDescriptor) -> Result<Option<T>, Error>
where
    T: sqlx::Decode<'r, Any> + sqlx::Type<Any>,
{
    Ok(row.try_get::<Option<T>, _>(column.name)?)
}

pub(crate) fn add<'q, T>(args: &mut AnyArguments<'q>, column: &ColumnDescriptor, value: T) -> Result<(), Error>
where
    T: 'q + sqlx::Encode<'q, Any> + sqlx::Type<Any>,
{
    args.add(value).map_err(|source| Error::Encode { column: column.name, source })
}

/// Milliseconds since the epoch of a date value. Instants finer than a
/// millisecond cannot be stored and are rejected.
pub(crate) fn epoch_millis(column: &ColumnDescriptor, value: DateTime<Utc>) -> Result<i64, Error> {
    if value.timestamp_subsec_nanos() % 1_000_000 != 0 {
        return Err(Error::Encode {
            column: column.name,
            source: format!("{value} has sub-millisecond precision").into(),
        });
    }
    Ok(value.timestamp_millis())
}

/// Decodes a column stored as an integer.
pub(crate) fn decode_integer(column: &ColumnDescriptor, raw: Option<i64>) -> Result<Value, Error> {
    let Some(raw) = raw else {
        return Ok(absent(column));
    };

    let value = match column.semantic {
        SemanticType::Int => Value::Int(i32::try_from(raw).map_err(|e| Error::decode(column.name, e))?),
        SemanticType::Long => Value::Long(raw),
        SemanticType::Boolean => Value::Bool(raw != 0),
        SemanticType::Date => Value::Date(
            DateTime::from_timestamp_millis(raw)
                .ok_or_else(|| Error::decode(column.name, format!("{raw} is out of the date range")))?,
        ),
        SemanticType::LocalDate => Value::LocalDate(
            from_epoch_day(raw).ok_or_else(|| Error::decode(column.name, format!("{raw} is out of the date range")))?,
        ),
        other => {
            return Err(Error::decode(column.name, format!("{other} column cannot be read from an integer")));
        }
    };

    Ok(value)
}

/// Decodes a column stored as text.
pub(crate) fn decode_text(column: &ColumnDescriptor, raw: Option<String>) -> Result<Value, Error> {
    let Some(raw) = raw else {
        return Ok(absent(column));
    };

    let value = match column.semantic {
        SemanticType::String | SemanticType::Enum => Value::Text(raw),
        SemanticType::Decimal => Value::Decimal(
            Decimal::from_str(raw.trim())
                .or_else(|_| Decimal::from_scientific(raw.trim()))
                .map_err(|e| Error::decode(column.name, e))?,
        ),
        SemanticType::Uuid => Value::Uuid(Uuid::parse_str(raw.trim()).map_err(|e| Error::decode(column.name, e))?),
        SemanticType::Json => Value::Json(serde_json::from_str(&raw).map_err(|e| Error::decode(column.name, e))?),
        other => {
            return Err(Error::decode(column.name, format!("{other} column cannot be read from text")));
        }
    };

    Ok(value)
}

pub(crate) fn varchar(dialect: DialectKind, column: &ColumnDescriptor, length: u32) -> Result<String, MappingError> {
    if length == 0 {
        return Err(invalid_facet(dialect, column, "length must be greater than zero"));
    }
    Ok(format!("VARCHAR({})", length))
}

pub(crate) fn invalid_facet(dialect: DialectKind, column: &ColumnDescriptor, reason: impl Into<String>) -> MappingError {
    MappingError::InvalidFacet {
        column: column.name,
        semantic: column.semantic,
        dialect: dialect.name(),
        reason: reason.into(),
    }
}
