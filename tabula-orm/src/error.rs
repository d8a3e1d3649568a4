//! # Error Module
//!
//! Every fallible operation in Tabula ORM returns [`Error`]. Configuration
//! mistakes in a mapped type surface as [`Error::Mapping`] and are never
//! retried; everything the backend rejects is wrapped in [`Error::Database`].

use sqlx::error::BoxDynError;
use thiserror::Error;

use crate::model::SemanticType;

/// A mistake in the declared metadata of a mapped type.
///
/// These indicate a programming error in the model definition and are
/// raised the first time the type is used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("mapped type `{type_name}` has an empty table name")]
    EmptyTableName { type_name: &'static str },

    #[error("table `{table}` declares no columns")]
    NoColumns { table: &'static str },

    #[error("table `{table}` has no primary key column")]
    MissingPrimaryKey { table: &'static str },

    #[error("table `{table}` marks more than one column as primary key")]
    MultiplePrimaryKeys { table: &'static str },

    #[error("table `{table}` declares column `{column}` twice")]
    DuplicateColumn { table: &'static str, column: &'static str },

    #[error("builder parameter `{parameter}` of table `{table}` does not name a column")]
    UnresolvedBuilderParameter { table: &'static str, parameter: &'static str },

    #[error("table `{table}` has no columns besides its primary key")]
    NoUpdatableColumns { table: &'static str },

    #[error("column `{column}` ({semantic}) cannot be declared in {dialect}: {reason}")]
    InvalidFacet {
        column: &'static str,
        semantic: SemanticType,
        dialect: &'static str,
        reason: String,
    },
}

/// The error type of every Tabula ORM operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete mapping metadata.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Any failure reported by the database or the driver.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// `insert` or `update` was called on a record whose key was never assigned.
    #[error("primary key of `{table}` is unset")]
    UnsetPrimaryKey { table: &'static str },

    #[error("batch size must be greater than zero")]
    InvalidBatchSize,

    /// A stored value could not be turned into the declared Rust type.
    #[error("cannot decode column `{column}`: {message}")]
    Decode { column: String, message: String },

    /// A value could not be bound to a statement parameter.
    #[error("cannot bind column `{column}`")]
    Encode {
        column: &'static str,
        #[source]
        source: BoxDynError,
    },
}

impl Error {
    /// Returns `true` for errors caused by the model definition rather than
    /// the database.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Mapping(_))
    }

    pub(crate) fn decode(column: impl Into<String>, message: impl ToString) -> Self {
        Error::Decode { column: column.into(), message: message.to_string() }
    }

    /// Attributes a decode failure to a named column.
    pub(crate) fn in_column(self, column: &str) -> Self {
        match self {
            Error::Decode { message, .. } => Error::Decode { column: column.to_string(), message },
            other => other,
        }
    }
}
