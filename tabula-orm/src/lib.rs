//! # Tabula ORM
//!
//! Maps plain structs to table rows through declared metadata and runs
//! primary-key CRUD, schema creation and key allocation against SQLite or
//! MySQL.
//!
//! ```rust,ignore
//! use tabula_orm::{Database, DialectKind, Model, Schema};
//!
//! #[derive(Model, Debug, Default, Clone, PartialEq)]
//! struct Book {
//!     #[orm(primary_key)]
//!     id: i32,
//!     title: String,
//! }
//!
//! let db = Database::connect("sqlite::memory:", DialectKind::Sqlite).await?;
//! let schema = Schema::new().register::<Book>();
//! db.create_tables(&schema).await?;
//! db.preload(&schema).await?;
//!
//! let id = db.generate_primary_key::<Book>()? as i32;
//! db.insert(Book { id, title: "Dune".into() }).await?;
//! let book: Option<Book> = db.get(id).await?;
//! ```

// ============================================================================
// Re-exports
// ============================================================================

pub use tabula_orm_macro::{DbEnum, Model};

// ============================================================================
// Module Declarations
// ============================================================================

mod codec;
pub mod database;
pub mod dialect;
pub mod error;
mod keys;
pub mod mapping;
pub mod model;
pub mod schema;
mod statement;
pub mod value;

// ============================================================================
// Public API
// ============================================================================

pub use database::{Connection, Database, DatabaseBuilder};
pub use dialect::{Dialect, DialectKind, MySqlDialect, SqliteDialect};
pub use error::{Error, MappingError};
pub use mapping::TableMapping;
pub use model::{
    ColumnDescriptor, Construction, DEFAULT_LENGTH, DEFAULT_PRECISION, DEFAULT_SCALE, ForeignKey, IndexSpec, Model,
    ReferenceOption, SemanticType,
};
pub use schema::Schema;
pub use value::{ColumnValue, Value};

/// Chunk size for [`Database::batch_insert`] when the caller has no better value.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Items used by code generated from the derive macros.
#[doc(hidden)]
pub mod __private {
    pub use crate::value::{decode_column, decode_enum};
}
