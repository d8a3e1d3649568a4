use std::fmt;

use crate::{Error, value::Value};

/// Default length of string, enum and byte columns.
pub const DEFAULT_LENGTH: u32 = 255;
/// Default precision of decimal columns.
pub const DEFAULT_PRECISION: u32 = 15;
/// Default scale of decimal columns.
pub const DEFAULT_SCALE: u32 = 6;

/// The abstract kind of a column value, independent of how a dialect stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Int,
    Long,
    Boolean,
    String,
    Decimal,
    /// An instant stored as milliseconds since the Unix epoch.
    Date,
    /// A calendar date stored as days since the Unix epoch.
    LocalDate,
    /// An enum stored by variant name.
    Enum,
    Bytes,
    Uuid,
    Json,
}

impl SemanticType {
    /// Returns `true` for the types a primary key counter can be kept for.
    pub fn is_integer(self) -> bool {
        matches!(self, SemanticType::Int | SemanticType::Long)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::Int => "int",
            SemanticType::Long => "long",
            SemanticType::Boolean => "boolean",
            SemanticType::String => "string",
            SemanticType::Decimal => "decimal",
            SemanticType::Date => "date",
            SemanticType::LocalDate => "local-date",
            SemanticType::Enum => "enum",
            SemanticType::Bytes => "bytes",
            SemanticType::Uuid => "uuid",
            SemanticType::Json => "json",
        };
        f.write_str(name)
    }
}

/// Referential action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceOption {
    Restrict,
    Cascade,
    SetNull,
    NoAction,
    /// No clause is emitted; the backend default applies.
    #[default]
    None,
}

impl ReferenceOption {
    /// The SQL keyword of this action, or `None` when no clause is emitted.
    pub fn as_sql(self) -> Option<&'static str> {
        match self {
            ReferenceOption::Restrict => Some("RESTRICT"),
            ReferenceOption::Cascade => Some("CASCADE"),
            ReferenceOption::SetNull => Some("SET NULL"),
            ReferenceOption::NoAction => Some("NO ACTION"),
            ReferenceOption::None => None,
        }
    }
}

/// A foreign key from a column to a column of another mapped table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Table name of the referenced model.
    pub table: &'static str,
    /// Referenced column.
    pub column: &'static str,
    pub on_update: ReferenceOption,
    pub on_delete: ReferenceOption,
}

impl ForeignKey {
    pub fn new(table: &'static str, column: &'static str) -> Self {
        Self { table, column, on_update: ReferenceOption::None, on_delete: ReferenceOption::None }
    }

    pub fn on_update(mut self, option: ReferenceOption) -> Self {
        self.on_update = option;
        self
    }

    pub fn on_delete(mut self, option: ReferenceOption) -> Self {
        self.on_delete = option;
        self
    }
}

/// An index created over a single column after its table exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub unique: bool,
}

/// Metadata of one mapped column.
///
/// Usually produced by `#[derive(Model)]`; hand-written models build it
/// with [`ColumnDescriptor::new`] and the chained setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// The column name in the database.
    pub name: &'static str,
    pub semantic: SemanticType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    pub primary_key: bool,
    pub length: u32,
    pub precision: u32,
    pub scale: u32,
    pub foreign_key: Option<ForeignKey>,
    pub index: Option<IndexSpec>,
}

impl ColumnDescriptor {
    pub fn new(name: &'static str, semantic: SemanticType) -> Self {
        Self {
            name,
            semantic,
            nullable: false,
            primary_key: false,
            length: DEFAULT_LENGTH,
            precision: DEFAULT_PRECISION,
            scale: DEFAULT_SCALE,
            foreign_key: None,
            index: None,
        }
    }

    /// Marks the column as primary key. A primary key is never nullable.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable && !self.primary_key;
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    pub fn index(mut self, name: &'static str, unique: bool) -> Self {
        self.index = Some(IndexSpec { name, unique });
        self
    }
}

/// How instances of a mapped type are created from a row.
pub enum Construction<T> {
    /// Default-construct, then assign each column by its position in
    /// [`Model::columns`].
    FieldAssign {
        create: fn() -> T,
        assign: fn(&mut T, usize, Value) -> Result<(), Error>,
    },
    /// Call one constructor with the values of `parameters`, in that order.
    Builder {
        build: fn(Vec<Value>) -> Result<T, Error>,
        /// Column name of each constructor parameter.
        parameters: &'static [&'static str],
    },
}

/// A type mapped to exactly one database table.
///
/// This trait is typically implemented via `#[derive(Model)]`.
///
/// # Example
///
/// ```rust,ignore
/// use tabula_orm::Model;
///
/// #[derive(Model, Default)]
/// #[orm(table = "book")]
/// struct Book {
///     #[orm(primary_key)]
///     id: i32,
///     #[orm(length = 100)]
///     title: String,
/// }
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    /// Returns the table name associated with this model.
    fn table_name() -> &'static str;

    /// Returns the column metadata, in declaration order.
    fn columns() -> Vec<ColumnDescriptor>;

    /// Returns how rows are turned into instances.
    fn construction() -> Construction<Self>;

    /// Returns the column values of this instance, in the order of [`Model::columns`].
    fn values(&self) -> Vec<Value>;

    /// Writes `value` into the primary key field. Fails for a type without
    /// a primary key.
    fn set_primary_key(&mut self, value: Value) -> Result<(), Error>;
}
