//! # Value Module
//!
//! [`Value`] is the in-memory form of a column value as it travels between a
//! record and a statement. [`ColumnValue`] connects a Rust field type to its
//! [`SemanticType`] and converts in both directions.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, model::SemanticType};

/// Days from 0001-01-01 (day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i32),
    Long(i64),
    Bool(bool),
    /// Strings and enum variant names.
    Text(String),
    Decimal(Decimal),
    Date(DateTime<Utc>),
    LocalDate(NaiveDate),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` when this value cannot identify a stored row: NULL,
    /// a zero integer, an empty string or the nil UUID.
    pub fn is_unset_key(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int(v) => *v == 0,
            Value::Long(v) => *v == 0,
            Value::Text(v) => v.is_empty(),
            Value::Uuid(v) => v.is_nil(),
            _ => false,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Bool(_) => "boolean",
            Value::Text(_) => "text",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::LocalDate(_) => "local-date",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
        }
    }

    fn mismatch<T>(self, expected: SemanticType) -> Result<T, Error> {
        Err(Error::decode(
            expected.to_string(),
            format!("expected a {expected} value, found {}", self.kind()),
        ))
    }
}

/// Converts a calendar date to days since 1970-01-01.
pub fn epoch_day(date: NaiveDate) -> i64 {
    use chrono::Datelike;
    i64::from(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

/// Converts days since 1970-01-01 back to a calendar date.
pub fn from_epoch_day(days: i64) -> Option<NaiveDate> {
    let days = i32::try_from(days).ok()?.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?;
    NaiveDate::from_num_days_from_ce_opt(days)
}

/// A Rust type that can be stored in a mapped column.
pub trait ColumnValue: Sized {
    /// Semantic type of the column.
    const SEMANTIC: SemanticType;

    /// Whether the column is nullable unless declared otherwise.
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, Error>;
}

impl ColumnValue for i32 {
    const SEMANTIC: SemanticType = SemanticType::Int;

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Int(v) => Ok(v),
            Value::Long(v) => i32::try_from(v).map_err(|e| Error::decode("int", e)),
            Value::Null => Ok(0),
            other => other.mismatch(Self::SEMANTIC),
        }
    }
}

impl ColumnValue for i64 {
    const SEMANTIC: SemanticType = SemanticType::Long;

    fn to_value(&self) -> Value {
        Value::Long(*self)
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Long(v) => Ok(v),
            Value::Int(v) => Ok(i64::from(v)),
            Value::Null => Ok(0),
            other => other.mismatch(Self::SEMANTIC),
        }
    }
}

impl ColumnValue for bool {
    const SEMANTIC: SemanticType = SemanticType::Boolean;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Null => Ok(false),
            other => other.mismatch(Self::SEMANTIC),
        }
    }
}

impl ColumnValue for String {
    const SEMANTIC: SemanticType = SemanticType::String;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Null => Ok(String::new()),
            other => other.mismatch(Self::SEMANTIC),
        }
    }
}

impl ColumnValue for Vec<u8> {
    const SEMANTIC: SemanticType = SemanticType::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::Null => Ok(Vec::new()),
            other => other.mismatch(Self::SEMANTIC),
        }
    }
}

macro_rules! impl_column_value_object {
    ($($ty:ty => $semantic:ident($variant:ident)),* $(,)?) => {
        $(
            impl ColumnValue for $ty {
                const SEMANTIC: SemanticType = SemanticType::$semantic;

                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn from_value(value: Value) -> Result<Self, Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        Value::Null => Err(Error::decode(
                            Self::SEMANTIC.to_string(),
                            "unexpected NULL in a non-optional field",
                        )),
                        other => other.mismatch(Self::SEMANTIC),
                    }
                }
            }
        )*
    };
}

impl_column_value_object!(
    Decimal => Decimal(Decimal),
    DateTime<Utc> => Date(Date),
    NaiveDate => LocalDate(LocalDate),
    Uuid => Uuid(Uuid),
    serde_json::Value => Json(Json),
);

impl<T: ColumnValue> ColumnValue for Option<T> {
    const SEMANTIC: SemanticType = T::SEMANTIC;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Decodes the value of a named column. Used by `#[derive(Model)]`.
#[doc(hidden)]
pub fn decode_column<T: ColumnValue>(value: Value, column: &str) -> Result<T, Error> {
    T::from_value(value).map_err(|e| e.in_column(column))
}

/// Decodes an enum stored by variant name. Used by `#[derive(DbEnum)]`.
#[doc(hidden)]
pub fn decode_enum<T>(value: Value) -> Result<T, Error>
where
    T: FromStr<Err = String>,
{
    match value {
        Value::Text(name) => name.parse().map_err(|e: String| Error::decode("enum", e)),
        Value::Null => Err(Error::decode("enum", "unexpected NULL in a non-optional field")),
        other => other.mismatch(SemanticType::Enum),
    }
}
