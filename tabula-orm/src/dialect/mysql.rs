use std::borrow::Cow;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use sqlx::{
    Row,
    any::{AnyArguments, AnyRow},
};

use super::{Dialect, DialectKind, absent, add, decode_integer, decode_text, epoch_millis, get, invalid_facet, varchar};
use crate::{
    Error, MappingError,
    database::Connection,
    model::{ColumnDescriptor, SemanticType},
    value::{Value, epoch_day},
};

/// The client/server engine.
///
/// Uses the native `BIGINT`, `DECIMAL` and `VARBINARY` types. Values the
/// `Any` driver cannot carry natively are converted in the statement text
/// itself (see [`Dialect::select_expression`] and [`Dialect::placeholder`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Reads a textual column, accepting values the server reports as binary
    /// strings.
    fn read_text(row: &AnyRow, column: &ColumnDescriptor) -> Result<Option<String>, Error> {
        match row.try_get::<Option<String>, _>(column.name) {
            Ok(text) => Ok(text),
            Err(sqlx::Error::ColumnDecode { .. }) => get::<Vec<u8>>(row, column)?
                .map(|bytes| String::from_utf8(bytes).map_err(|e| Error::decode(column.name, e)))
                .transpose(),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    // prepared statement placeholder limit
    fn max_parameters(&self) -> usize {
        65_535
    }

    fn column_type(&self, column: &ColumnDescriptor) -> Result<String, MappingError> {
        let ty = match column.semantic {
            SemanticType::String | SemanticType::Enum => varchar(self.kind(), column, column.length)?,
            SemanticType::Boolean => "BOOLEAN".to_string(),
            SemanticType::Int => "INTEGER".to_string(),
            SemanticType::Long | SemanticType::Date | SemanticType::LocalDate => "BIGINT".to_string(),
            SemanticType::Decimal => {
                if column.precision == 0 {
                    return Err(invalid_facet(self.kind(), column, "precision must be greater than zero"));
                }
                if column.scale > column.precision {
                    return Err(invalid_facet(
                        self.kind(),
                        column,
                        format!("scale {} exceeds precision {}", column.scale, column.precision),
                    ));
                }
                format!("DECIMAL({},{})", column.precision, column.scale)
            }
            SemanticType::Bytes => {
                if column.length == 0 {
                    return Err(invalid_facet(self.kind(), column, "length must be greater than zero"));
                }
                format!("VARBINARY({})", column.length)
            }
            SemanticType::Uuid => "BINARY(16)".to_string(),
            SemanticType::Json => "JSON".to_string(),
        };
        Ok(ty)
    }

    fn select_expression(&self, column: &ColumnDescriptor) -> Cow<'static, str> {
        let name = column.name;
        match column.semantic {
            SemanticType::Boolean => Cow::Owned(format!("CAST({0} AS SIGNED) AS {0}", name)),
            SemanticType::Decimal | SemanticType::Json => Cow::Owned(format!("CAST({0} AS CHAR) AS {0}", name)),
            SemanticType::Bytes => Cow::Owned(format!("TO_BASE64({0}) AS {0}", name)),
            SemanticType::Uuid => Cow::Owned(format!("BIN_TO_UUID({0}) AS {0}", name)),
            _ => Cow::Borrowed(name),
        }
    }

    fn placeholder(&self, column: &ColumnDescriptor) -> &'static str {
        match column.semantic {
            SemanticType::Uuid => "UUID_TO_BIN(?)",
            _ => "?",
        }
    }

    fn read_value(&self, row: &AnyRow, column: &ColumnDescriptor) -> Result<Value, Error> {
        match column.semantic {
            SemanticType::Int
            | SemanticType::Long
            | SemanticType::Boolean
            | SemanticType::Date
            | SemanticType::LocalDate => decode_integer(column, get::<i64>(row, column)?),
            SemanticType::Bytes => match Self::read_text(row, column)? {
                Some(encoded) => {
                    // TO_BASE64 wraps its output every 76 characters.
                    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                    let bytes = STANDARD.decode(compact).map_err(|e| Error::decode(column.name, e))?;
                    Ok(Value::Bytes(bytes))
                }
                None => Ok(absent(column)),
            },
            SemanticType::String
            | SemanticType::Enum
            | SemanticType::Decimal
            | SemanticType::Uuid
            | SemanticType::Json => decode_text(column, Self::read_text(row, column)?),
        }
    }

    fn bind_value<'q>(
        &self,
        args: &mut AnyArguments<'q>,
        value: Value,
        column: &ColumnDescriptor,
    ) -> Result<(), Error> {
        match value {
            Value::Null => match column.semantic {
                SemanticType::Int => add(args, column, None::<i32>),
                SemanticType::Boolean => add(args, column, None::<bool>),
                SemanticType::Long | SemanticType::Date | SemanticType::LocalDate => add(args, column, None::<i64>),
                SemanticType::Bytes => add(args, column, None::<Vec<u8>>),
                SemanticType::String
                | SemanticType::Enum
                | SemanticType::Decimal
                | SemanticType::Uuid
                | SemanticType::Json => add(args, column, None::<String>),
            },
            Value::Int(v) => add(args, column, v),
            Value::Long(v) => add(args, column, v),
            Value::Bool(v) => add(args, column, v),
            Value::Text(v) => add(args, column, v),
            Value::Decimal(v) => add(args, column, v.to_string()),
            Value::Date(v) => add(args, column, epoch_millis(column, v)?),
            Value::LocalDate(v) => add(args, column, epoch_day(v)),
            Value::Bytes(v) => add(args, column, v),
            Value::Uuid(v) => add(args, column, v.hyphenated().to_string()),
            Value::Json(v) => add(args, column, v.to_string()),
        }
    }

    async fn truncate(&self, conn: &dyn Connection, tables: &[&'static str]) -> Result<(), Error> {
        for table in tables {
            let sql = format!("TRUNCATE TABLE {}", table);
            log::debug!("{}", sql);
            conn.execute(&sql, AnyArguments::default()).await?;
        }
        Ok(())
    }
}
