use std::borrow::Cow;

use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyRow};

use super::{Dialect, DialectKind, absent, add, decode_integer, decode_text, epoch_millis, get, invalid_facet, varchar};
use crate::{
    Error, MappingError,
    database::Connection,
    model::{ColumnDescriptor, SemanticType},
    value::{Value, epoch_day},
};

/// The embedded file engine.
///
/// Weakly typed storage: wide numbers and instants live in `INTEGER`,
/// decimals are kept as text so no precision is lost, and booleans are 0/1.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

#[async_trait]
impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    // SQLITE_MAX_VARIABLE_NUMBER of the bundled library
    fn max_parameters(&self) -> usize {
        32_766
    }

    fn column_type(&self, column: &ColumnDescriptor) -> Result<String, MappingError> {
        let ty = match column.semantic {
            SemanticType::String | SemanticType::Enum => varchar(self.kind(), column, column.length)?,
            SemanticType::Boolean => "BOOLEAN".to_string(),
            SemanticType::Int | SemanticType::Long | SemanticType::Date | SemanticType::LocalDate => {
                "INTEGER".to_string()
            }
            SemanticType::Decimal => {
                if column.precision == 0 {
                    return Err(invalid_facet(self.kind(), column, "precision must be greater than zero"));
                }
                varchar(self.kind(), column, column.precision + 1)?
            }
            SemanticType::Bytes => "BLOB".to_string(),
            SemanticType::Uuid => "VARCHAR(36)".to_string(),
            SemanticType::Json => "TEXT".to_string(),
        };
        Ok(ty)
    }

    fn select_expression(&self, column: &ColumnDescriptor) -> Cow<'static, str> {
        match column.semantic {
            // The driver has no mapping for the BOOLEAN declared type.
            SemanticType::Boolean => Cow::Owned(format!("CAST({0} AS INTEGER) AS {0}", column.name)),
            _ => Cow::Borrowed(column.name),
        }
    }

    fn read_value(&self, row: &AnyRow, column: &ColumnDescriptor) -> Result<Value, Error> {
        match column.semantic {
            SemanticType::Int
            | SemanticType::Long
            | SemanticType::Boolean
            | SemanticType::Date
            | SemanticType::LocalDate => decode_integer(column, get::<i64>(row, column)?),
            SemanticType::Bytes => Ok(get::<Vec<u8>>(row, column)?.map(Value::Bytes).unwrap_or_else(|| absent(column))),
            SemanticType::String
            | SemanticType::Enum
            | SemanticType::Decimal
            | SemanticType::Uuid
            | SemanticType::Json => decode_text(column, get::<String>(row, column)?),
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
                SemanticType::Long | SemanticType::Boolean | SemanticType::Date | SemanticType::LocalDate => {
                    add(args, column, None::<i64>)
                }
                SemanticType::Bytes => add(args, column, None::<Vec<u8>>),
                SemanticType::String
                | SemanticType::Enum
                | SemanticType::Decimal
                | SemanticType::Uuid
                | SemanticType::Json => add(args, column, None::<String>),
            },
            Value::Int(v) => add(args, column, v),
            Value::Long(v) => add(args, column, v),
            Value::Bool(v) => add(args, column, i64::from(v)),
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
            let sql = format!("DELETE FROM {}", table);
            log::debug!("{}", sql);
            conn.execute(&sql, AnyArguments::default()).await?;
        }

        // Give the freed pages back to the file.
        log::debug!("VACUUM");
        conn.execute("VACUUM", AnyArguments::default()).await?;

        Ok(())
    }
}
