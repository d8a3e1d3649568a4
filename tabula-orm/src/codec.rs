//! # Codec Module
//!
//! Moves values between result rows, record instances and statement
//! parameters. Nothing here touches the database.

use sqlx::any::{AnyArguments, AnyRow};

use crate::{
    Error,
    dialect::Dialect,
    mapping::TableMapping,
    model::{ColumnDescriptor, Construction, Model},
    value::Value,
};

/// Builds an instance of `T` from one row selected with the mapping's
/// column projection.
pub(crate) fn row_to_instance<T: Model>(row: &AnyRow, mapping: &TableMapping, dialect: &dyn Dialect) -> Result<T, Error> {
    match T::construction() {
        Construction::FieldAssign { create, assign } => {
            let mut instance = create();
            for (index, column) in mapping.columns.iter().enumerate() {
                let value = dialect.read_value(row, column)?;
                assign(&mut instance, index, value).map_err(|e| e.in_column(column.name))?;
            }
            Ok(instance)
        }
        Construction::Builder { build, .. } => {
            let mut arguments = Vec::with_capacity(mapping.builder_slots.len());
            for &slot in &mapping.builder_slots {
                arguments.push(dialect.read_value(row, &mapping.columns[slot])?);
            }
            build(arguments)
        }
    }
}

/// Returns the values of `record` paired with their columns, in bind order.
///
/// Inserts bind every column in declaration order. Updates bind the non-key
/// columns first and the key last, matching the update statement.
pub(crate) fn instance_to_parameters<'m, T: Model>(
    record: &T,
    mapping: &'m TableMapping,
    is_update: bool,
) -> Result<Vec<(&'m ColumnDescriptor, Value)>, Error> {
    let values = record.values();
    if values.len() != mapping.columns.len() {
        return Err(Error::Encode {
            column: mapping.table,
            source: format!("expected {} values, found {}", mapping.columns.len(), values.len()).into(),
        });
    }

    let mut parameters: Vec<_> = mapping.columns.iter().zip(values).collect();
    if is_update {
        let key = mapping.key_index()?;
        let key_parameter = parameters.remove(key);
        parameters.push(key_parameter);
    }

    Ok(parameters)
}

/// Returns the key value of `record`, failing if it was never assigned.
pub(crate) fn assigned_key<T: Model>(record: &T, mapping: &TableMapping) -> Result<Value, Error> {
    let key = mapping.key_index()?;
    let value = record.values().into_iter().nth(key).unwrap_or(Value::Null);
    if value.is_unset_key() {
        return Err(Error::UnsetPrimaryKey { table: mapping.table });
    }
    Ok(value)
}

pub(crate) fn bind_all<'q>(
    dialect: &dyn Dialect,
    args: &mut AnyArguments<'q>,
    parameters: Vec<(&ColumnDescriptor, Value)>,
) -> Result<(), Error> {
    for (column, value) in parameters {
        dialect.bind_value(args, value, column)?;
    }
    Ok(())
}
