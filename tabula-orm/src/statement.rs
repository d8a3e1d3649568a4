//! # Statement Module
//!
//! Parameterized statement text for a [`TableMapping`]. Each text is built
//! the first time it is asked for and then handed out as the same shared
//! string for the lifetime of the mapping. Placeholders follow column order.

use std::sync::{Arc, OnceLock};

use crate::{MappingError, mapping::TableMapping};

#[derive(Debug, Default)]
pub(crate) struct StatementCache {
    select_all: OnceLock<Arc<str>>,
    select_by_id: OnceLock<Arc<str>>,
    insert: OnceLock<Arc<str>>,
    update: OnceLock<Arc<str>>,
    delete_by_id: OnceLock<Arc<str>>,
    delete_all: OnceLock<Arc<str>>,
    max_key: OnceLock<Arc<str>>,
}

fn cached(slot: &OnceLock<Arc<str>>, table: &str, build: impl FnOnce() -> String) -> Arc<str> {
    Arc::clone(slot.get_or_init(|| {
        let sql = build();
        log::trace!("cached statement for `{}`: {}", table, sql);
        Arc::from(sql)
    }))
}

impl TableMapping {
    fn column_list(&self) -> String {
        self.columns.iter().map(|c| c.name).collect::<Vec<_>>().join(",")
    }

    fn placeholder_list(&self) -> String {
        format!("({})", self.placeholders.join(","))
    }

    fn key_condition(&self) -> Result<String, MappingError> {
        let key = self.key_index()?;
        Ok(format!(" WHERE {}={}", self.columns[key].name, self.placeholders[key]))
    }

    fn require_non_key_columns(&self) -> Result<(), MappingError> {
        let non_key = self.columns.iter().filter(|c| !c.primary_key).count();
        if non_key == 0 {
            return Err(MappingError::NoUpdatableColumns { table: self.table });
        }
        Ok(())
    }

    /// `SELECT <columns> FROM <table>`
    pub fn select_all_statement(&self) -> Arc<str> {
        cached(&self.statements.select_all, self.table, || {
            format!("SELECT {} FROM {}", self.projections.join(","), self.table)
        })
    }

    /// `SELECT <columns> FROM <table> WHERE <key>=?`
    pub fn select_by_id_statement(&self) -> Result<Arc<str>, MappingError> {
        let condition = self.key_condition()?;
        Ok(cached(&self.statements.select_by_id, self.table, || {
            format!("{}{}", self.select_all_statement(), condition)
        }))
    }

    /// `INSERT INTO <table> (<columns>) VALUES (<placeholders>)`
    pub fn insert_statement(&self) -> Result<Arc<str>, MappingError> {
        self.require_non_key_columns()?;
        Ok(cached(&self.statements.insert, self.table, || {
            format!("INSERT INTO {} ({}) VALUES {}", self.table, self.column_list(), self.placeholder_list())
        }))
    }

    /// `UPDATE <table> SET <column>=?,... WHERE <key>=?`, key bound last.
    pub fn update_statement(&self) -> Result<Arc<str>, MappingError> {
        let condition = self.key_condition()?;
        self.require_non_key_columns()?;
        Ok(cached(&self.statements.update, self.table, || {
            let assignments = self
                .columns
                .iter()
                .zip(&self.placeholders)
                .filter(|(c, _)| !c.primary_key)
                .map(|(c, p)| format!("{}={}", c.name, p))
                .collect::<Vec<_>>()
                .join(",");
            format!("UPDATE {} SET {}{}", self.table, assignments, condition)
        }))
    }

    /// `DELETE FROM <table> WHERE <key>=?`
    pub fn delete_by_id_statement(&self) -> Result<Arc<str>, MappingError> {
        let condition = self.key_condition()?;
        Ok(cached(&self.statements.delete_by_id, self.table, || format!("DELETE FROM {}{}", self.table, condition)))
    }

    pub fn delete_all_statement(&self) -> Arc<str> {
        cached(&self.statements.delete_all, self.table, || format!("DELETE FROM {}", self.table))
    }

    /// `SELECT MAX(<key>) AS <key> FROM <table>`, used to seed key counters.
    pub(crate) fn max_key_statement(&self) -> Result<Arc<str>, MappingError> {
        let key = self.key_column()?.name;
        Ok(cached(&self.statements.max_key, self.table, || format!("SELECT MAX({0}) AS {0} FROM {1}", key, self.table)))
    }

    /// A multi-row insert of `rows` records. Built per call since the row
    /// count varies between chunks.
    pub(crate) fn batch_insert_statement(&self, rows: usize) -> Result<String, MappingError> {
        self.require_non_key_columns()?;
        let values = vec![self.placeholder_list(); rows].join(",");
        Ok(format!("INSERT INTO {} ({}) VALUES {}", self.table, self.column_list(), values))
    }
}
