use std::sync::Arc;

use crate::{
    Error,
    dialect::Dialect,
    mapping::{Registry, TableMapping},
    model::Model,
};

type ExtractFn = fn(&Registry, &dyn Dialect) -> Result<Arc<TableMapping>, Error>;

/// An ordered list of mapped types.
///
/// Register parents before the types that hold foreign keys to them;
/// tables are created in this order and dropped in reverse.
///
/// # Example
///
/// ```rust,ignore
/// let schema = Schema::new().register::<Author>().register::<Book>();
/// db.create_tables(&schema).await?;
/// db.preload(&schema).await?;
/// ```
#[derive(Clone, Default)]
pub struct Schema {
    entries: Vec<(&'static str, ExtractFn)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a mapped type.
    pub fn register<T: Model>(mut self) -> Self {
        self.entries.push((std::any::type_name::<T>(), Registry::mapping::<T>));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves every registered type, in registration order.
    pub(crate) fn mappings(&self, registry: &Registry, dialect: &dyn Dialect) -> Result<Vec<Arc<TableMapping>>, Error> {
        self.entries.iter().map(|(_, extract)| extract(registry, dialect)).collect()
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|(name, _)| name)).finish()
    }
}
