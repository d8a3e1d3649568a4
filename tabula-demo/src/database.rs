use std::env;

use tabula_orm::{Database, DialectKind, Schema};

use crate::models::{Author, Book};

pub fn schema() -> Schema {
    Schema::new().register::<Author>().register::<Book>()
}

/// Opens the configured data source and makes sure the tables exist.
pub async fn initialize() -> Result<Database, Box<dyn std::error::Error>> {
    let url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let dialect: DialectKind = env::var("DATABASE_DIALECT").unwrap_or_else(|_| "sqlite".to_string()).parse()?;

    let mut builder = Database::builder().dialect(dialect);
    if url.contains(":memory:") {
        // Every in-memory connection is its own database.
        builder = builder.max_connections(1);
    }
    let db = builder.connect(&url).await?;

    let schema = schema();
    db.create_tables(&schema).await?;
    db.preload(&schema).await?;

    Ok(db)
}
