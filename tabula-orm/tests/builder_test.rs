use std::str::FromStr;

use rust_decimal::Decimal;
use tabula_orm::{Database, Model, Schema};

/// Immutable record built through its constructor. The constructor takes
/// its parameters in a different order than the columns are declared.
#[derive(Debug, Clone, Model, PartialEq)]
#[orm(table = "ledger_entry", builder = "LedgerEntry::new(amount, id, account)")]
struct LedgerEntry {
    #[orm(primary_key)]
    id: i64,
    #[orm(length = 34)]
    account: String,
    #[orm(precision = 12, scale = 2)]
    amount: Decimal,
}

impl LedgerEntry {
    fn new(amount: Decimal, id: i64, account: String) -> Self {
        Self { id, account, amount }
    }
}

#[tokio::test]
async fn test_builder_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    let schema = Schema::new().register::<LedgerEntry>();
    db.create_tables(&schema).await?;
    db.preload(&schema).await?;

    let entry = LedgerEntry::new(Decimal::from_str("-250.75")?, db.generate_primary_key::<LedgerEntry>()?, "DE89".into());
    assert_eq!(entry.id, 1);
    db.insert(entry.clone()).await?;

    assert_eq!(db.get::<LedgerEntry, _>(1i64).await?, Some(entry.clone()));

    let corrected = db.update(LedgerEntry { amount: Decimal::from_str("250.75")?, ..entry }).await?;
    assert_eq!(db.get_all::<LedgerEntry>().await?, vec![corrected]);

    Ok(())
}

#[tokio::test]
async fn test_builder_parameters_resolve_to_columns() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;

    let mapping = db.mapping::<LedgerEntry>()?;
    assert_eq!(mapping.builder_columns(), vec!["amount", "id", "account"]);
    assert_eq!(
        mapping.columns().iter().map(|c| c.name).collect::<Vec<_>>(),
        vec!["id", "account", "amount"]
    );

    Ok(())
}
