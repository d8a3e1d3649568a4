use std::env;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tabula_orm::{DEFAULT_BATCH_SIZE, DialectKind};

use crate::models::{Author, Book, Genre};

mod database;
mod models;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let batch_size = match env::var("BATCH_SIZE") {
        Ok(value) => value.parse()?,
        Err(_) => DEFAULT_BATCH_SIZE,
    };

    let db = database::initialize().await?;
    log::info!("connected to {} database", db.dialect());

    // An unset key makes `put` allocate one and insert.
    let author = db.put(Author { id: 0, name: "Frank Herbert".into() }).await?;
    log::info!("stored author {}", author.id);

    let dune = Book {
        id: db.generate_primary_key::<Book>()? as i32,
        title: "Dune".into(),
        author_id: Some(author.id),
        genre: Genre::Fiction,
        price: Decimal::from_str("9.99")?,
        published: NaiveDate::from_ymd_opt(1965, 8, 1),
    };
    let dune = db.insert(dune).await?;
    log::info!("inserted {:?}", db.get::<Book, _>(dune.id).await?);

    let dune = db.update(Book { title: "Dune Messiah".into(), ..dune }).await?;
    log::info!("renamed to {:?}", db.get::<Book, _>(dune.id).await?.map(|b| b.title));

    let mut shelf = Vec::new();
    for n in 0..250 {
        shelf.push(Book {
            id: db.generate_primary_key::<Book>()? as i32,
            title: format!("Volume {}", n + 1),
            author_id: Some(author.id),
            genre: Genre::History,
            price: Decimal::new(1250 + n, 2),
            published: None,
        });
    }
    let written = db.batch_insert(batch_size, &shelf).await?;
    log::info!("batch inserted {} books in chunks of {}", written, batch_size);

    db.delete(&author).await?;
    let orphans = db.get_all::<Book>().await?.into_iter().filter(|b| b.author_id.is_none()).count();
    log::info!("{} books lost their author", orphans);

    db.delete_by_id::<Book, _>(dune.id).await?;
    log::info!("after delete: {:?}", db.get::<Book, _>(dune.id).await?);

    match db.dialect() {
        DialectKind::Sqlite => db.truncate(&database::schema()).await?,
        DialectKind::MySql => {
            // TRUNCATE TABLE is refused on a table another table references.
            log::info!("mysql cannot truncate referenced tables, deleting rows instead");
            db.delete_all::<Book>().await?;
            db.delete_all::<Author>().await?;
            db.reset_primary_key::<Book>();
            db.reset_primary_key::<Author>();
        }
    }
    log::info!("next book key after truncate: {}", db.generate_primary_key::<Book>()?);

    Ok(())
}
