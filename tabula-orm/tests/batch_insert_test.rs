use tabula_orm::{DEFAULT_BATCH_SIZE, Database, Error, Model, Schema};

#[derive(Debug, Clone, Model, PartialEq, Default)]
struct BatchUser {
    #[orm(primary_key)]
    id: i64,
    #[orm(length = 50)]
    name: String,
    age: Option<i32>,
}

async fn setup() -> Result<Database, Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    let schema = Schema::new().register::<BatchUser>();
    db.create_tables(&schema).await?;
    db.preload(&schema).await?;
    Ok(db)
}

fn users(db: &Database, count: usize) -> Result<Vec<BatchUser>, Error> {
    (0..count)
        .map(|n| {
            Ok(BatchUser {
                id: db.generate_primary_key::<BatchUser>()?,
                name: format!("user {}", n),
                // Every third user has no age, to bind NULLs inside a batch.
                age: if n % 3 == 0 { None } else { Some(n as i32) },
            })
        })
        .collect()
}

#[tokio::test]
async fn test_batch_insert_partial_last_chunk() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let users = users(&db, 23)?;
    let written = db.batch_insert(5, &users).await?;
    assert_eq!(written, 23);

    let mut fetched = db.get_all::<BatchUser>().await?;
    fetched.sort_by_key(|u| u.id);
    assert_eq!(fetched, users);

    Ok(())
}

#[tokio::test]
async fn test_batch_insert_exact_multiple() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let users = users(&db, 2 * DEFAULT_BATCH_SIZE)?;
    assert_eq!(db.batch_insert(DEFAULT_BATCH_SIZE, &users).await?, users.len() as u64);
    assert_eq!(db.get_all::<BatchUser>().await?.len(), users.len());

    Ok(())
}

#[tokio::test]
async fn test_batch_larger_than_input() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let users = users(&db, 3)?;
    assert_eq!(db.batch_insert(1000, &users).await?, 3);
    assert_eq!(db.get::<BatchUser, _>(users[1].id).await?, Some(users[1].clone()));

    assert_eq!(db.batch_insert::<BatchUser>(10, &[]).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_batch_insert_rejects_bad_input() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let users = users(&db, 2)?;
    assert!(matches!(db.batch_insert(0, &users).await, Err(Error::InvalidBatchSize)));

    let unkeyed = vec![users[0].clone(), BatchUser { id: 0, ..users[1].clone() }];
    assert!(matches!(db.batch_insert(10, &unkeyed).await, Err(Error::UnsetPrimaryKey { .. })));

    // Nothing was written by the rejected calls.
    assert!(db.get_all::<BatchUser>().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_batch_beyond_parameter_limit_is_split() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    // 12,000 rows of 3 columns bind more values than one SQLite statement accepts.
    let users = users(&db, 12_000)?;
    assert_eq!(db.batch_insert(100_000, &users).await?, 12_000);

    let fetched = db.get_all::<BatchUser>().await?;
    assert_eq!(fetched.len(), users.len());
    assert_eq!(db.get::<BatchUser, _>(users[11_999].id).await?, Some(users[11_999].clone()));

    Ok(())
}
