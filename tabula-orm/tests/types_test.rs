use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tabula_orm::{Database, DbEnum, Error, Model, Schema};
use uuid::Uuid;

#[derive(DbEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Status {
    #[default]
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Model, PartialEq, Default)]
#[orm(table = "sample")]
struct Sample {
    #[orm(primary_key)]
    id: i64,
    small: i32,
    big: i64,
    flag: bool,
    #[orm(length = 64)]
    name: String,
    #[orm(precision = 20, scale = 6)]
    amount: Decimal,
    created: DateTime<Utc>,
    day: NaiveDate,
    status: Status,
    payload: Vec<u8>,
    token: Uuid,
    meta: serde_json::Value,
    note: Option<String>,
    maybe_small: Option<i32>,
    maybe_flag: Option<bool>,
    maybe_amount: Option<Decimal>,
    maybe_day: Option<NaiveDate>,
    maybe_status: Option<Status>,
    maybe_payload: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Model, PartialEq, Default)]
#[orm(table = "session")]
struct Session {
    #[orm(primary_key)]
    id: Uuid,
    user: String,
}

async fn setup() -> Result<Database, Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    db.create_tables(&Schema::new().register::<Sample>().register::<Session>()).await?;
    Ok(db)
}

fn full_sample(id: i64) -> Result<Sample, Box<dyn std::error::Error>> {
    Ok(Sample {
        id,
        small: i32::MIN,
        big: i64::MAX,
        flag: true,
        name: "Ünïcode name".to_string(),
        amount: Decimal::from_str("12345678901234.123456")?,
        created: DateTime::from_timestamp_millis(1_700_000_000_123).ok_or("bad instant")?,
        day: NaiveDate::from_ymd_opt(1969, 7, 20).ok_or("bad date")?,
        status: Status::Published,
        payload: vec![0, 1, 2, 254, 255],
        token: Uuid::new_v4(),
        meta: json!({ "tags": ["a", "b"], "count": 2 }),
        note: Some("kept".to_string()),
        maybe_small: Some(i32::MAX),
        maybe_flag: Some(false),
        maybe_amount: Some(Decimal::from_str("-0.5")?),
        maybe_day: NaiveDate::from_ymd_opt(2024, 2, 29),
        maybe_status: Some(Status::Archived),
        maybe_payload: Some(vec![9, 8, 7]),
    })
}

#[tokio::test]
async fn test_round_trip_every_type() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let sample = full_sample(1)?;
    db.insert(sample.clone()).await?;

    let fetched = db.get::<Sample, _>(1i64).await?.ok_or("sample missing")?;
    assert_eq!(fetched, sample);

    Ok(())
}

#[tokio::test]
async fn test_round_trip_absent_values_and_opposite_extremes() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let sample = Sample {
        id: i64::MAX,
        small: i32::MAX,
        big: i64::MIN,
        flag: false,
        name: String::new(),
        amount: Decimal::ZERO,
        created: DateTime::from_timestamp_millis(-86_400_000).ok_or("bad instant")?,
        day: NaiveDate::from_ymd_opt(1, 1, 1).ok_or("bad date")?,
        status: Status::Draft,
        payload: Vec::new(),
        token: Uuid::nil(),
        meta: serde_json::Value::Null,
        note: None,
        maybe_small: None,
        maybe_flag: None,
        maybe_amount: None,
        maybe_day: None,
        maybe_status: None,
        maybe_payload: None,
    };
    db.insert(sample.clone()).await?;

    let fetched = db.get::<Sample, _>(i64::MAX).await?.ok_or("sample missing")?;
    assert_eq!(fetched, sample);

    Ok(())
}

#[tokio::test]
async fn test_decimal_compares_by_value() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut sample = full_sample(2)?;
    sample.amount = Decimal::from_str("1.500000")?;
    db.insert(sample).await?;

    let fetched = db.get::<Sample, _>(2i64).await?.ok_or("sample missing")?;
    assert_eq!(fetched.amount, Decimal::from_str("1.5")?);

    Ok(())
}

#[tokio::test]
async fn test_enum_is_stored_by_variant_name() -> Result<(), Box<dyn std::error::Error>> {
    assert_eq!(Status::Archived.to_string(), "Archived");
    assert_eq!("Published".parse::<Status>(), Ok(Status::Published));
    assert!("published".parse::<Status>().is_err());

    let db = setup().await?;
    let mut sample = full_sample(3)?;
    sample.status = Status::Archived;
    sample.maybe_status = None;
    db.insert(sample.clone()).await?;

    let fetched = db.get::<Sample, _>(3i64).await?.ok_or("sample missing")?;
    assert_eq!(fetched.status, Status::Archived);
    assert_eq!(fetched.maybe_status, None);

    Ok(())
}

#[tokio::test]
async fn test_uuid_primary_key() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let session = Session { id: Uuid::new_v4(), user: "ada".to_string() };
    db.insert(session.clone()).await?;

    assert_eq!(db.get::<Session, _>(session.id).await?, Some(session.clone()));
    assert_eq!(db.get::<Session, _>(Uuid::new_v4()).await?, None);

    // Nothing to seed for a non-integer key.
    db.preload(&Schema::new().register::<Session>()).await?;

    assert!(db.delete(&session).await?);
    assert!(db.get_all::<Session>().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_sub_millisecond_instant_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let precise = Sample {
        created: DateTime::from_timestamp(1_700_000_000, 123_456_789).ok_or("bad instant")?,
        ..full_sample(7)?
    };
    assert!(matches!(db.insert(precise.clone()).await, Err(Error::Encode { column: "created", .. })));
    assert_eq!(db.get::<Sample, _>(7i64).await?, None);

    // The same instant cut to whole milliseconds is stored unchanged.
    let millis = Sample {
        created: DateTime::from_timestamp_millis(precise.created.timestamp_millis()).ok_or("bad instant")?,
        ..precise
    };
    db.insert(millis.clone()).await?;
    assert_eq!(db.get::<Sample, _>(7i64).await?, Some(millis));

    Ok(())
}
