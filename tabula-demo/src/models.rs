use chrono::NaiveDate;
use rust_decimal::Decimal;
use tabula_orm::{DbEnum, Model};

#[derive(DbEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Genre {
    #[default]
    Fiction,
    Science,
    History,
}

#[derive(Model, Debug, Clone, PartialEq, Default)]
#[orm(table = "author")]
pub struct Author {
    #[orm(primary_key)]
    pub id: i32,
    #[orm(length = 100, unique)]
    pub name: String,
}

#[derive(Model, Debug, Clone, PartialEq, Default)]
#[orm(table = "book")]
pub struct Book {
    #[orm(primary_key)]
    pub id: i32,
    #[orm(length = 200, index)]
    pub title: String,
    #[orm(foreign_key = "Author::id", on_delete = "set_null")]
    pub author_id: Option<i32>,
    pub genre: Genre,
    #[orm(precision = 10, scale = 2)]
    pub price: Decimal,
    pub published: Option<NaiveDate>,
}
