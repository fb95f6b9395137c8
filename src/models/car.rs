//! Represents a car listing.

use rust_decimal::Decimal;
use sqlx::{FromRow, Row, sqlite::SqliteRow};
use std::str::FromStr;

/// A car offered for sale, optionally stocked by a showroom.
///
/// `price` is stored as TEXT so that decimal precision survives the round
/// trip through SQLite.
#[derive(Clone, Debug, PartialEq)]
pub struct Car {
    pub id: i64,

    pub car_name: String,

    /// Description; never equal to `car_name`.
    pub car_decstr: String,

    /// Listing visibility flag, false until an admin activates it.
    pub active: bool,

    /// Optional registration number, alphanumeric only.
    pub car_number: Option<String>,

    pub price: Option<Decimal>,

    /// Owning showroom, if any.
    pub showroom_id: Option<i64>,
}

impl<'r> FromRow<'r, SqliteRow> for Car {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let price = row
            .try_get::<Option<String>, _>("price")?
            .map(|raw| Decimal::from_str(&raw))
            .transpose()
            .map_err(|err| sqlx::Error::ColumnDecode {
                index: "price".into(),
                source: Box::new(err),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            car_name: row.try_get("car_name")?,
            car_decstr: row.try_get("car_decstr")?,
            active: row.try_get("active")?,
            car_number: row.try_get("car_number")?,
            price,
            showroom_id: row.try_get("showroom_id")?,
        })
    }
}

/// A validated car ready to be inserted or written over an existing row.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCar {
    pub car_name: String,
    pub car_decstr: String,
    pub active: bool,
    pub car_number: Option<String>,
    pub price: Decimal,
    pub showroom_id: Option<i64>,
}
