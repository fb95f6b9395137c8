//! A showroom that stocks cars.

use sqlx::FromRow;

/// A physical showroom. Deleting it removes every car it owns.
#[derive(Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Showroom {
    pub id: i64,

    /// Display name of the showroom.
    pub name: String,

    /// Free-form address or city.
    pub location: String,

    /// Public website, always an http(s) URL.
    pub website: String,
}

/// A validated showroom ready for persistence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewShowroom {
    pub name: String,
    pub location: String,
    pub website: String,
}
