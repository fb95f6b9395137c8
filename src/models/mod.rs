//! Persisted entities for the car catalogue.
//!
//! These map to the SQLite tables in `migrations/0001_init.sql` via
//! `sqlx::FromRow`. Wire representations live in `crate::serializers`; the
//! structs here are never handed to clients directly.

pub mod car;
pub mod review;
pub mod showroom;
pub mod user;
