//! Wire representations and the rules that guard them.
//!
//! Each entity has an `*Input` record (what a client may send), a
//! `validate` step producing the persistence-ready `New*` value or a
//! [`ValidationErrors`](crate::validation::ValidationErrors) set, and an
//! output record built from the stored entity.

pub mod car;
pub mod review;
pub mod showroom;
pub mod user;
