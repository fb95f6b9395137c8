//! HTTP handlers, one module per resource.
//!
//! Every handler follows the same sequence: the [`Caller`](crate::auth::Caller)
//! extractor authenticates, a policy check authorizes, the body is validated
//! into a persistence-ready value, the service acts, and the result is
//! serialized.

pub mod car_handlers;
pub mod health_handlers;
pub mod review_handlers;
pub mod showroom_handlers;
pub mod user_handlers;
