//! Storage layer.
//!
//! One contract, two interchangeable backends: [`handlers::MemStore`] keeps
//! everything in process memory (development, tests), [`handlers::PgStore`]
//! persists to PostgreSQL. All application code goes through the
//! [`handlers::Datastore`] trait and never knows which deployment it is
//! running against.

pub mod errors;
pub mod handlers;
pub mod models;
