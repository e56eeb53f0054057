//! Management API layer.
//!
//! The REST surface the dashboard calls into, organized into:
//!
//! - **[`handlers`]**: axum route handlers
//! - **[`models`]**: request/response data structures
//!
//! Identity comes from the trusted proxy header (see [`crate::auth`]);
//! owners may only touch their own databases, keys and logs, configured
//! admins may touch everything. The data gateway itself lives in
//! [`crate::gateway`] and is authenticated by API key, not by this layer.

pub mod handlers;
pub mod models;
