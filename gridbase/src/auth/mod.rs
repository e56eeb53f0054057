//! Management API identity.
//!
//! End users authenticate with the external identity provider, never with
//! this service: a trusted reverse proxy injects the authenticated user's
//! UUID into a request header, and [`CurrentUser`] extracts it. Admin status
//! comes from configuration.

pub mod current_user;

pub use current_user::CurrentUser;
