//! The generic data-access gateway.
//!
//! One POST endpoint through which tenants read and write their ad-hoc
//! tables: the request names an action (select/insert/update/delete) and a
//! table, authenticates with a per-database API key, and every post-auth
//! call is audited with timing and status.
//!
//! - **[`envelope`]**: the wire envelope and its pre-auth validation
//! - **[`errors`]**: the gateway error taxonomy and its HTTP mapping
//! - **[`dispatcher`]**: the request state machine

pub mod dispatcher;
pub mod envelope;
pub mod errors;

pub use dispatcher::handle_query;
pub use envelope::{Action, QueryEnvelope};
pub use errors::GatewayError;
