pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemStore;
pub use postgres::PgStore;
pub use store::{Datastore, SELECT_ROW_LIMIT};
