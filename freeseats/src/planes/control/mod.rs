pub mod schema;

pub use schema::{DEFAULT_BUSES, consumer_name, init_schema};
