mod manager;

pub use manager::{connect, create_pool, is_valid_identifier, ping, table_exists};
