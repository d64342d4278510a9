pub mod fixtures;

pub use fixtures::{seed_users_table, temp_sqlite_path};
