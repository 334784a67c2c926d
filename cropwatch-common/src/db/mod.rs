//! Database schema and access helpers

pub mod init;
pub mod settings;

pub use init::init_database;
pub use settings::{get_setting, set_setting};
