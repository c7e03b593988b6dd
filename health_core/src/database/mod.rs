pub mod connection;
pub mod datastore;
pub mod migrations;

pub use connection::{DatabaseManager, get_database_pool};
pub use datastore::{Datastore, RecordCollection};
pub use migrations::{MigrationManager, run_migrations};
