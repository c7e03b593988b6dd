pub mod settings;

pub use settings::{AppConfig, DatabaseConfig, HealthConfig, RedisConfig, ServerConfig};
