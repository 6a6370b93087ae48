pub mod config;
pub mod db;
pub mod pg_store;
pub mod redis_bus;

pub use config::ServiceConfig;
pub use db::{apply_schema, connect_database};
pub use pg_store::PgStore;
pub use redis_bus::{AUDIT_CHANNEL, PublishingAuditLog, RedisBus};
