pub mod memory_store;
#[cfg(feature = "database")]
pub mod postgres_session_store;
#[cfg(feature = "database")]
pub mod postgres_user_store;
#[cfg(feature = "database")]
pub mod redis_session_store;

pub use memory_store::{InMemorySessionStore, InMemoryUserStore};
#[cfg(feature = "database")]
pub use postgres_session_store::PostgresSessionStore;
#[cfg(feature = "database")]
pub use postgres_user_store::PostgresUserStore;
#[cfg(feature = "database")]
pub use redis_session_store::RedisSessionStore;
