//! Database access: connection pool and the order/payment store

pub mod db;
pub mod orders;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
pub use orders::{NewOrder, OrderRecord, OrderStatus, OrderStore, PaymentRecord, SqliteOrderStore, WilayaStats};
