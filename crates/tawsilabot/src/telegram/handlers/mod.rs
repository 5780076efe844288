//! Dispatcher schema, callback routing and handler dependencies

pub mod callbacks;
pub mod schema;
pub mod types;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
