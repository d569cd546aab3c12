//! Local libSQL database backing the durable queue store

mod connection;
mod migrations;

pub use connection::Database;
