pub mod persist;
pub mod server;
