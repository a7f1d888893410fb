//! Accept loop and per-request orchestration.

pub mod handler;
pub mod listener;

pub use handler::RequestHandler;
pub use listener::Server;
