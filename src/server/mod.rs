//! Accept loop, admission gates and the live-connection registry.

pub mod listener;
pub mod registry;

pub use listener::Listener;
pub use registry::ConnectionRegistry;
