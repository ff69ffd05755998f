//! Process-wide logging setup shared by the resolver binaries.

pub mod subscriber;

pub use subscriber::{env_filter, init, init_pretty, DEFAULT_FILTER};
