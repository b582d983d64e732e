//! Memory implementations for the startup analyst chain.

pub mod rolling;

pub use rolling::{DEFAULT_CAPACITY, RollingMemory};
