//! # Analyst Core
//!
//! Capability traits and error definitions shared by every crate in the
//! startup analyst workspace. This crate has **no framework dependencies**:
//! it only describes the seams that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Each collaborator of the deterministic chain is a trait here:
//! - [`Provider`]: the generation client, `generate(system, user, temperature) -> text`
//! - [`SessionMemory`]: the bounded per-session rolling memory
//!
//! Concrete implementations live in `analyst-providers` and `analyst-memory`,
//! and are selected by configuration rather than by inheritance.

pub mod error;
pub mod memory;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::ProviderError;
pub use memory::SessionMemory;
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
