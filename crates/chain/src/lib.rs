//! The deterministic chain: the heart of the startup analyst.
//!
//! Each call to [`DeterministicChain::run`] walks a small state machine:
//!
//! 1. **Build prompt**: fixed system prompt + recent session memory + user input
//! 2. **Generate**: one call to the configured provider at a fixed low temperature
//! 3. **Parse**: strict JSON
//! 4. **Validate**: the assessment schema
//! 5. **Retry** with a corrective instruction prepended, or finish
//!
//! On success the turn is summarized into session memory; every failure is
//! returned as a [`ChainFailure`] value.

pub mod chain;
pub mod failure;
pub mod prompts;

pub use chain::{AttemptRecord, DeterministicChain};
pub use failure::{ChainFailure, FailureKind};
