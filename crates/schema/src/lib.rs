//! Startup assessment schema.
//!
//! The model is asked for one JSON object; this crate decides whether that
//! object is an [`Assessment`]. Validation works on an already-parsed
//! [`serde_json::Value`] and reports every violated field path at once so
//! the chain can feed the list straight back into its corrective retry
//! instruction.
//!
//! ```text
//! serde_json::Value ──▶ Validator::validate ──▶ Ok(Assessment)
//!                                          └──▶ Err(ValidationError { issues })
//! ```

pub mod model;
pub mod validate;

pub use model::{
    Assessment, BusinessModel, FoundersCount, Invest, Market, Product, Recommendation, Team,
};
pub use validate::{FieldIssue, InvestPolicy, Problem, ValidationError, Validator, validate};
