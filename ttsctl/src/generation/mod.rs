//! Speech generation: pricing and the billed generation workflow.
//!
//! - [`pricing`]: the cost model and input validation, free of side effects
//! - [`orchestrator`]: validate, check balance, synthesize, debit and record

pub mod orchestrator;
pub mod pricing;

pub use orchestrator::{GenerationResult, Orchestrator};
pub use pricing::{GenerationInput, ValidatedGeneration, cost};
