//! Message coaching pipeline.
//!
//! Every employee message bound for the owner flows through:
//! 1. `urgency`: emergency keywords bypass everything (no LLM)
//! 2. `topics`: regulated employment topics are blocked and referred (no LLM)
//! 3. `classifier`: concurrent emotion + risk classification
//! 4. `rewriter`: style-variant rewrites when the risk warrants them
//!
//! `gateway::CoachingGateway` composes the stages into one `CoachingResult`.

pub mod classifier;
pub mod gateway;
pub mod json;
pub mod rewriter;
pub mod topics;
pub mod translate;
pub mod types;
pub mod urgency;

pub use gateway::{CoachingGateway, ProcessOptions};
pub use types::CoachingResult;
