//! Workplace mediator: coaching gateway between employees and owners.

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
