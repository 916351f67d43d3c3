//! ja-core: Scheduling decisions for jobagent.
//!
//! This crate describes the local machine, evaluates the placement
//! conditions of units against it, and holds the agent configuration.
//! Exposed as a library for integration testing.

pub mod admission;
pub mod config;
pub mod job;
pub mod logging;
pub mod machine;

pub use admission::{able_to_run, first_unsatisfied, Agent, Condition};
pub use job::Job;
pub use machine::Machine;
