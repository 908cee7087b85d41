//! Behavioural step helpers for build-context scenarios.

mod assertions;
mod state;
mod steps;

pub use state::{BuildContextState, build_context_state};
