//! Behavioural step helpers for image-operation scenarios.

mod assertions;
mod state;
mod steps;

pub use state::{ImageOperationsState, image_operations_state};
