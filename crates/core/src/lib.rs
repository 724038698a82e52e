pub mod access;
pub mod calendar;
pub mod clarification;
pub mod config;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod review;
pub mod timestamp;
pub mod validate;
pub mod visit;
pub mod workflow;

pub use error::{DataError, WorkflowError};
pub use model::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
