//! Device-side processing.

mod decision;

pub use decision::{evaluate, DecisionLoop};
