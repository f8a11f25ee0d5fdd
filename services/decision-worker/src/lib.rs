//! Decision worker: consumes `credit_reports_generated`, applies the
//! prequalification rules, and moves the application row to its terminal
//! state under optimistic locking.

pub mod config;
pub mod decision;
pub mod handler;

pub use handler::{DecisionHandler, SERVICE_NAME};
