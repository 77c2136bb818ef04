//! Service modules for the Stockline sync backend.
//!
//! - [`contract`] - per-mode required/optional column contracts
//! - [`connector`] - short-lived connections to the operator's external database
//! - [`validator`] - result-shape validation against a mode's contract
//! - [`runner`] - the lock-guarded sync state machine and upsert mapping
//! - [`scheduler`] - wall-clock trigger for configured daily sync times

pub mod connector;
pub mod contract;
pub mod runner;
pub mod scheduler;
pub mod validator;
