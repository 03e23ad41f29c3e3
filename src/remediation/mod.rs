//! Mutating actions against sources.

pub mod action;
pub mod dispatcher;
pub mod shell_edit;

pub use action::RemediationAction;
pub use dispatcher::{RemediationDispatcher, RemediationOutcome};
