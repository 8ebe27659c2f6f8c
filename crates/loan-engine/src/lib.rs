//! Loan decisioning core: risk assessment, rule-driven decision composition, and the
//! application lifecycle state machine, plus the configuration, telemetry, and error plumbing
//! the service binary wires around them.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
