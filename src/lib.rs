//! Rigfile: a sequential provisioning-step executor.
//!
//! A line-oriented recipe (`ARG`, `SET`, `RUN`, `CLONE`, `CD`, `INSTALL`) is
//! parsed into a plan and applied one step at a time, stopping at the first
//! failure.

pub mod cli;
pub mod core;
pub mod journal;
pub mod steps;
pub mod transport;
