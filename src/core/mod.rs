//! Core logic: recipe types, parsing, variable resolution, execution.

pub mod codegen;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod parser;
pub mod resolver;
pub mod types;
