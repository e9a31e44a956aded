//! Process-isolated execution engine for Python script nodes.
//!
//! Scripts are analyzed statically to find their entry point, inputs and
//! returns; pairs of scripts are matched into data dependencies; single
//! nodes or whole pipelines run as supervised child processes with mocked
//! interactive input and a structured JSON result.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod runtime;
pub mod unit;
