//! Command-line front end for `vaultutil-credentials`
//!
//! The binary is a thin layer: it parses flags, sets up logging, and turns
//! library results into shell text or JSON envelopes.

pub mod cli;
pub mod commands;
pub mod tracing;
