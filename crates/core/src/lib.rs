//! Shared domain types and the error taxonomy for the plotterd workspace.
//!
//! This crate has no internal dependencies; everything here is consumed by
//! both the AxiDraw integration crate and the API server.

pub mod error;
pub mod types;
