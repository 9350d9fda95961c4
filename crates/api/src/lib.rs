//! Plotterd API server library.
//!
//! Exposes the building blocks (config, state, routes, SSE infrastructure)
//! so integration tests and the binary entrypoint can both access them.

pub mod config;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod sse;
pub mod state;
