//! AxiDraw CLI integration.
//!
//! This crate owns everything that touches the vendor plotting tool:
//! building its argument vectors, supervising the spawned process, parsing
//! its line-oriented output into structured [`events::PlotEvent`]s, and
//! tracking resumable-plot state on disk.
//!
//! The entry point is [`manager::PlotterManager`], created once at startup
//! and shared via `Arc` with the HTTP layer.

pub mod artifact;
pub mod command;
pub mod config;
pub mod events;
pub mod manager;
pub mod progress;
pub mod resume;
pub mod supervisor;

mod runner;
