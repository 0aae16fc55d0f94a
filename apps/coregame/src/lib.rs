//! # CoreGame Library
//!
//! This library exposes the CoreGame application modules for testing and
//! integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod view;

// Re-export coregame_core for convenience
pub use coregame_core;
