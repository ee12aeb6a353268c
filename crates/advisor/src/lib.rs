//! Storage advisor service
//!
//! Runs the analysis on a schedule and serves the latest report over HTTP.

pub mod api;
pub mod config;
pub mod runner;
pub mod state;
