//! `levee-height` library crate.
//!
//! The binary (`levee`) is a thin wrapper around this library so that:
//!
//! - the fitting engine is testable without spawning processes
//! - ingestion, reporting and plotting stay reusable on their own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;

pub use engine::{Engine, EngineReport, estimate_threshold};
