//! tsencode - transcoding wrapper for Japanese broadcast recordings
//!
//! This library crate exposes the binaries' building blocks for integration testing.

pub mod config;
pub mod encode;
pub mod logging;
pub mod queue;
pub mod runner;
