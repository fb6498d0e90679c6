//! Utility functions and types

pub mod columns;
pub mod data_loader;

pub use data_loader::{DataLoader, DataSaver};

use std::time::{Duration, Instant};

/// Simple timer for measuring stage durations
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    /// Start a new timer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed seconds since start
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
