use std::time::Duration;

use crate::io::reader::IoOptions;

/// Maximum number of requests in progress at once.
pub const DEFAULT_REQUEST_COUNT: usize = 16;
/// Scheduler wake-up bound.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5);

/// Scheduler tunables.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimelineOptions {
    /// Requests admitted concurrently; values below 1 are raised to 1.
    pub request_count: usize,
    /// Longest the scheduler sleeps between polls.
    pub request_timeout: Duration,
    /// Passed to every reader the timeline opens.
    pub io_options: IoOptions,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            request_count: DEFAULT_REQUEST_COUNT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            io_options: IoOptions::new(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/options.rs"]
mod tests;
