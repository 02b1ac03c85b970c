//! Spinner shown while waiting on provisioning
//!
//! Thin wrapper around indicatif's `ProgressBar`. indicatif only draws when
//! stderr is a terminal, so scheduled runs and tests stay quiet.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use std::time::Duration;

/// Spinner wrapper for displaying polling status
pub struct ProgressBar {
    bar: IndicatifBar,
}

impl ProgressBar {
    /// Create a spinner that shows the label and the poll count
    pub fn new_spinner(label: &str) -> Self {
        let bar = IndicatifBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner} Waiting for {msg} to become ACTIVE (poll {pos}, {elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar }
    }

    /// Update the poll counter
    pub fn update(&self, current: usize) {
        self.bar.set_position(current as u64);
    }

    /// Remove the spinner once the wait is over
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}
