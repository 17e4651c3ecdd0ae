// src/session/monitor.rs

use serde::{Deserialize, Serialize};

/// Raw focus signals from the host environment.
///
/// Hosts usually report one user action through several sources (a tab
/// switch fires both a visibility change and a window blur), so losses are
/// only counted once per away period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusSignal {
    /// The page became hidden.
    Hidden,
    /// The page became visible again.
    Visible,
    /// The window lost focus.
    Blur,
    /// The window regained focus.
    Focus,
}

impl FocusSignal {
    pub fn is_loss(self) -> bool {
        matches!(self, FocusSignal::Hidden | FocusSignal::Blur)
    }
}

/// Whether the student is currently looking at the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Present,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Inactive,
    Watching,
    Suspended,
    Stopped,
}

/// Emitted for every counted violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViolationNotice {
    pub count: u32,
    pub suspended: bool,
}

/// Counts focus losses and declares suspension at a threshold.
#[derive(Debug, Clone)]
pub struct ViolationMonitor {
    threshold: u32,
    count: u32,
    presence: Presence,
    phase: Phase,
}

impl ViolationMonitor {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            count: 0,
            presence: Presence::Present,
            phase: Phase::Inactive,
        }
    }

    /// Starts watching. Only the first activation has an effect.
    pub fn activate(&mut self) {
        if self.phase == Phase::Inactive {
            self.phase = Phase::Watching;
            self.presence = Presence::Present;
        }
    }

    /// Stops watching for good; the count is kept.
    pub fn stop(&mut self) {
        if self.phase == Phase::Watching {
            self.phase = Phase::Stopped;
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn is_suspended(&self) -> bool {
        self.phase == Phase::Suspended
    }

    pub fn is_watching(&self) -> bool {
        self.phase == Phase::Watching
    }

    /// Feeds one host signal.
    ///
    /// Returns a notice when a violation was counted. Signals are ignored
    /// entirely unless the monitor is watching.
    pub fn observe(&mut self, signal: FocusSignal) -> Option<ViolationNotice> {
        if self.phase != Phase::Watching {
            return None;
        }

        if !signal.is_loss() {
            self.presence = Presence::Present;
            return None;
        }

        if self.presence == Presence::Away {
            tracing::debug!("Duplicate focus loss ({:?}) in the same away period", signal);
            return None;
        }

        self.presence = Presence::Away;
        self.count += 1;

        let suspended = self.count >= self.threshold;
        if suspended {
            self.phase = Phase::Suspended;
        }

        tracing::warn!(
            "Focus lost ({:?}): violation {}/{}{}",
            signal,
            self.count,
            self.threshold,
            if suspended { ", suspending" } else { "" }
        );

        Some(ViolationNotice {
            count: self.count,
            suspended,
        })
    }
}
