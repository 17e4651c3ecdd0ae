// src/session/timer.rs

/// Fired once, when the remaining time reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expired;

/// Counts down in abstract seconds. Ticks are supplied by the caller.
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    seconds_remaining: u64,
    running: bool,
    started: bool,
}

impl CountdownTimer {
    pub fn new(duration_minutes: u32) -> Self {
        Self {
            seconds_remaining: u64::from(duration_minutes) * 60,
            running: false,
            started: false,
        }
    }

    /// Replaces the duration. Ignored once the timer has been started.
    pub fn set_duration(&mut self, duration_minutes: u32) {
        if self.started {
            tracing::debug!("Ignoring duration change on a started timer");
            return;
        }
        self.seconds_remaining = u64::from(duration_minutes) * 60;
    }

    /// Begins counting. Idempotent.
    pub fn start(&mut self) {
        self.started = true;
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.seconds_remaining
    }

    pub fn is_expired(&self) -> bool {
        self.started && self.seconds_remaining == 0
    }

    /// Advances one second. Returns `Some(Expired)` on the 1 -> 0 transition only.
    pub fn tick(&mut self) -> Option<Expired> {
        if !self.running || self.seconds_remaining == 0 {
            return None;
        }

        self.seconds_remaining -= 1;
        if self.seconds_remaining == 0 {
            tracing::info!("Timer expired");
            Some(Expired)
        } else {
            None
        }
    }

    pub fn formatted(&self) -> String {
        format_clock(self.seconds_remaining)
    }
}

/// Formats seconds as `MM:SS`. Minutes do not roll over into hours.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
