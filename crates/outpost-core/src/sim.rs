//! Simulation clock state.
//!
//! The host drives time by calling [`Session::tick`](crate::session::Session::tick)
//! with the elapsed wall time of each frame. The clock only keeps counters;
//! it never decides how large a step is.

/// Frame and time counters for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SimClock {
    frames: u64,
    simulated_seconds: f64,
    /// Emit a debug line every this many frames. Zero disables it.
    log_interval: u64,
}

impl SimClock {
    pub fn new(log_interval: u64) -> Self {
        Self {
            frames: 0,
            simulated_seconds: 0.0,
            log_interval,
        }
    }

    /// Frames advanced since the session started.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Sum of every applied delta, in seconds.
    pub fn simulated_seconds(&self) -> f64 {
        self.simulated_seconds
    }

    /// Record one frame of `dt` seconds.
    pub(crate) fn advance(&mut self, dt: f64, nodes: usize, connections: usize) {
        self.frames += 1;
        self.simulated_seconds += dt;
        if self.log_interval > 0 && self.frames % self.log_interval == 0 {
            tracing::debug!(
                frame = self.frames,
                nodes,
                connections,
                dt,
                "simulation running"
            );
        }
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(300)
    }
}

/// Clamp a frame delta to something the ledger can apply. Negative and
/// non-finite deltas become zero; large ones pass through unchanged.
pub fn sanitize_delta(dt: f64) -> f64 {
    if dt.is_finite() && dt > 0.0 { dt } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_zero() {
        let clock = SimClock::default();
        assert_eq!(clock.frames(), 0);
        assert_eq!(clock.simulated_seconds(), 0.0);
    }

    #[test]
    fn advance_accumulates() {
        let mut clock = SimClock::new(0);
        clock.advance(0.5, 0, 0);
        clock.advance(0.25, 0, 0);
        assert_eq!(clock.frames(), 2);
        assert_eq!(clock.simulated_seconds(), 0.75);
    }

    #[test]
    fn sanitize_rejects_bad_deltas() {
        assert_eq!(sanitize_delta(-1.0), 0.0);
        assert_eq!(sanitize_delta(f64::NAN), 0.0);
        assert_eq!(sanitize_delta(f64::INFINITY), 0.0);
        assert_eq!(sanitize_delta(3600.0), 3600.0);
    }
}
