//! Tick sources for stamping session commands.

use std::time::Instant;

/// Millisecond tick source used to stamp session commands.
///
/// The session never reads a clock itself; hosts call [`Clock::now_ms`]
/// once per processed event and pass the value along.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Monotonic time since the clock was created.
    System(Instant),
    /// Deterministic time that only moves via [`Clock::advance`].
    Manual(u64),
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl Clock {
    /// Returns a clock backed by the monotonic system clock.
    #[must_use]
    pub fn system() -> Self {
        Self::System(Instant::now())
    }

    /// Returns a manual clock starting at `start_ms`.
    #[must_use]
    pub fn manual(start_ms: u64) -> Self {
        Self::Manual(start_ms)
    }

    /// Milliseconds elapsed on this clock.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        match self {
            Clock::System(origin) => u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX),
            Clock::Manual(ms) => *ms,
        }
    }

    /// If this is a manual clock, move it forward.
    ///
    /// Has no effect on `Clock::System`.
    pub fn advance(&mut self, ms: u64) {
        if let Clock::Manual(now) = self {
            *now = now.saturating_add(ms);
        }
    }

    #[must_use]
    pub fn is_manual(&self) -> bool {
        matches!(self, Clock::Manual(_))
    }
}
