//! Fixed-period tick pacing for the control loop.
//!
//! ```text
//!   deadline ─┬─ tick ──┐ wait ┌─ tick ───────────┐ ┌─ tick ─
//!             │         └──────┘                  │ │
//!             0        1·period             2·period (overrun → re-anchor)
//! ```
//!
//! Deadlines advance by exactly one period so pacing does not drift with
//! tick duration.  A tick that runs past its next deadline is counted as
//! an overrun and the schedule re-anchors at "now" instead of firing a
//! burst of catch-up ticks.  Ticks never overlap: the caller runs one
//! tick, then asks how long to wait.

use std::time::{Duration, Instant};

use log::warn;

#[derive(Debug, Clone)]
pub struct TickScheduler {
    period: Duration,
    next: Instant,
    ticks: u64,
    overruns: u64,
    worst: Duration,
}

impl TickScheduler {
    /// First tick is due at `start`.
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next: start,
            ticks: 0,
            overruns: 0,
            worst: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time to wait at `now` before the next tick is due.
    pub fn until_next(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Record a tick that ran from `started` to `finished` and schedule
    /// the next one.
    pub fn complete(&mut self, started: Instant, finished: Instant) {
        self.ticks += 1;
        let took = finished.saturating_duration_since(started);
        self.worst = self.worst.max(took);

        self.next += self.period;
        if finished > self.next {
            self.overruns += 1;
            warn!(
                "Scheduler: tick {} overran by {} ms (took {} ms)",
                self.ticks,
                (finished - self.next).as_millis(),
                took.as_millis()
            );
            self.next = finished;
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Longest tick observed.
    pub fn worst(&self) -> Duration {
        self.worst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: fn(u64) -> Duration = Duration::from_millis;

    #[test]
    fn first_tick_is_immediate() {
        let t0 = Instant::now();
        let s = TickScheduler::new(MS(1000), t0);
        assert_eq!(s.until_next(t0), Duration::ZERO);
    }

    #[test]
    fn deadlines_do_not_drift() {
        let t0 = Instant::now();
        let mut s = TickScheduler::new(MS(1000), t0);
        s.complete(t0, t0 + MS(300));
        assert_eq!(s.until_next(t0 + MS(300)), MS(700));
        s.complete(t0 + MS(1000), t0 + MS(1100));
        assert_eq!(s.until_next(t0 + MS(1100)), MS(900));
        assert_eq!(s.overruns(), 0);
        assert_eq!(s.worst(), MS(300));
    }

    #[test]
    fn overrun_reanchors_without_burst() {
        let t0 = Instant::now();
        let mut s = TickScheduler::new(MS(1000), t0);
        s.complete(t0, t0 + MS(2500));
        assert_eq!(s.overruns(), 1);
        // Next tick due right away, but only one.
        assert_eq!(s.until_next(t0 + MS(2500)), Duration::ZERO);
        s.complete(t0 + MS(2500), t0 + MS(2600));
        assert_eq!(s.until_next(t0 + MS(2600)), MS(900));
        assert_eq!(s.ticks(), 2);
    }
}
