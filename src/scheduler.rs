//! Tick-driven scheduling of the poll and reconnect passes.
//!
//! No timers or threads: the host calls [`PollScheduler::tick`] as often as it likes and the
//! scheduler compares the supplied `now` against the last time each pass ran. Intervals are
//! measured in time, not ticks, so a late tick only delays the next pass.

use std::time::{Duration, Instant};

/// Which passes are due on this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Due {
    pub poll: bool,
    pub reconnect: bool,
}

#[derive(Clone, Debug)]
pub struct PollScheduler {
    poll_interval: Duration,
    reconnect_interval: Duration,
    // `None` = never ran, so the first tick runs both passes.
    last_poll: Option<Instant>,
    last_reconnect: Option<Instant>,
}

impl PollScheduler {
    pub fn new(poll_interval: Duration, reconnect_interval: Duration) -> Self {
        Self {
            poll_interval,
            reconnect_interval,
            last_poll: None,
            last_reconnect: None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    /// Decide what runs at `now` and record it as run. The two checks are independent.
    pub fn tick(&mut self, now: Instant) -> Due {
        let due = Due {
            poll: Self::elapsed(self.last_poll, now, self.poll_interval),
            reconnect: Self::elapsed(self.last_reconnect, now, self.reconnect_interval),
        };
        if due.poll {
            self.last_poll = Some(now);
        }
        if due.reconnect {
            self.last_reconnect = Some(now);
        }
        due
    }

    fn elapsed(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
        match last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLL: Duration = Duration::from_millis(2);
    const RECONNECT: Duration = Duration::from_millis(1000);

    #[test]
    fn first_tick_runs_both() {
        let mut s = PollScheduler::new(POLL, RECONNECT);
        assert_eq!(
            s.tick(Instant::now()),
            Due {
                poll: true,
                reconnect: true
            }
        );
    }

    #[test]
    fn passes_fire_independently() {
        let t0 = Instant::now();
        let mut s = PollScheduler::new(POLL, RECONNECT);
        s.tick(t0);

        assert_eq!(s.tick(t0 + Duration::from_millis(1)), Due::default());
        assert_eq!(
            s.tick(t0 + Duration::from_millis(2)),
            Due {
                poll: true,
                reconnect: false
            }
        );
        assert_eq!(
            s.tick(t0 + Duration::from_millis(1000)),
            Due {
                poll: true,
                reconnect: true
            }
        );
        assert_eq!(s.tick(t0 + Duration::from_millis(1001)), Due::default());
    }

    #[test]
    fn late_tick_runs_once_and_rebases() {
        let t0 = Instant::now();
        let mut s = PollScheduler::new(POLL, RECONNECT);
        s.tick(t0);

        // a stalled host loop: one late tick, not a burst of catch-up passes
        let late = t0 + Duration::from_millis(2500);
        assert_eq!(
            s.tick(late),
            Due {
                poll: true,
                reconnect: true
            }
        );
        assert_eq!(s.tick(late + Duration::from_millis(1)), Due::default());
        assert!(s.tick(late + Duration::from_millis(2)).poll);
    }

    #[test]
    fn clock_going_backwards_is_not_due() {
        let t0 = Instant::now() + Duration::from_secs(10);
        let mut s = PollScheduler::new(POLL, RECONNECT);
        s.tick(t0);
        assert_eq!(s.tick(t0 - Duration::from_secs(5)), Due::default());
    }
}
