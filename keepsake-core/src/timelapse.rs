//! The time-lapse schedule: stopped, or armed with an absolute deadline.

/// Automatic-capture schedule, polled against the wall clock.
///
/// The armed state carries the absolute next-capture timestamp in whole
/// seconds. Arming and re-arming both schedule `now + interval + 1`; the
/// extra second absorbs the capture (or the arming key-press) that has
/// just happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timelapse {
    /// No automatic captures.
    #[default]
    Stopped,
    /// Next capture due at the absolute timestamp `next_due`.
    Armed { next_due: u64 },
}

/// Result of polling the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimelapsePoll {
    /// Schedule is stopped.
    Idle,
    /// Armed; `remaining` seconds until the next capture.
    Waiting { remaining: u64 },
    /// Deadline reached. Capture now, then [`Timelapse::rearm`].
    Due,
}

impl Timelapse {
    /// Whether the schedule is currently armed.
    pub fn is_armed(&self) -> bool {
        matches!(self, Timelapse::Armed { .. })
    }

    /// Flip between stopped and armed. Returns `true` when now armed.
    pub fn toggle(&mut self, now: u64, interval: u64) -> bool {
        if self.is_armed() {
            self.disarm();
            false
        } else {
            self.arm(now, interval);
            true
        }
    }

    /// Arm with the next capture due `interval + 1` seconds from `now`.
    pub fn arm(&mut self, now: u64, interval: u64) {
        *self = Timelapse::Armed {
            next_due: now + interval + 1,
        };
    }

    /// Stop automatic captures.
    pub fn disarm(&mut self) {
        *self = Timelapse::Stopped;
    }

    /// Schedule the capture after a completed one; same arithmetic as
    /// [`Timelapse::arm`].
    pub fn rearm(&mut self, now: u64, interval: u64) {
        self.arm(now, interval);
    }

    /// Compare the deadline against `now`.
    pub fn poll(&self, now: u64) -> TimelapsePoll {
        match *self {
            Timelapse::Stopped => TimelapsePoll::Idle,
            Timelapse::Armed { next_due } if now >= next_due => TimelapsePoll::Due,
            Timelapse::Armed { next_due } => TimelapsePoll::Waiting {
                remaining: next_due - now,
            },
        }
    }
}
