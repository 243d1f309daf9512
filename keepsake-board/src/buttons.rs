//! Debounced button state and the per-poll input snapshot.
//!
//! [`Debouncer`] is pure: the caller feeds it raw levels and a
//! monotonic millisecond tick, and drains classified events with
//! [`Debouncer::take_events`]. The firmware keeps one per button and one
//! for the card-detect switch.

/// Raw level must hold this long before the debounced level follows.
pub const DEBOUNCE_MS: u32 = 20;
/// Hold time before a press is classified as a long press.
pub const LONG_PRESS_MS: u32 = 1000;
/// Quiet time after a release that closes a short-press group.
pub const SHORT_GAP_MS: u32 = 200;

/// Events accumulated since the previous [`Debouncer::take_events`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEvents {
    /// Debounced transition to pressed.
    pub fell: bool,
    /// Debounced transition to released.
    pub rose: bool,
    /// Completed short presses (press shorter than [`LONG_PRESS_MS`],
    /// counted once the [`SHORT_GAP_MS`] quiet time has passed).
    pub short_count: u8,
    /// The press crossed [`LONG_PRESS_MS`] while still held.
    pub long_press: bool,
    /// Debounced level at poll time.
    pub held: bool,
}

/// Card-detect switch edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardEvent {
    Inserted,
    Removed,
}

/// One round of debounced input state, returned by
/// [`crate::board::CameraBoard::poll_inputs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Inputs {
    pub shutter: ButtonEvents,
    pub up: ButtonEvents,
    pub down: ButtonEvents,
    pub left: ButtonEvents,
    pub right: ButtonEvents,
    pub select: ButtonEvents,
    pub ok: ButtonEvents,
    /// At most one card edge per poll.
    pub card: Option<CardEvent>,
}

/// Per-button debouncer and press classifier.
///
/// `update` may be called at any rate; timing comes entirely from the
/// `now_ms` argument. A press held past [`LONG_PRESS_MS`] emits
/// `long_press` once and is excluded from the short count.
#[derive(Debug, Clone, Copy, Default)]
pub struct Debouncer {
    stable: bool,
    last_raw: bool,
    raw_since: u32,
    pressed_at: u32,
    released_at: u32,
    long_fired: bool,
    pending_shorts: u8,
    events: ButtonEvents,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw sample. `active` is the electrical level already
    /// normalized so that `true` means pressed.
    pub fn update(&mut self, active: bool, now_ms: u32) {
        if active != self.last_raw {
            self.last_raw = active;
            self.raw_since = now_ms;
        }
        if self.stable != self.last_raw
            && now_ms.wrapping_sub(self.raw_since) >= DEBOUNCE_MS
        {
            self.stable = self.last_raw;
            if self.stable {
                self.events.fell = true;
                self.pressed_at = now_ms;
                self.long_fired = false;
            } else {
                self.events.rose = true;
                self.released_at = now_ms;
                if !self.long_fired {
                    self.pending_shorts = self.pending_shorts.saturating_add(1);
                }
            }
        }
        if self.stable
            && !self.long_fired
            && now_ms.wrapping_sub(self.pressed_at) >= LONG_PRESS_MS
        {
            self.long_fired = true;
            self.events.long_press = true;
        }
        if !self.stable
            && self.pending_shorts > 0
            && now_ms.wrapping_sub(self.released_at) >= SHORT_GAP_MS
        {
            self.events.short_count = self.events.short_count.saturating_add(self.pending_shorts);
            self.pending_shorts = 0;
        }
    }

    /// Debounced level right now.
    pub fn is_pressed(&self) -> bool {
        self.stable
    }

    /// Drain the events accumulated since the last call.
    pub fn take_events(&mut self) -> ButtonEvents {
        let mut events = self.events;
        events.held = self.stable;
        self.events = ButtonEvents::default();
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hold `active` from `from_ms` for `dur_ms`, sampling every 5 ms.
    fn feed(db: &mut Debouncer, active: bool, from_ms: u32, dur_ms: u32) -> u32 {
        let mut t = from_ms;
        while t <= from_ms + dur_ms {
            db.update(active, t);
            t += 5;
        }
        t
    }

    #[test]
    fn glitch_shorter_than_debounce_is_ignored() {
        let mut db = Debouncer::new();
        db.update(false, 0);
        db.update(true, 10);
        db.update(false, 15);
        db.update(false, 100);
        let events = db.take_events();
        assert_eq!(events, ButtonEvents::default());
    }

    #[test]
    fn press_emits_fell_once() {
        let mut db = Debouncer::new();
        let t = feed(&mut db, true, 0, 50);
        let events = db.take_events();
        assert!(events.fell);
        assert!(events.held);
        assert!(!events.rose);
        feed(&mut db, true, t, 50);
        assert!(!db.take_events().fell, "no repeat while held");
    }

    #[test]
    fn short_press_counts_after_quiet_gap() {
        let mut db = Debouncer::new();
        let t = feed(&mut db, true, 0, 100);
        let t = feed(&mut db, false, t, 100);
        db.update(false, t + SHORT_GAP_MS);
        let events = db.take_events();
        assert!(events.rose);
        assert_eq!(events.short_count, 1);
        assert!(!events.long_press);
    }

    #[test]
    fn double_click_counts_two_shorts() {
        let mut db = Debouncer::new();
        let t = feed(&mut db, true, 0, 60);
        let t = feed(&mut db, false, t, 60);
        let t = feed(&mut db, true, t, 60);
        let t = feed(&mut db, false, t, 60);
        db.update(false, t + SHORT_GAP_MS);
        assert_eq!(db.take_events().short_count, 2);
    }

    #[test]
    fn long_hold_fires_long_press_and_no_short() {
        let mut db = Debouncer::new();
        let t = feed(&mut db, true, 0, LONG_PRESS_MS + 100);
        let events = db.take_events();
        assert!(events.long_press);
        let t = feed(&mut db, false, t, 100);
        db.update(false, t + SHORT_GAP_MS);
        let events = db.take_events();
        assert!(events.rose);
        assert_eq!(events.short_count, 0, "long press is not a short press");
    }

    #[test]
    fn held_tracks_debounced_level() {
        let mut db = Debouncer::new();
        feed(&mut db, true, 0, 50);
        assert!(db.is_pressed());
        assert!(db.take_events().held);
        feed(&mut db, false, 100, 50);
        assert!(!db.is_pressed());
        assert!(!db.take_events().held);
    }
}
