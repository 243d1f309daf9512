//! GPIO buttons and the card-detect switch, debounced.
//!
//! All inputs are active low: buttons pull their line to ground, and the
//! card socket's detect switch closes to ground when a card is seated.
//! [`InputPins::poll()`] samples every line once and drains the
//! accumulated edge/press events into one [`Inputs`] snapshot.

use embassy_rp::gpio::Input;
use embassy_time::Instant;
use keepsake_board::buttons::{CardEvent, Debouncer, Inputs, DEBOUNCE_MS};

struct Line {
    pin: Input<'static>,
    debouncer: Debouncer,
}

impl Line {
    /// Wraps `pin` with the debouncer pre-settled at the pin's current
    /// level, so a card already seated at boot does not read as an
    /// insertion edge.
    fn new(pin: Input<'static>, now_ms: u32) -> Self {
        let mut debouncer = Debouncer::new();
        let level = pin.is_low();
        debouncer.update(level, now_ms.wrapping_sub(DEBOUNCE_MS + 1));
        debouncer.update(level, now_ms);
        let _ = debouncer.take_events();
        Self { pin, debouncer }
    }

    fn sample(&mut self, now_ms: u32) {
        self.debouncer.update(self.pin.is_low(), now_ms);
    }
}

/// The seven buttons plus the card-detect switch.
pub struct InputPins {
    shutter: Line,
    up: Line,
    down: Line,
    left: Line,
    right: Line,
    select: Line,
    ok: Line,
    card: Line,
}

impl InputPins {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        shutter: Input<'static>,
        up: Input<'static>,
        down: Input<'static>,
        left: Input<'static>,
        right: Input<'static>,
        select: Input<'static>,
        ok: Input<'static>,
        card: Input<'static>,
    ) -> Self {
        let now = now_ms();
        Self {
            shutter: Line::new(shutter, now),
            up: Line::new(up, now),
            down: Line::new(down, now),
            left: Line::new(left, now),
            right: Line::new(right, now),
            select: Line::new(select, now),
            ok: Line::new(ok, now),
            card: Line::new(card, now),
        }
    }

    /// One debounce round over every line, draining events.
    pub fn poll(&mut self) -> Inputs {
        let now = now_ms();
        self.shutter.sample(now);
        self.up.sample(now);
        self.down.sample(now);
        self.left.sample(now);
        self.right.sample(now);
        self.select.sample(now);
        self.ok.sample(now);
        self.card.sample(now);

        let card_events = self.card.debouncer.take_events();
        // For the detect switch "pressed" means seated, so a fall is an
        // insertion.
        let card = if card_events.fell {
            Some(CardEvent::Inserted)
        } else if card_events.rose {
            Some(CardEvent::Removed)
        } else {
            None
        };

        Inputs {
            shutter: self.shutter.debouncer.take_events(),
            up: self.up.debouncer.take_events(),
            down: self.down.debouncer.take_events(),
            left: self.left.debouncer.take_events(),
            right: self.right.debouncer.take_events(),
            select: self.select.debouncer.take_events(),
            ok: self.ok.debouncer.take_events(),
            card,
        }
    }

    /// Raw shutter level, bypassing the debouncer.
    pub fn shutter_held(&self) -> bool {
        self.shutter.pin.is_low()
    }

    /// Raw card-detect level.
    pub fn card_present(&self) -> bool {
        self.card.pin.is_low()
    }
}

fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}
