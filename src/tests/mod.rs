//! # Scenario Tests
//!
//! End-to-end checks of the watch face driven through its event queue with
//! a hand-set clock and a companion channel that records what it was given.


use crate::host::{CompanionChannel, HostClock};
use crate::message::MessageResult;
use crate::ClockStyle;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::cell::Cell;

/// Clock whose time and style the test moves by hand.
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
    offset: FixedOffset,
    style: Cell<ClockStyle>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset_hours: i32, style: ClockStyle) -> Self {
        FixedClock {
            now: Cell::new(now),
            offset: FixedOffset::east_opt(offset_hours * 3600).unwrap(),
            style: Cell::new(style),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn set_style(&self, style: ClockStyle) {
        self.style.set(style);
    }

    /// Local wall-clock time, as a tick would carry it.
    pub fn local(&self) -> DateTime<FixedOffset> {
        self.now.get().with_timezone(&self.offset)
    }
}

impl HostClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn local_offset(&self, _at: DateTime<Utc>) -> FixedOffset {
        self.offset
    }

    fn clock_style(&self) -> ClockStyle {
        self.style.get()
    }
}

/// Companion channel that keeps every payload it accepts.
#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Vec<Vec<u8>>,
    pub refuse_with: Option<MessageResult>,
}

impl CompanionChannel for RecordingChannel {
    fn send(&mut self, payload: &[u8]) -> Result<(), MessageResult> {
        if let Some(reason) = self.refuse_with {
            return Err(reason);
        }
        self.sent.push(payload.to_vec());
        Ok(())
    }
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}
