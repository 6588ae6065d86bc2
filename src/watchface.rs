//! # Watch Face Runtime
//!
//! One [`WatchFace`] owns the screen, the outbox state and a FIFO queue of
//! [`Event`]s. The host posts events as they happen and calls
//! [`WatchFace::run_pending`]; each handler runs to completion before the
//! next event is taken, and events posted meanwhile wait their turn.
//!
//! ## Event Handling
//! - **Show**: create the [`Surface`], subscribe to minute ticks, format the
//!   clock once
//! - **Hide**: drop the surface and unsubscribe
//! - **Tick**: reformat the clock; on a request minute send one request
//! - **InboxReceived**: decode and apply to the surface
//! - **InboxDropped / OutboxFailed**: log only
//! - **OutboxSent / OutboxFailed**: outbox back to idle
//!
//! While hidden there is no surface at all, so late inbound messages and
//! send completions have nothing to write to.

use crate::clock::{self, UtcFormat};
use crate::config::Config;
use crate::display::Surface;
use crate::host::{CompanionChannel, HostClock};
use crate::message::{Dictionary, MessageResult};
use crate::receiver::{self, ApplyReport, OutboxState};
use chrono::{DateTime, FixedOffset, Timelike};
use std::collections::VecDeque;

/// Everything the host can deliver
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The screen became visible
    Show,
    /// The screen was dismissed
    Hide,
    /// A minute boundary passed; carries the new local wall-clock time
    Tick(DateTime<FixedOffset>),
    /// Raw dictionary bytes from the companion
    InboxReceived(Vec<u8>),
    /// The platform discarded an inbound message
    InboxDropped(MessageResult),
    /// The last outbound request was delivered
    OutboxSent,
    /// The last outbound request was not delivered
    OutboxFailed(MessageResult),
}

/// Settings the runtime needs from [`Config`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceSettings {
    pub width: u32,
    pub height: u32,
    pub utc_format: UtcFormat,
    pub request_interval_minutes: u32,
    pub inbox_size: usize,
    pub outbox_size: usize,
}

impl From<&Config> for FaceSettings {
    fn from(config: &Config) -> Self {
        FaceSettings {
            width: config.display.width,
            height: config.display.height,
            utc_format: config.clock.utc_format,
            request_interval_minutes: config.companion.request_interval_minutes,
            inbox_size: config.companion.inbox_size,
            outbox_size: config.companion.outbox_size,
        }
    }
}

impl Default for FaceSettings {
    fn default() -> Self {
        FaceSettings::from(&Config::default())
    }
}

/// The watch face and its event loop
pub struct WatchFace<C, M> {
    clock: C,
    channel: M,
    settings: FaceSettings,
    screen: Option<Surface>,
    outbox: OutboxState,
    queue: VecDeque<Event>,
    last_inbound: Option<ApplyReport>,
}

impl<C: HostClock, M: CompanionChannel> WatchFace<C, M> {
    pub fn new(clock: C, channel: M, settings: FaceSettings) -> Self {
        WatchFace {
            clock,
            channel,
            settings,
            screen: None,
            outbox: OutboxState::Idle,
            queue: VecDeque::new(),
            last_inbound: None,
        }
    }

    /// Queue an event for the next [`run_pending`](Self::run_pending).
    pub fn post(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Dispatch queued events in order until the queue is empty.
    ///
    /// Returns how many events were handled.
    pub fn run_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.queue.pop_front() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// The visible screen, if any.
    pub fn surface(&self) -> Option<&Surface> {
        self.screen.as_ref()
    }

    /// Minute ticks are wanted exactly while the screen is visible.
    pub fn wants_ticks(&self) -> bool {
        self.screen.is_some()
    }

    pub fn outbox_state(&self) -> OutboxState {
        self.outbox
    }

    /// Outcome of the most recently applied inbound message.
    pub fn last_inbound(&self) -> Option<&ApplyReport> {
        self.last_inbound.as_ref()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn channel(&self) -> &M {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut M {
        &mut self.channel
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Show => self.show(),
            Event::Hide => self.hide(),
            Event::Tick(local) => self.tick(local),
            Event::InboxReceived(bytes) => self.inbox_received(&bytes),
            Event::InboxDropped(reason) => {
                log::warn!("Inbound message dropped: {:?} ({})", reason, reason.code());
            }
            Event::OutboxSent => {
                log::debug!("Request delivered");
                self.outbox = OutboxState::Idle;
            }
            Event::OutboxFailed(reason) => {
                log::warn!("Request failed: {:?} ({})", reason, reason.code());
                self.outbox = OutboxState::Idle;
            }
        }
    }

    fn show(&mut self) {
        if self.screen.is_some() {
            log::warn!("Screen already visible, ignoring show");
            return;
        }
        let surface = Surface::create(self.settings.width, self.settings.height);
        self.screen = Some(surface);
        log::info!("Screen shown, subscribed to minute ticks");
        self.refresh_clock();
    }

    fn hide(&mut self) {
        if self.screen.take().is_some() {
            log::info!("Screen hidden, unsubscribed from minute ticks");
        }
    }

    fn tick(&mut self, local: DateTime<FixedOffset>) {
        if self.screen.is_none() {
            log::debug!("Tick at {} while hidden, ignoring", local);
            return;
        }
        self.refresh_clock();

        if receiver::request_due(local.minute(), self.settings.request_interval_minutes) {
            self.send_request();
        }
    }

    fn refresh_clock(&mut self) {
        let Some(surface) = self.screen.as_mut() else {
            return;
        };
        if let Err(e) = clock::refresh(surface, &self.clock, self.settings.utc_format) {
            log::error!("Clock refresh failed: {}", e);
        }
    }

    fn send_request(&mut self) {
        if self.outbox == OutboxState::RequestSent {
            log::debug!("Previous request still pending, sending another");
        }

        let payload = match encode_bounded(&receiver::build_request(), self.settings.outbox_size)
        {
            Ok(payload) => payload,
            Err(reason) => {
                log::error!("Request not sent: {:?}", reason);
                self.outbox = OutboxState::Idle;
                return;
            }
        };

        match self.channel.send(&payload) {
            Ok(()) => {
                log::info!("Requested fresh data from companion");
                self.outbox = OutboxState::RequestSent;
            }
            Err(reason) => {
                log::warn!("Request refused: {:?} ({})", reason, reason.code());
                self.outbox = OutboxState::Idle;
            }
        }
    }

    fn inbox_received(&mut self, bytes: &[u8]) {
        if bytes.len() > self.settings.inbox_size {
            log::warn!(
                "Inbound message dropped: {:?} ({} bytes, inbox holds {})",
                MessageResult::BufferOverflow,
                bytes.len(),
                self.settings.inbox_size
            );
            return;
        }
        let dict = match Dictionary::decode(bytes) {
            Ok(dict) => dict,
            Err(e) => {
                log::warn!("Inbound message dropped: {}", e);
                return;
            }
        };
        let Some(surface) = self.screen.as_mut() else {
            log::debug!("Inbound message while hidden, ignoring");
            return;
        };
        log::debug!("Inbound message with {} entries", dict.len());
        self.last_inbound = Some(receiver::apply_inbound(&dict, surface));
    }
}

fn encode_bounded(dict: &Dictionary, limit: usize) -> Result<Vec<u8>, MessageResult> {
    let bytes = dict.encode().map_err(|_| MessageResult::InvalidArgs)?;
    if bytes.len() > limit {
        return Err(MessageResult::InvalidArgs);
    }
    Ok(bytes)
}
