//! Input coalescing
//!
//! Decouples the physical key-event rate from consumers that want a
//! quiescence signal. Every pushed event is re-broadcast immediately on the
//! raw channel; a trailing-edge debounce emits the latest event on the
//! settled channel once a quiet period passes.
//!
//! There is no timer thread. `push` arms a single deadline from the event's
//! own timestamp and the host's loop drives `tick(now)`, the same way the
//! teacher of this crate schedules its debounced work off its poll loop.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::{clamp_debounce, DEBOUNCE_DEFAULT_MS};
use crate::event::KeystrokeEvent;

type Sink = Box<dyn FnMut(&KeystrokeEvent)>;

/// Hot multicast channel: subscribers see only future events
struct Broadcaster {
    sinks: Vec<Sink>,
    closed: bool,
}

impl Broadcaster {
    fn new() -> Self {
        Self {
            sinks: Vec::new(),
            closed: false,
        }
    }

    fn subscribe(&mut self, sink: Sink) {
        if !self.closed {
            self.sinks.push(sink);
        }
    }

    fn emit(&mut self, event: &KeystrokeEvent) {
        if self.closed {
            return;
        }
        for sink in self.sinks.iter_mut() {
            sink(event);
        }
    }

    /// Close exactly once; further emits and subscribes are rejected
    fn complete(&mut self) {
        if !self.closed {
            self.closed = true;
            self.sinks.clear();
        }
    }
}

/// Debouncing fan-out for keystroke events
pub struct InputCoalescer {
    raw: Broadcaster,
    settled: Broadcaster,
    /// Latest event awaiting quiescence, and when it settles
    pending: Option<(KeystrokeEvent, Instant)>,
    debounce: Duration,
    running: bool,
    destroyed: bool,
}

impl Default for InputCoalescer {
    fn default() -> Self {
        Self::new(DEBOUNCE_DEFAULT_MS)
    }
}

impl InputCoalescer {
    /// Create with a debounce window in milliseconds, clamped to [10, 1000]
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            raw: Broadcaster::new(),
            settled: Broadcaster::new(),
            pending: None,
            debounce: Duration::from_millis(clamp_debounce(debounce_ms)),
            running: true,
            destroyed: false,
        }
    }

    /// Ingest one event: forward on the raw channel and re-arm the settle
    /// deadline with this event as the latest
    pub fn push(&mut self, event: KeystrokeEvent) {
        if self.destroyed || !self.running {
            return;
        }
        self.raw.emit(&event);
        let deadline = event.timestamp + self.debounce;
        self.pending = Some((event, deadline));
    }

    /// Fire the settle deadline if the quiet period has elapsed
    ///
    /// Call from the host loop; emits at most one settled event per call.
    pub fn tick(&mut self, now: Instant) {
        if self.destroyed {
            return;
        }
        // While stopped the timer stays armed; it fires once forwarding resumes
        if !self.running {
            return;
        }
        if let Some((_, deadline)) = &self.pending {
            if now >= *deadline {
                if let Some((event, _)) = self.pending.take() {
                    self.settled.emit(&event);
                }
            }
        }
    }

    /// When the armed settle deadline fires, if any
    ///
    /// Hosts can use this to size their poll timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Subscribe to the immediate per-event channel
    pub fn subscribe_raw(&mut self, sink: impl FnMut(&KeystrokeEvent) + 'static) {
        self.raw.subscribe(Box::new(sink));
    }

    /// Subscribe to the post-quiescence channel
    pub fn subscribe_settled(&mut self, sink: impl FnMut(&KeystrokeEvent) + 'static) {
        self.settled.subscribe(Box::new(sink));
    }

    /// Resume forwarding
    pub fn start(&mut self) {
        if !self.destroyed {
            self.running = true;
        }
    }

    /// Suspend forwarding without discarding a pending timer
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Tear down: cancel the pending timer and complete both channels.
    /// Idempotent; pushes after destruction are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        debug!("destroying input coalescer");
        self.destroyed = true;
        self.running = false;
        self.pending = None;
        self.raw.complete();
        self.settled.complete();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Adjust the debounce window; affects only the next armed deadline
    pub fn set_debounce_time(&mut self, ms: u64) {
        self.debounce = Duration::from_millis(clamp_debounce(ms));
    }

    pub fn debounce_time(&self) -> Duration {
        self.debounce
    }
}

impl std::fmt::Debug for InputCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputCoalescer")
            .field("debounce", &self.debounce)
            .field("running", &self.running)
            .field("destroyed", &self.destroyed)
            .field("pending", &self.pending.as_ref().map(|(e, _)| &e.token))
            .finish()
    }
}
