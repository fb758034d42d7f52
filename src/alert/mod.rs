//! Alert delivery.
//!
//! The monitor hands fire-once [`AlertEvent`]s to an [`AlertSink`]. In the
//! daemon that sink is an [`AlertChannel`]: a one-way request channel to a
//! worker thread that owns the host [`Notifier`]. The monitor never waits for
//! delivery.

mod channel;
mod notifier;

pub use channel::{AlertChannel, AlertReceipt, ChannelStats, DispatchOutcome};
pub use notifier::{CommandNotifier, HeadlessWindow, LogNotifier, Notifier, WindowHandle};

use crate::debounce::AlertEvent;

/// Receiver of alert events from the frame loop.
pub trait AlertSink {
    fn dispatch(&mut self, event: &AlertEvent);

    /// Drain delivery results. Called once per tick.
    fn poll(&mut self) {}
}

/// Keeps every event in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordedAlerts {
    pub events: Vec<AlertEvent>,
}

impl AlertSink for RecordedAlerts {
    fn dispatch(&mut self, event: &AlertEvent) {
        self.events.push(*event);
    }
}
