use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use super::notifier::{Notifier, WindowHandle};
use super::AlertSink;
use crate::debounce::AlertEvent;

struct AlertRequest {
    id: u64,
    title: &'static str,
    body: &'static str,
}

/// Delivery result reported back by the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertReceipt {
    pub id: u64,
    pub delivered: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the worker under this request id.
    Queued(u64),
    /// Held until the in-flight request is answered, then sent.
    Held,
    /// Dropped because a request is in flight and another is already held.
    Coalesced,
    /// The worker is gone.
    Closed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub queued: u64,
    pub held: u64,
    pub delivered: u64,
    pub failed: u64,
    pub coalesced: u64,
}

/// Fire-and-forget alert channel with at most one request in flight.
///
/// The worker thread owns the notifier. When the notifier reports failure (or
/// panics) the worker brings the host window forward instead; the alert is not
/// retried. One alert arriving while another is in flight is held and sent
/// once the worker answers.
pub struct AlertChannel {
    notifier_name: &'static str,
    requests: Option<Sender<AlertRequest>>,
    receipts: Receiver<AlertReceipt>,
    in_flight: Option<u64>,
    held: Option<AlertEvent>,
    next_id: u64,
    stats: ChannelStats,
    join: Option<JoinHandle<()>>,
}

impl AlertChannel {
    /// Start the worker.
    ///
    /// `primary` is used when its capability check passes, otherwise
    /// `fallback` takes over for the lifetime of the channel.
    pub fn spawn(
        primary: Box<dyn Notifier>,
        fallback: Box<dyn Notifier>,
        window: Box<dyn WindowHandle>,
    ) -> Result<Self> {
        let notifier = if primary.is_supported() {
            primary
        } else {
            log::warn!(
                "{} notifications not supported; falling back to {}",
                primary.name(),
                fallback.name()
            );
            fallback
        };
        let notifier_name = notifier.name();
        log::info!("alert channel using {} notifier", notifier_name);

        let (request_tx, request_rx) = mpsc::channel();
        let (receipt_tx, receipt_rx) = mpsc::channel();
        let join = std::thread::Builder::new()
            .name("pullwatch-alert".to_string())
            .spawn(move || run_worker(notifier, window, request_rx, receipt_tx))
            .map_err(|e| anyhow!("failed to spawn alert worker: {}", e))?;

        Ok(Self {
            notifier_name,
            requests: Some(request_tx),
            receipts: receipt_rx,
            in_flight: None,
            held: None,
            next_id: 1,
            stats: ChannelStats::default(),
            join: Some(join),
        })
    }

    pub fn notifier_name(&self) -> &'static str {
        self.notifier_name
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// False once the worker has stopped.
    pub fn is_open(&self) -> bool {
        self.requests.is_some()
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Send an alert without waiting for delivery.
    pub fn send(&mut self, event: &AlertEvent) -> DispatchOutcome {
        self.drain_receipts();
        if self.requests.is_none() {
            log::error!("alert worker stopped; dropping alert");
            return DispatchOutcome::Closed;
        }
        if self.in_flight.is_some() {
            if self.held.is_none() {
                self.held = Some(*event);
                self.stats.held += 1;
                log::info!("alert held: previous notification still in flight");
                return DispatchOutcome::Held;
            }
            self.stats.coalesced += 1;
            log::info!("alert coalesced: a notification is already waiting");
            return DispatchOutcome::Coalesced;
        }
        self.submit(event)
    }

    /// Non-blocking drain of worker replies.
    pub fn drain_receipts(&mut self) -> Vec<AlertReceipt> {
        let mut receipts = Vec::new();
        loop {
            match self.receipts.try_recv() {
                Ok(receipt) => {
                    self.record(receipt);
                    receipts.push(receipt);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.worker_gone();
                    break;
                }
            }
        }
        receipts
    }

    /// Block until the in-flight request and any held alert are answered.
    ///
    /// Returns false on timeout.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receipts.recv_timeout(remaining) {
                Ok(receipt) => self.record(receipt),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => self.worker_gone(),
            }
        }
        true
    }

    /// Stop accepting alerts and join the worker.
    pub fn close(mut self) -> Result<ChannelStats> {
        self.shutdown()?;
        Ok(self.stats)
    }

    fn submit(&mut self, event: &AlertEvent) -> DispatchOutcome {
        let Some(requests) = self.requests.as_ref() else {
            return DispatchOutcome::Closed;
        };
        let id = self.next_id;
        let request = AlertRequest {
            id,
            title: event.title(),
            body: event.body(),
        };
        if requests.send(request).is_err() {
            self.worker_gone();
            return DispatchOutcome::Closed;
        }
        self.next_id += 1;
        self.in_flight = Some(id);
        self.stats.queued += 1;
        log::info!("sending notification #{} through {}", id, self.notifier_name);
        DispatchOutcome::Queued(id)
    }

    fn shutdown(&mut self) -> Result<()> {
        self.held = None;
        self.requests.take();
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("alert worker thread panicked"))?;
        }
        self.drain_receipts();
        Ok(())
    }

    /// The worker hung up without being asked to.
    fn worker_gone(&mut self) {
        if self.requests.take().is_some() {
            log::error!("alert worker stopped unexpectedly; alerts can no longer be delivered");
        }
        if let Some(id) = self.in_flight.take() {
            self.stats.failed += 1;
            log::error!("notification #{} lost with the alert worker", id);
        }
        if self.held.take().is_some() {
            log::error!("held alert dropped: alert worker stopped");
        }
    }

    fn record(&mut self, receipt: AlertReceipt) {
        if self.in_flight == Some(receipt.id) {
            self.in_flight = None;
        }
        if receipt.delivered {
            self.stats.delivered += 1;
            log::info!("notification #{} sent successfully", receipt.id);
        } else {
            self.stats.failed += 1;
            log::warn!("notification #{} failed to send", receipt.id);
        }
        if self.in_flight.is_none() {
            if let Some(event) = self.held.take() {
                self.submit(&event);
            }
        }
    }
}

impl AlertSink for AlertChannel {
    fn dispatch(&mut self, event: &AlertEvent) {
        self.send(event);
    }

    fn poll(&mut self) {
        self.drain_receipts();
    }
}

impl Drop for AlertChannel {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("alert channel shutdown: {}", e);
        }
    }
}

fn run_worker(
    mut notifier: Box<dyn Notifier>,
    mut window: Box<dyn WindowHandle>,
    requests: Receiver<AlertRequest>,
    receipts: Sender<AlertReceipt>,
) {
    for request in requests {
        log::debug!("notification request #{}: {}", request.id, request.title);
        let delivered = match panic::catch_unwind(AssertUnwindSafe(|| {
            notifier.notify(request.title, request.body)
        })) {
            Ok(delivered) => delivered,
            Err(_) => {
                log::error!(
                    "{} notifier panicked on notification #{}",
                    notifier.name(),
                    request.id
                );
                false
            }
        };
        if !delivered && panic::catch_unwind(AssertUnwindSafe(|| window.raise())).is_err() {
            log::error!("raising the host window panicked");
        }
        if receipts
            .send(AlertReceipt {
                id: request.id,
                delivered,
            })
            .is_err()
        {
            break;
        }
    }
}
