//! Idle/Flushing state machine driving flush decisions.
//!
//! `ShipperState` performs no I/O and never reads the clock itself; the worker
//! passes `now` in and dispatches whatever [`Batch`] comes back. This keeps the
//! scheduling rules testable without threads or sleeps.

use std::time::{Duration, Instant};

use crate::config::ShipperConfig;

use super::buffer::{Batch, PendingBuffer, PushOutcome};

#[derive(Debug)]
pub struct ShipperState {
    buffer: PendingBuffer,
    batch_size: usize,
    time_threshold: Duration,
    deadline: Option<Instant>,
    in_flight: bool,
}

impl ShipperState {
    pub fn new(config: &ShipperConfig) -> Self {
        Self {
            buffer: PendingBuffer::new(config.buffer_limit),
            batch_size: config.batch_size,
            time_threshold: config.time_threshold,
            deadline: None,
            in_flight: false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer `entry` and decide whether to flush now or wait.
    pub fn accept(&mut self, entry: String, now: Instant) -> (PushOutcome, Option<Batch>) {
        let outcome = self.buffer.push(entry);
        (outcome, self.schedule(now))
    }

    /// Buffer `entry` without touching the timer or starting a delivery.
    pub fn enqueue(&mut self, entry: String) -> PushOutcome {
        self.buffer.push(entry)
    }

    /// Cancel the live deadline, then flush immediately if the buffer has
    /// reached the batch size and nothing is in flight; otherwise re-arm.
    pub fn schedule(&mut self, now: Instant) -> Option<Batch> {
        self.deadline = None;
        if self.buffer.len() >= self.batch_size && !self.in_flight {
            return self.flush();
        }
        if !self.buffer.is_empty() {
            // An unrepresentable deadline means the timer never fires.
            self.deadline = now.checked_add(self.time_threshold);
        }
        None
    }

    /// Take the next batch and mark it in flight.
    ///
    /// Returns `None` without changing any state when the buffer is empty or
    /// a delivery is already outstanding.
    pub fn flush(&mut self) -> Option<Batch> {
        if self.in_flight {
            return None;
        }
        let batch = self.buffer.take_batch(self.batch_size)?;
        self.in_flight = true;
        Some(batch)
    }

    /// The armed deadline has passed.
    pub fn on_deadline(&mut self) -> Option<Batch> {
        self.deadline = None;
        self.flush()
    }

    /// The outstanding delivery finished, successfully or not.
    pub fn on_delivery_complete(&mut self, now: Instant) -> Option<Batch> {
        self.in_flight = false;
        self.schedule(now)
    }

    /// Clear the in-flight flag without rescheduling.
    pub fn release_in_flight(&mut self) {
        self.in_flight = false;
    }
}
