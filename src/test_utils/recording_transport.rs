//! A transport that records deliveries instead of performing them.
//!
//! Responses are scripted up front; once the script runs out every request
//! is answered with `200 OK` and a small JSON acknowledgement. A held
//! transport parks each delivery until the test releases it, which keeps a
//! delivery in flight for as long as a test needs.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Condvar, Mutex};

use crate::error::TransportError;
use crate::transport::{DeliveryRequest, Transport, TransportResponse};

/// Upper bound on how long a held delivery waits for release.
const HOLD_LIMIT: Duration = Duration::from_secs(10);

/// Owned copy of a [`DeliveryRequest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub authorization: String,
    pub content_type: String,
    pub body: String,
}

pub struct RecordingTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    arrived: Condvar,
    script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    gate: Option<(Sender<()>, Receiver<()>)>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    /// Transport answering every request immediately with `200 OK`.
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            arrived: Condvar::new(),
            script: Mutex::new(VecDeque::new()),
            gate: None,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Transport that blocks each delivery until [`release`](Self::release).
    pub fn held() -> Self {
        Self {
            gate: Some(unbounded()),
            ..Self::new()
        }
    }

    /// Queue the outcome for the next unscripted request.
    pub fn push_response(&self, response: Result<TransportResponse, TransportError>) {
        self.script.lock().push_back(response);
    }

    /// Queue an HTTP response with `status` and `body`.
    pub fn push_status(&self, status: u16, status_text: &str, body: &str) {
        self.push_response(Ok(TransportResponse {
            status,
            status_text: status_text.to_owned(),
            body: body.to_owned(),
        }));
    }

    /// Let `count` held deliveries complete.
    pub fn release(&self, count: usize) {
        if let Some((tx, _)) = &self.gate {
            for _ in 0..count {
                let _ = tx.send(());
            }
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Block until at least `count` requests arrived or `timeout` elapsed.
    pub fn wait_for_requests(&self, count: usize, timeout: Duration) -> Vec<RecordedRequest> {
        let deadline = Instant::now() + timeout;
        let mut requests = self.requests.lock();
        while requests.len() < count {
            if self.arrived.wait_until(&mut requests, deadline).timed_out() {
                break;
            }
        }
        requests.clone()
    }

    /// Highest number of deliveries observed running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<TransportResponse, TransportError> {
        self.script.lock().pop_front().unwrap_or_else(|| {
            Ok(TransportResponse {
                status: 200,
                status_text: "OK".into(),
                body: r#"{"code":200}"#.into(),
            })
        })
    }
}

impl Transport for RecordingTransport {
    fn deliver(&self, request: &DeliveryRequest<'_>) -> Result<TransportResponse, TransportError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        {
            let mut requests = self.requests.lock();
            requests.push(RecordedRequest {
                url: request.url.to_owned(),
                authorization: request.authorization.to_owned(),
                content_type: request.content_type.to_owned(),
                body: request.body.to_owned(),
            });
        }
        self.arrived.notify_all();

        if let Some((_, rx)) = &self.gate {
            let _ = rx.recv_timeout(HOLD_LIMIT);
        }
        let response = self.next_response();
        self.active.fetch_sub(1, Ordering::SeqCst);
        response
    }
}
