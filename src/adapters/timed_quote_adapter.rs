//! Deadline wrapper for a slower quote source.
//!
//! Each lookup runs on its own thread; if it does not answer within the
//! timeout the caller gets `Unavailable` and the worker's late answer is
//! dropped. A worker that never returns keeps its thread, so at most
//! `max_in_flight` workers may be running at once; further lookups fail
//! fast until one finishes.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::warn;

use crate::domain::error::PriceUnavailable;
use crate::ports::quote_port::QuotePort;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

pub struct TimedQuoteAdapter {
    inner: Arc<dyn QuotePort + Send + Sync>,
    timeout: Duration,
    max_in_flight: usize,
    in_flight: Arc<AtomicUsize>,
}

/// Releases a worker slot when the worker ends, including by panic.
struct WorkerSlot(Arc<AtomicUsize>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TimedQuoteAdapter {
    pub fn new(inner: Arc<dyn QuotePort + Send + Sync>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Workers still running, including ones whose caller already gave up.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn claim_slot(&self) -> Option<WorkerSlot> {
        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_in_flight).then_some(n + 1)
            })
            .ok()
            .map(|_| WorkerSlot(Arc::clone(&self.in_flight)))
    }
}

impl QuotePort for TimedQuoteAdapter {
    fn quote(&self, symbol: &str) -> Result<Decimal, PriceUnavailable> {
        let Some(slot) = self.claim_slot() else {
            warn!(symbol, max_in_flight = self.max_in_flight, "quote source saturated");
            return Err(PriceUnavailable::Unavailable {
                symbol: symbol.to_string(),
                reason: format!("{} lookups still outstanding", self.max_in_flight),
            });
        };

        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let owned = symbol.to_string();
        thread::spawn(move || {
            let _slot = slot;
            let _ = tx.send(inner.quote(&owned));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(symbol, timeout_ms = self.timeout.as_millis() as u64, "quote timed out");
                Err(PriceUnavailable::Unavailable {
                    symbol: symbol.to_string(),
                    reason: format!("no answer within {}ms", self.timeout.as_millis()),
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(PriceUnavailable::Unavailable {
                symbol: symbol.to_string(),
                reason: "quote source failed".into(),
            }),
        }
    }
}
