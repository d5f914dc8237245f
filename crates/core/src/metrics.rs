use crate::LinkObserver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct LinkMetrics {
    transaction_count: AtomicU64,
    edge_count: AtomicU64,
    poll_count: AtomicU64,
    start_time: Instant,
}

impl Default for LinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self {
            transaction_count: AtomicU64::new(0),
            edge_count: AtomicU64::new(0),
            poll_count: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn reset(&self) {
        self.transaction_count.store(0, Ordering::SeqCst);
        self.edge_count.store(0, Ordering::SeqCst);
        self.poll_count.store(0, Ordering::SeqCst);
    }

    pub fn get_transactions(&self) -> u64 {
        self.transaction_count.load(Ordering::SeqCst)
    }

    pub fn get_edges(&self) -> u64 {
        self.edge_count.load(Ordering::SeqCst)
    }

    /// Busy-wait iterations that found control-out not yet mirrored.
    pub fn get_polls(&self) -> u64 {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn get_tps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_transactions() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl LinkObserver for LinkMetrics {
    fn on_control_edge(&self, _level: bool) {
        self.edge_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_poll(&self) {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_transaction_end(&self, _result: u16) {
        self.transaction_count.fetch_add(1, Ordering::SeqCst);
    }
}
