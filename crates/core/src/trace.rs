use crate::LinkObserver;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// One completed transaction as seen on the wire.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransactionRecord {
    pub a: u16,
    pub b: u16,
    pub result: u16,
    /// Control-in levels in the order they were driven.
    pub edges: Vec<bool>,
    /// Busy-wait iterations spent across all four phases.
    pub polls: u64,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct LinkTrace {
    pub transactions: Vec<TransactionRecord>,
}

#[derive(Debug, Default)]
struct TraceState {
    current: Option<TransactionRecord>,
    trace: LinkTrace,
}

/// Observer that records every transaction for a later JSON dump.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    state: Mutex<TraceState>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_trace(&self) -> LinkTrace {
        std::mem::take(&mut self.state.lock().unwrap().trace)
    }
}

impl LinkObserver for TraceRecorder {
    fn on_transaction_start(&self, a: u16, b: u16) {
        self.state.lock().unwrap().current = Some(TransactionRecord {
            a,
            b,
            result: 0,
            edges: Vec::new(),
            polls: 0,
        });
    }

    fn on_control_edge(&self, level: bool) {
        if let Some(current) = self.state.lock().unwrap().current.as_mut() {
            current.edges.push(level);
        }
    }

    fn on_poll(&self) {
        if let Some(current) = self.state.lock().unwrap().current.as_mut() {
            current.polls += 1;
        }
    }

    fn on_transaction_end(&self, result: u16) {
        let mut state = self.state.lock().unwrap();
        if let Some(mut current) = state.current.take() {
            current.result = result;
            state.trace.transactions.push(current);
        }
    }
}
