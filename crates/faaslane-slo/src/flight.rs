//! Single-flight table for in-progress alert runs.
//!
//! Concurrent alerts for the same (function, node) pair would race to
//! scale the same target; the table lets exactly one run proceed and
//! turns the rest away until its guard drops.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub(crate) struct FlightTable {
    keys: Arc<Mutex<HashSet<(String, String)>>>,
}

impl FlightTable {
    /// Claim the (function, node) key. Returns None if a run for the
    /// same key is already in flight.
    pub(crate) fn try_acquire(&self, function: &str, node: &str) -> Option<FlightGuard> {
        let mut keys = self.keys.lock().expect("flight table lock");
        let key = (function.to_string(), node.to_string());
        if keys.insert(key.clone()) {
            Some(FlightGuard {
                key,
                keys: self.keys.clone(),
            })
        } else {
            None
        }
    }
}

/// Releases the claimed key on drop.
pub(crate) struct FlightGuard {
    key: (String, String),
    keys: Arc<Mutex<HashSet<(String, String)>>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.keys.lock().expect("flight table lock").remove(&self.key);
    }
}
