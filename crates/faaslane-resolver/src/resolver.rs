//! Function resolution and per-namespace address books.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use rand::Rng;
use tracing::debug;

use faaslane_cluster::ClusterClient;

use crate::error::ResolveError;
use crate::policy::BalancingPolicy;

/// Port every function instance listens on.
pub const FUNCTION_PORT: u16 = 8080;

/// The outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ResolvedTarget {
    pub namespace: String,
    pub ip: String,
    pub url: String,
}

/// Address book for one namespace.
///
/// All mutation happens under one mutex so compound steps — notably
/// the read-then-increment of least-connections selection — are a
/// single exclusive unit.
#[derive(Default)]
struct AddressBook {
    /// Known addresses in insertion order.
    addresses: Vec<String>,
    /// In-flight request count per address. Kept 1:1 with `addresses`.
    in_flight: HashMap<String, usize>,
    /// Which addresses each function currently owns, for reconciliation.
    by_function: HashMap<String, HashSet<String>>,
    /// Round-robin cursor; persists across calls.
    cursor: usize,
}

impl AddressBook {
    /// Sync the book with an observed endpoint response for `function`.
    ///
    /// New addresses are appended with a zero counter; addresses the
    /// function no longer exposes are pruned from the list, the
    /// counter map, and the ownership set.
    fn reconcile(&mut self, function: &str, observed: &[String]) {
        let observed_set: HashSet<&str> = observed.iter().map(String::as_str).collect();
        let owned = self.by_function.entry(function.to_string()).or_default();

        let stale: Vec<String> = owned
            .iter()
            .filter(|ip| !observed_set.contains(ip.as_str()))
            .cloned()
            .collect();
        for ip in &stale {
            owned.remove(ip);
            self.in_flight.remove(ip);
            self.addresses.retain(|a| a != ip);
        }

        for ip in observed {
            if owned.insert(ip.clone()) && !self.in_flight.contains_key(ip) {
                self.in_flight.insert(ip.clone(), 0);
                self.addresses.push(ip.clone());
            }
        }

        if !stale.is_empty() {
            debug!(function, pruned = stale.len(), "pruned stale addresses");
        }
        if self.addresses.is_empty() {
            self.cursor = 0;
        } else {
            self.cursor %= self.addresses.len();
        }
    }

    /// Pick one address according to `policy`.
    fn select(&mut self, policy: BalancingPolicy) -> Option<String> {
        if self.addresses.is_empty() {
            return None;
        }
        let ip = match policy {
            BalancingPolicy::Random => {
                let idx = rand::thread_rng().gen_range(0..self.addresses.len());
                self.addresses[idx].clone()
            }
            BalancingPolicy::RoundRobin => {
                let idx = self.cursor % self.addresses.len();
                self.cursor = (idx + 1) % self.addresses.len();
                self.addresses[idx].clone()
            }
            BalancingPolicy::LeastConnections => {
                // First occurrence wins ties; the increment happens
                // under the same lock as the scan.
                let mut min_idx = 0;
                for (idx, addr) in self.addresses.iter().enumerate() {
                    if self.in_flight[addr] < self.in_flight[&self.addresses[min_idx]] {
                        min_idx = idx;
                    }
                }
                let chosen = self.addresses[min_idx].clone();
                if let Some(count) = self.in_flight.get_mut(&chosen) {
                    *count += 1;
                }
                chosen
            }
        };
        Some(ip)
    }

    fn release(&mut self, ip: &str) {
        if let Some(count) = self.in_flight.get_mut(ip) {
            *count = count.saturating_sub(1);
        }
    }
}

#[derive(Default)]
struct NamespaceState {
    book: Mutex<AddressBook>,
}

/// Resolves function names to backend URLs.
pub struct FunctionResolver {
    default_namespace: String,
    reserved: Vec<String>,
    policy: BalancingPolicy,
    cluster: Arc<dyn ClusterClient>,
    /// Lazily-created per-namespace address books.
    namespaces: RwLock<HashMap<String, Arc<NamespaceState>>>,
}

impl FunctionResolver {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        default_namespace: impl Into<String>,
        policy: BalancingPolicy,
    ) -> Self {
        Self {
            default_namespace: default_namespace.into(),
            reserved: vec!["kube-system".to_string()],
            policy,
            cluster,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Override the reserved namespace list.
    pub fn with_reserved_namespaces(mut self, reserved: Vec<String>) -> Self {
        self.reserved = reserved;
        self
    }

    /// Resolve `name` to a backend target.
    ///
    /// `name` is either a bare function name (default namespace) or
    /// `function.namespace`; the last `.` wins as separator.
    pub async fn resolve(&self, name: &str) -> Result<ResolvedTarget, ResolveError> {
        let (function, namespace) = split_name(name, &self.default_namespace);

        if self.reserved.iter().any(|ns| ns == namespace) {
            return Err(ResolveError::NamespaceNotAllowed(namespace.to_string()));
        }

        let state = self.namespace_state(namespace);

        let endpoints = self
            .cluster
            .endpoints(namespace, function)
            .await
            .map_err(|e| ResolveError::Lookup {
                function: function.to_string(),
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })?;

        let observed: Vec<String> = match endpoints.subsets.first() {
            Some(subset) if !subset.addresses.is_empty() => {
                subset.addresses.iter().map(|a| a.ip.clone()).collect()
            }
            _ => {
                return Err(ResolveError::NoAddresses {
                    function: function.to_string(),
                    namespace: namespace.to_string(),
                });
            }
        };

        let selected = {
            let mut book = state.book.lock().expect("address book lock");
            book.reconcile(function, &observed);
            book.select(self.policy)
        };

        let ip = selected.ok_or_else(|| ResolveError::NoAddresses {
            function: function.to_string(),
            namespace: namespace.to_string(),
        })?;

        debug!(function, namespace, ip = %ip, policy = %self.policy, "resolved function");

        Ok(ResolvedTarget {
            namespace: namespace.to_string(),
            url: format!("http://{ip}:{FUNCTION_PORT}"),
            ip,
        })
    }

    /// Signal that a request to `ip` in `namespace` has completed.
    ///
    /// Pairs with the increment least-connections performs at
    /// selection time. A no-op for unknown namespaces or addresses.
    pub fn release(&self, namespace: &str, ip: &str) {
        let state = self.namespaces.read().expect("namespace map lock");
        if let Some(state) = state.get(namespace) {
            state.book.lock().expect("address book lock").release(ip);
        }
    }

    /// Current in-flight count for an address (diagnostics).
    pub fn in_flight_count(&self, namespace: &str, ip: &str) -> Option<usize> {
        let map = self.namespaces.read().expect("namespace map lock");
        let state = map.get(namespace)?;
        let book = state.book.lock().expect("address book lock");
        book.in_flight.get(ip).copied()
    }

    /// Known addresses for a namespace in insertion order (diagnostics).
    pub fn known_addresses(&self, namespace: &str) -> Vec<String> {
        let map = self.namespaces.read().expect("namespace map lock");
        match map.get(namespace) {
            Some(state) => state.book.lock().expect("address book lock").addresses.clone(),
            None => Vec::new(),
        }
    }

    fn namespace_state(&self, namespace: &str) -> Arc<NamespaceState> {
        if let Some(state) = self
            .namespaces
            .read()
            .expect("namespace map lock")
            .get(namespace)
        {
            return state.clone();
        }
        let mut map = self.namespaces.write().expect("namespace map lock");
        map.entry(namespace.to_string())
            .or_insert_with(|| Arc::new(NamespaceState::default()))
            .clone()
    }
}

fn split_name<'a>(name: &'a str, default_namespace: &'a str) -> (&'a str, &'a str) {
    match name.rsplit_once('.') {
        Some((function, namespace)) => (function, namespace),
        None => (name, default_namespace),
    }
}
