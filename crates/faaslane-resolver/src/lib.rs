//! faaslane-resolver — resolves a logical function name to a backend URL.
//!
//! A function name may carry a `.`-separated namespace suffix
//! (`resize.staging`); without one the resolver's default namespace
//! applies. Per-namespace address books are created lazily on first
//! use and reconciled against every endpoint response observed from
//! the control plane, so addresses removed upstream do not linger.
//!
//! Selection among addresses is governed by one of three policies
//! fixed at construction: random, round-robin, or least-connections.
//! Least-connections pairs a selection-time increment with an
//! explicit [`FunctionResolver::release`] call from the forwarding
//! layer once the request completes.

pub mod error;
pub mod policy;
pub mod resolver;

pub use error::ResolveError;
pub use policy::BalancingPolicy;
pub use resolver::{FunctionResolver, ResolvedTarget, FUNCTION_PORT};
