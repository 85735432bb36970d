//! Load-balancing policy selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the resolver picks among a function's backend addresses.
///
/// Immutable for the lifetime of a resolver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancingPolicy {
    /// Uniform choice over the known addresses.
    Random,
    /// Cycle through addresses with a persistent cursor.
    RoundRobin,
    /// Pick the address with the fewest in-flight requests.
    LeastConnections,
}

impl fmt::Display for BalancingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::RoundRobin => write!(f, "round-robin"),
            Self::LeastConnections => write!(f, "least-connections"),
        }
    }
}

impl FromStr for BalancingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "round-robin" | "round_robin" => Ok(Self::RoundRobin),
            "least-connections" | "least_connections" => Ok(Self::LeastConnections),
            other => Err(format!(
                "unknown balancing policy {other:?}, expected random, round-robin or least-connections"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_separators() {
        assert_eq!(
            "round_robin".parse::<BalancingPolicy>().unwrap(),
            BalancingPolicy::RoundRobin
        );
        assert_eq!(
            "least-connections".parse::<BalancingPolicy>().unwrap(),
            BalancingPolicy::LeastConnections
        );
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!("sticky".parse::<BalancingPolicy>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for policy in [
            BalancingPolicy::Random,
            BalancingPolicy::RoundRobin,
            BalancingPolicy::LeastConnections,
        ] {
            assert_eq!(policy.to_string().parse::<BalancingPolicy>().unwrap(), policy);
        }
    }
}
