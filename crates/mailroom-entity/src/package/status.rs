//! Package lifecycle states and the transition policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a package.
///
/// `Delivered` and `Returned` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    /// Just logged in at the mailroom. Always the initial state.
    Registered,
    /// Shelved, waiting for the recipient to come by.
    AwaitingPickup,
    /// Being walked to the recipient's desk.
    OutForDelivery,
    /// Handed over. Terminal.
    Delivered,
    /// Sent back to the carrier. Terminal.
    Returned,
}

impl PackageStatus {
    /// Database/string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::AwaitingPickup => "awaiting_pickup",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Returned => "returned",
        }
    }

    /// Whether no further transitions are permitted from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Returned)
    }

    /// Whether the transition `self -> to` is allowed by the lifecycle.
    pub fn can_transition_to(&self, to: PackageStatus) -> bool {
        use PackageStatus::*;
        match self {
            Registered => matches!(to, AwaitingPickup | OutForDelivery | Returned),
            AwaitingPickup => matches!(to, OutForDelivery | Delivered | Returned),
            OutForDelivery => matches!(to, Delivered | Returned),
            Delivered | Returned => false,
        }
    }

    /// All states, in lifecycle order.
    pub fn all() -> [PackageStatus; 5] {
        [
            Self::Registered,
            Self::AwaitingPickup,
            Self::OutForDelivery,
            Self::Delivered,
            Self::Returned,
        ]
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(Self::Registered),
            "awaiting_pickup" => Ok(Self::AwaitingPickup),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "returned" => Ok(Self::Returned),
            other => Err(format!("unknown package status '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PackageStatus::*;
    use super::*;

    #[test]
    fn terminal_states_have_no_successors() {
        for to in PackageStatus::all() {
            assert!(!Delivered.can_transition_to(to));
            assert!(!Returned.can_transition_to(to));
        }
    }

    #[test]
    fn registered_cannot_jump_to_delivered() {
        assert!(!Registered.can_transition_to(Delivered));
        assert!(Registered.can_transition_to(AwaitingPickup));
        assert!(Registered.can_transition_to(OutForDelivery));
        assert!(Registered.can_transition_to(Returned));
    }

    #[test]
    fn pickup_flow_reaches_delivery() {
        assert!(AwaitingPickup.can_transition_to(Delivered));
        assert!(OutForDelivery.can_transition_to(Delivered));
        assert!(!OutForDelivery.can_transition_to(AwaitingPickup));
    }

    #[test]
    fn no_self_transitions() {
        for status in PackageStatus::all() {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn round_trips_through_strings() {
        for status in PackageStatus::all() {
            assert_eq!(status.as_str().parse::<PackageStatus>().unwrap(), status);
        }
    }
}
