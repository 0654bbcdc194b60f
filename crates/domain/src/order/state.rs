//! Order state machines.
//!
//! Fulfillment and payment are independent axes; legality of a move is
//! checked per axis.

use serde::{Deserialize, Serialize};

/// Kitchen and service progress.
///
/// ```text
/// Pending ──► Confirmed ──► Preparing ──► Ready ──► Served
///    │            │             │           │
///    └────────────┴─────────────┴───────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

impl FulfillmentStatus {
    /// The single forward step from this status, if any.
    pub fn next(&self) -> Option<FulfillmentStatus> {
        match self {
            FulfillmentStatus::Pending => Some(FulfillmentStatus::Confirmed),
            FulfillmentStatus::Confirmed => Some(FulfillmentStatus::Preparing),
            FulfillmentStatus::Preparing => Some(FulfillmentStatus::Ready),
            FulfillmentStatus::Ready => Some(FulfillmentStatus::Served),
            FulfillmentStatus::Served | FulfillmentStatus::Cancelled => None,
        }
    }

    /// Whether `target` is a legal move from here.
    pub fn can_transition_to(&self, target: FulfillmentStatus) -> bool {
        if target == FulfillmentStatus::Cancelled {
            return !self.is_terminal();
        }
        self.next() == Some(target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FulfillmentStatus::Served | FulfillmentStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "PENDING",
            FulfillmentStatus::Confirmed => "CONFIRMED",
            FulfillmentStatus::Preparing => "PREPARING",
            FulfillmentStatus::Ready => "READY",
            FulfillmentStatus::Served => "SERVED",
            FulfillmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FulfillmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(FulfillmentStatus::Pending),
            "CONFIRMED" => Ok(FulfillmentStatus::Confirmed),
            "PREPARING" => Ok(FulfillmentStatus::Preparing),
            "READY" => Ok(FulfillmentStatus::Ready),
            "SERVED" => Ok(FulfillmentStatus::Served),
            "CANCELLED" => Ok(FulfillmentStatus::Cancelled),
            other => Err(format!("unknown fulfillment status: {other}")),
        }
    }
}

/// Payment flag. Only ever moves `Unpaid` to `Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Paid => "PAID",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
