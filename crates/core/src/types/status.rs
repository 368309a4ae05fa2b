//! Order lifecycle status.
//!
//! ```text
//! NEW ──► PRC ──► PAY ──► SPS ──► SHP ──► CMP
//!  │       │       │       │       │
//!  └───────┴───────┴───────┴───────┴──► CNC
//! ```
//!
//! Orders are always created as [`OrderStatus::New`]. Later changes go
//! through the staff-only status update and are not constrained to the
//! forward path above; see [`OrderStatus::is_forward_of`].

use serde::{Deserialize, Serialize};

/// Unknown status code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown order status code: {0}")]
pub struct StatusParseError(pub String);

/// Order lifecycle status, persisted as a three-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "PRC")]
    Processing,
    #[serde(rename = "PAY")]
    AwaitingPayment,
    #[serde(rename = "SPS")]
    PreparingShipment,
    #[serde(rename = "SHP")]
    Shipped,
    #[serde(rename = "CMP")]
    Completed,
    #[serde(rename = "CNC")]
    Canceled,
}

impl OrderStatus {
    /// All statuses in lifecycle order, `Canceled` last.
    pub const ALL: [Self; 7] = [
        Self::New,
        Self::Processing,
        Self::AwaitingPayment,
        Self::PreparingShipment,
        Self::Shipped,
        Self::Completed,
        Self::Canceled,
    ];

    /// The short code stored in the `status` column.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PRC",
            Self::AwaitingPayment => "PAY",
            Self::PreparingShipment => "SPS",
            Self::Shipped => "SHP",
            Self::Completed => "CMP",
            Self::Canceled => "CNC",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Processing => "Processing",
            Self::AwaitingPayment => "Awaiting payment",
            Self::PreparingShipment => "Preparing for shipment",
            Self::Shipped => "Shipped",
            Self::Completed => "Completed",
            Self::Canceled => "Canceled",
        }
    }

    /// Parse a stored short code.
    ///
    /// # Errors
    ///
    /// Returns [`StatusParseError`] for codes outside the fixed set.
    pub fn from_code(code: &str) -> Result<Self, StatusParseError> {
        Self::ALL
            .into_iter()
            .find(|s| s.code().eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| StatusParseError(code.to_owned()))
    }

    /// Returns true for `Completed` and `Canceled`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Returns true if moving from `previous` to `self` follows the
    /// lifecycle: strictly later on the forward path, or a cancellation of a
    /// non-terminal order.
    #[must_use]
    pub fn is_forward_of(&self, previous: Self) -> bool {
        if previous.is_terminal() {
            return false;
        }
        match self {
            Self::Canceled => true,
            next => next.rank() > previous.rank(),
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::New => 0,
            Self::Processing => 1,
            Self::AwaitingPayment => 2,
            Self::PreparingShipment => 3,
            Self::Shipped => 4,
            Self::Completed | Self::Canceled => 5,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}
