//! New-order notifications.
//!
//! Checkout hands the order summary to a [`NotificationSink`] after the order
//! is committed. Delivery is best-effort: the caller logs any error and moves
//! on.

mod log;
mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::RepositoryError;

pub use log::LogNotifier;
pub use telegram::{TelegramNotifier, escape_html};

/// Errors that can occur when delivering a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    /// The messaging API rejected the message.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// No response within the configured timeout.
    #[error("notification timed out")]
    Timeout,

    /// Nobody to deliver to.
    #[error("notifications not configured: {0}")]
    NotConfigured(String),

    /// Recipient registry could not be read.
    #[error("recipient lookup failed: {0}")]
    Recipients(#[from] RepositoryError),
}

/// Outcome of a delivery that reached at least one recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Destination for new-order messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `message` to every registered recipient.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` when no recipient received the message.
    async fn send(&self, message: &str) -> Result<DeliveryReport, NotificationError>;
}
