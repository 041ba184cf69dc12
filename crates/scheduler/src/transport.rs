//! Delivery transport trait and payloads.

use async_trait::async_trait;
use chrono::NaiveTime;
use thiserror::Error;
use tracing::info;

use crate::jobs::Prayer;

/// Transport failure classes.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The recipient channel is gone. The group gets deactivated; no retry.
    #[error("Recipient unreachable: {0}")]
    Permanent(String),

    /// A retriable delivery failure.
    #[error("Transient transport error: {0}")]
    Transient(String),
}

/// What gets delivered. Structured; rendering belongs to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryPayload {
    /// A prayer-time alert.
    PrayerAlert {
        prayer: Prayer,
        /// Group-local time of the prayer.
        time: NaiveTime,
        /// Hijri date label for the day.
        hijri_date: String,
    },
    /// A content excerpt.
    Content {
        body: String,
        attribution: String,
        grade: String,
        source_url: String,
    },
}

/// Trait for delivering payloads to a recipient channel.
///
/// Abstracted to support different chat transports and tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one payload to a recipient channel.
    async fn deliver(&self, recipient: &str, payload: &DeliveryPayload)
        -> Result<(), TransportError>;
}

/// A transport that discards all deliveries. For tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct NoOpTransport;

#[async_trait]
impl Transport for NoOpTransport {
    async fn deliver(
        &self,
        _recipient: &str,
        _payload: &DeliveryPayload,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

/// A transport that logs each delivery instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LoggingTransport;

#[async_trait]
impl Transport for LoggingTransport {
    async fn deliver(
        &self,
        recipient: &str,
        payload: &DeliveryPayload,
    ) -> Result<(), TransportError> {
        match payload {
            DeliveryPayload::PrayerAlert { prayer, time, hijri_date } => {
                info!(
                    "[{}] {} at {} ({})",
                    recipient,
                    prayer.as_str(),
                    time.format("%H:%M"),
                    hijri_date
                );
            }
            DeliveryPayload::Content { body, attribution, source_url, .. } => {
                info!("[{}] {} - {} ({})", recipient, body, attribution, source_url);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_doubles_accept_both_payloads() {
        let alert = DeliveryPayload::PrayerAlert {
            prayer: Prayer::Fajr,
            time: NaiveTime::from_hms_opt(5, 10, 0).unwrap(),
            hijri_date: "27 Rajab 1447 AH".to_string(),
        };
        let content = DeliveryPayload::Content {
            body: "body".to_string(),
            attribution: "Narrated by Muslim".to_string(),
            grade: "Sahih".to_string(),
            source_url: "https://example.org/1".to_string(),
        };

        NoOpTransport.deliver("g1", &alert).await.unwrap();
        NoOpTransport.deliver("g1", &content).await.unwrap();
        LoggingTransport.deliver("g1", &alert).await.unwrap();
        LoggingTransport.deliver("g1", &content).await.unwrap();
    }
}
