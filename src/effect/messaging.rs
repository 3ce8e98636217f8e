//! Message broker effects.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{EffectCategory, EffectTag, Operation};
use crate::program::Program;

/// Broker-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps an identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Opaque handle used to settle a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Wraps a handle.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A message to publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Destination topic or queue.
    pub topic: String,
    /// Message body.
    pub payload: serde_json::Value,
    /// Correlates the message with the unit of work that produced it.
    pub correlation_id: Option<String>,
}

impl OutboundMessage {
    /// Creates a message without correlation identifier.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
            correlation_id: None,
        }
    }

    /// Attaches a correlation identifier.
    #[must_use]
    pub fn with_correlation_id(self, correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            ..self
        }
    }
}

/// A message received from a queue, awaiting settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    /// Identifier assigned at publication.
    pub message_id: MessageId,
    /// Message body.
    pub payload: serde_json::Value,
    /// Handle to acknowledge or reject this delivery.
    pub receipt: ReceiptHandle,
    /// How many times the message has been delivered, this one included.
    pub attempts: u32,
}

/// Operations against the message broker.
#[derive(Debug, Clone, PartialEq)]
pub enum MessagingEffect {
    /// Publish a message; resumes with `MessageId`.
    Publish {
        /// The message.
        message: OutboundMessage,
    },
    /// Take the next message from a queue; resumes with `Option<Delivery>`.
    Consume {
        /// Queue to read from.
        queue: String,
    },
    /// Settle a delivery as processed; resumes with `()`.
    Acknowledge {
        /// Delivery handle.
        receipt: ReceiptHandle,
    },
    /// Settle a delivery as failed; resumes with `()`.
    NegativeAcknowledge {
        /// Delivery handle.
        receipt: ReceiptHandle,
        /// Whether the broker should deliver the message again.
        requeue: bool,
    },
}

impl Operation for MessagingEffect {
    const CATEGORY: EffectCategory = EffectCategory::Messaging;

    fn tag(&self) -> EffectTag {
        match self {
            Self::Publish { .. } => EffectTag::Publish,
            Self::Consume { .. } => EffectTag::Consume,
            Self::Acknowledge { .. } => EffectTag::Acknowledge,
            Self::NegativeAcknowledge { .. } => EffectTag::NegativeAcknowledge,
        }
    }

    fn resource_id(&self) -> Option<String> {
        match self {
            Self::Publish { message } => Some(message.topic.clone()),
            Self::Consume { queue } => Some(queue.clone()),
            Self::Acknowledge { receipt } | Self::NegativeAcknowledge { receipt, .. } => {
                Some(receipt.as_str().to_string())
            }
        }
    }
}

/// Yields [`MessagingEffect::Publish`].
#[must_use]
pub fn publish(message: OutboundMessage) -> Program<MessageId> {
    Program::perform(MessagingEffect::Publish { message })
}

/// Yields [`MessagingEffect::Consume`].
#[must_use]
pub fn consume(queue: impl Into<String>) -> Program<Option<Delivery>> {
    Program::perform(MessagingEffect::Consume {
        queue: queue.into(),
    })
}

/// Yields [`MessagingEffect::Acknowledge`].
#[must_use]
pub fn acknowledge(receipt: ReceiptHandle) -> Program<()> {
    Program::perform(MessagingEffect::Acknowledge { receipt })
}

/// Yields [`MessagingEffect::NegativeAcknowledge`].
#[must_use]
pub fn negative_acknowledge(receipt: ReceiptHandle, requeue: bool) -> Program<()> {
    Program::perform(MessagingEffect::NegativeAcknowledge { receipt, requeue })
}
