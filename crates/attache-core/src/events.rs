//! Attachment change events and the event bus that broadcasts them.
//!
//! The collection manager emits one [`AttachmentEvent`] per state transition.
//! Presentation layers subscribe independently and re-read the snapshot they
//! need; events carry identifiers and small summaries, never payloads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{AttachmentId, ConverterType};

/// Versioned envelope around an [`AttachmentEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type (e.g., `"attachment.added"`).
    pub event_type: String,
    /// When the event occurred (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Payload schema version.
    pub payload_version: u32,
    pub payload: AttachmentEvent,
}

impl EventEnvelope {
    pub fn new(event: AttachmentEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.namespaced_event_type().to_string(),
            occurred_at: Utc::now(),
            payload_version: 1,
            payload: event,
        }
    }
}

/// State transitions of attachments in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum AttachmentEvent {
    /// An attachment was appended and its load started.
    Added {
        attachment_id: AttachmentId,
        label: String,
    },
    /// A load (or reload) started.
    InputLoading { attachment_id: AttachmentId },
    /// The source was decoded into an input.
    InputLoaded {
        attachment_id: AttachmentId,
        mime_type: String,
        data_size: usize,
    },
    /// The source could not be loaded.
    InputFailed {
        attachment_id: AttachmentId,
        error: String,
    },
    /// The converter list or selection was recomputed.
    ConvertersChanged {
        attachment_id: AttachmentId,
        converter_count: usize,
        converter_idx: Option<usize>,
    },
    /// A conversion run started.
    ConversionStarted {
        attachment_id: AttachmentId,
        converter: ConverterType,
    },
    /// A conversion run finished and its outputs were applied.
    OutputsReady {
        attachment_id: AttachmentId,
        converter: ConverterType,
        output_count: usize,
    },
    /// A conversion run failed; outputs are empty.
    ConversionFailed {
        attachment_id: AttachmentId,
        converter: ConverterType,
        error: String,
    },
    /// Outputs were cleared because no converter is selected.
    OutputsCleared { attachment_id: AttachmentId },
    /// The attachment changed position.
    Moved {
        attachment_id: AttachmentId,
        from: usize,
        to: usize,
    },
    Renamed {
        attachment_id: AttachmentId,
        label: String,
    },
    Removed { attachment_id: AttachmentId },
    /// Every attachment was removed.
    Cleared { count: usize },
}

impl AttachmentEvent {
    /// Dot-namespaced event type.
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            Self::Added { .. } => "attachment.added",
            Self::InputLoading { .. } => "attachment.input_loading",
            Self::InputLoaded { .. } => "attachment.input_loaded",
            Self::InputFailed { .. } => "attachment.input_failed",
            Self::ConvertersChanged { .. } => "attachment.converters_changed",
            Self::ConversionStarted { .. } => "attachment.conversion_started",
            Self::OutputsReady { .. } => "attachment.outputs_ready",
            Self::ConversionFailed { .. } => "attachment.conversion_failed",
            Self::OutputsCleared { .. } => "attachment.outputs_cleared",
            Self::Moved { .. } => "attachment.moved",
            Self::Renamed { .. } => "attachment.renamed",
            Self::Removed { .. } => "attachment.removed",
            Self::Cleared { .. } => "collection.cleared",
        }
    }

    /// Attachment this event relates to, if any.
    pub fn attachment_id(&self) -> Option<AttachmentId> {
        match self {
            Self::Added { attachment_id, .. }
            | Self::InputLoading { attachment_id }
            | Self::InputLoaded { attachment_id, .. }
            | Self::InputFailed { attachment_id, .. }
            | Self::ConvertersChanged { attachment_id, .. }
            | Self::ConversionStarted { attachment_id, .. }
            | Self::OutputsReady { attachment_id, .. }
            | Self::ConversionFailed { attachment_id, .. }
            | Self::OutputsCleared { attachment_id }
            | Self::Moved { attachment_id, .. }
            | Self::Renamed { attachment_id, .. }
            | Self::Removed { attachment_id } => Some(*attachment_id),
            Self::Cleared { .. } => None,
        }
    }
}

/// Broadcast bus for attachment events.
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: AttachmentEvent) {
        let envelope = EventEnvelope::new(event);
        tracing::trace!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to enveloped events. Each subscriber gets its own stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
