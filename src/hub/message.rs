use chrono::{DateTime, Utc};

/// A message received from the upstream broker.
///
/// Created once by the subscriber and shared read-only (`Arc<Message>`) with
/// every session it is fanned out to.
///
/// # Fields
///
/// - `topic` - The topic the broker delivered the message on.
/// - `payload` - The raw payload bytes, opaque to the bridge.
/// - `received_at` - When the subscriber received the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl Message {
    /// Stamps a new message with the current time.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }

    /// The payload as text; invalid UTF-8 sequences are replaced.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
