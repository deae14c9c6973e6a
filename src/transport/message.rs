use serde::{Deserialize, Serialize};
use tungstenite::protocol::Message as WsMessage;

use crate::hub::message::Message;

/// The JSON envelope pushed to every downstream client.
///
/// `message` carries the upstream payload as a string; its schema belongs
/// to the publishers and the panels rendering it.
///
/// ```json
/// {"topic":"Camera_status","message":"[{\"ip\":\"10.0.0.5\",\"isAlive\":true}]"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub topic: String,
    pub message: String,
}

impl ServerMessage {
    pub fn to_frame(&self) -> serde_json::Result<WsMessage> {
        serde_json::to_string(self).map(WsMessage::text)
    }
}

impl From<&Message> for ServerMessage {
    fn from(message: &Message) -> Self {
        Self {
            topic: message.topic.clone(),
            message: message.payload_text(),
        }
    }
}
