//! Lifecycle notifications for the UI surface editing the note.

use crate::sync::models::PlainContent;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

/// Messages describing where a load or save is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum LifecycleMessage {
    /// Local state after a load. Both fields are `null` when no local
    /// record exists.
    KintoLoaded {
        data: Option<PlainContent>,
        last_modified: Option<i64>,
    },
    TextEditing,
    TextSaved,
    TextSynced { last_modified: Option<i64> },
}

/// A message addressed to a UI surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub recipient: String,
    pub message: LifecycleMessage,
}

/// Fire-and-forget notification channel.
pub trait MessagingSink: Send + Sync {
    fn send(&self, recipient: &str, message: LifecycleMessage);
}

/// Sink forwarding envelopes into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessagingSink for ChannelSink {
    fn send(&self, recipient: &str, message: LifecycleMessage) {
        let envelope = Envelope {
            recipient: recipient.to_string(),
            message,
        };
        if self.tx.send(envelope).is_err() {
            warn!(recipient, "Lifecycle message dropped: receiver closed");
        }
    }
}

/// Sink writing native-messaging frames: a 4-byte little-endian length
/// followed by the JSON envelope.
pub struct NativeMessagingSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> NativeMessagingSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_frame(&self, envelope: &Envelope) -> Result<(), String> {
        let json = serde_json::to_vec(envelope)
            .map_err(|e| format!("Failed to serialize message: {}", e))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| "Writer lock poisoned".to_string())?;

        let length = json.len() as u32;
        writer
            .write_all(&length.to_le_bytes())
            .map_err(|e| format!("Failed to write length: {}", e))?;
        writer
            .write_all(&json)
            .map_err(|e| format!("Failed to write message: {}", e))?;
        writer
            .flush()
            .map_err(|e| format!("Failed to flush: {}", e))?;

        Ok(())
    }
}

impl<W: Write + Send> MessagingSink for NativeMessagingSink<W> {
    fn send(&self, recipient: &str, message: LifecycleMessage) {
        let envelope = Envelope {
            recipient: recipient.to_string(),
            message,
        };
        if let Err(e) = self.write_frame(&envelope) {
            warn!(recipient, error = %e, "Lifecycle message dropped");
        }
    }
}

/// Read one frame written by [`NativeMessagingSink`].
pub fn read_frame(bytes: &[u8]) -> Option<(Envelope, &[u8])> {
    let length = u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?) as usize;
    let body = bytes.get(4..4 + length)?;
    let envelope = serde_json::from_slice(body).ok()?;
    Some((envelope, &bytes[4 + length..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_json_shapes() {
        assert_eq!(
            serde_json::to_value(LifecycleMessage::KintoLoaded {
                data: None,
                last_modified: None
            })
            .unwrap(),
            json!({ "action": "kinto-loaded", "data": null, "last_modified": null })
        );
        assert_eq!(
            serde_json::to_value(LifecycleMessage::TextEditing).unwrap(),
            json!({ "action": "text-editing" })
        );
        assert_eq!(
            serde_json::to_value(LifecycleMessage::TextSaved).unwrap(),
            json!({ "action": "text-saved" })
        );
        assert_eq!(
            serde_json::to_value(LifecycleMessage::TextSynced {
                last_modified: Some(12)
            })
            .unwrap(),
            json!({ "action": "text-synced", "last_modified": 12 })
        );
    }

    #[test]
    fn loaded_message_carries_content() {
        let message = LifecycleMessage::KintoLoaded {
            data: Some(PlainContent::text("def")),
            last_modified: Some(1),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["data"], json!({ "ops": [{ "insert": "def" }] }));
        assert_eq!(serde_json::from_value::<LifecycleMessage>(value).unwrap(), message);
    }

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.send("notes@mozilla.com", LifecycleMessage::TextEditing);
        sink.send("notes@mozilla.com", LifecycleMessage::TextSaved);

        assert_eq!(rx.recv().await.unwrap().message, LifecycleMessage::TextEditing);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.recipient, "notes@mozilla.com");
        assert_eq!(second.message, LifecycleMessage::TextSaved);
    }

    #[test]
    fn channel_sink_tolerates_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.send("ui", LifecycleMessage::TextSaved);
    }

    #[test]
    fn native_frames_are_length_prefixed() {
        let sink = NativeMessagingSink::new(Vec::new());
        sink.send("ui", LifecycleMessage::TextEditing);
        sink.send("ui", LifecycleMessage::TextSynced { last_modified: None });

        let bytes = sink.into_inner();
        let (first, rest) = read_frame(&bytes).unwrap();
        let (second, rest) = read_frame(rest).unwrap();

        assert_eq!(first.message, LifecycleMessage::TextEditing);
        assert_eq!(second.message, LifecycleMessage::TextSynced { last_modified: None });
        assert!(rest.is_empty());
    }
}
