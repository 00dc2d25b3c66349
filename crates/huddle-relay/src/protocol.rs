//! Classification of inbound hub frames.

use huddle_common::{Frame, FrameKind};

/// What the hub should do with one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum HubAction {
    Subscribe(String),
    Unsubscribe(String),
    /// Fan `text` out to every subscriber of `channel`.
    Broadcast { channel: String, text: String },
}

/// Parse a client frame. Malformed JSON and unknown `type`s are errors.
pub fn classify(text: &str) -> Result<HubAction, serde_json::Error> {
    let frame = Frame::from_text(text)?;
    Ok(match frame.kind {
        FrameKind::Subscribe => HubAction::Subscribe(frame.channel),
        FrameKind::Unsubscribe => HubAction::Unsubscribe(frame.channel),
        FrameKind::Message => {
            let text = frame.to_text()?;
            HubAction::Broadcast {
                channel: frame.channel,
                text,
            }
        }
    })
}
