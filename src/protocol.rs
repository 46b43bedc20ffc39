use serde_json::Value;

use crate::types::Direction;

#[derive(Debug, PartialEq, Eq)]
pub enum ParsedClientMessage {
    Join { avatar: Option<String> },
    Move { dir: Direction },
}

/// Parses one inbound frame. Anything malformed or unknown collapses to
/// `None` and is dropped by the caller; the core never sees invalid input.
pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "join" => {
            // A non-string avatar counts as absent; the session falls back
            // to a random palette pick either way.
            let avatar = object
                .get("avatar")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(ParsedClientMessage::Join { avatar })
        }
        "move" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            Some(ParsedClientMessage::Move { dir })
        }
        _ => None,
    }
}
