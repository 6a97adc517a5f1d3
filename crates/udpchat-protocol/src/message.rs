//! Application messages: the chat-level payload carried inside packets.
//!
//! On the wire an application message is a space-delimited string:
//!
//! ```text
//! <type> <declared_length> <content...>
//! ```
//!
//! Zero-content messages are just `"<type> 0"`. Decoding splits on any
//! whitespace and rejoins the content with single spaces, so runs of
//! whitespace inside the content collapse.

use std::fmt;

use crate::{ProtocolError, MAX_RECIPIENTS};

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// The `type` token of an application message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Client → Server: join the chat under the username in the content.
    Join,
    /// Client → Server: leave the chat.
    Disconnect,
    /// Client → Server: ask for every connected username.
    RequestUsersList,
    /// Server → Client: the sorted, space-joined username list.
    ResponseUsersList,
    /// Client → Server: `<count> <user>... <body>`.
    SendMessage,
    /// Server → Client: `<sender> <body>`.
    ForwardMessage,
    /// Client → Server: the console rejected a command's arguments.
    Err,
    /// Server → Client: the directory is at capacity.
    ErrServerFull,
    /// Server → Client: the username is taken.
    ErrUsernameUnavailable,
    /// Server → Client: the server did not understand the last message.
    ErrUnknownMessage,
    /// Body of ACK packets. Never delivered to the chat layer.
    Ack,
    /// Any other token. Kept verbatim so the router can reject it.
    Unknown(String),
}

impl MessageType {
    /// Returns the wire token for this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Join => "join",
            Self::Disconnect => "disconnect",
            Self::RequestUsersList => "request_users_list",
            Self::ResponseUsersList => "response_users_list",
            Self::SendMessage => "send_message",
            Self::ForwardMessage => "forward_message",
            Self::Err => "err",
            Self::ErrServerFull => "err_server_full",
            Self::ErrUsernameUnavailable => "err_username_unavailable",
            Self::ErrUnknownMessage => "err_unknown_message",
            Self::Ack => "ack",
            Self::Unknown(token) => token,
        }
    }

    /// `true` for the three server replies that end a client session.
    pub fn is_fatal_error(&self) -> bool {
        matches!(
            self,
            Self::ErrServerFull | Self::ErrUsernameUnavailable | Self::ErrUnknownMessage
        )
    }
}

impl From<&str> for MessageType {
    fn from(token: &str) -> Self {
        match token {
            "join" => Self::Join,
            "disconnect" => Self::Disconnect,
            "request_users_list" => Self::RequestUsersList,
            "response_users_list" => Self::ResponseUsersList,
            "send_message" => Self::SendMessage,
            "forward_message" => Self::ForwardMessage,
            "err" => Self::Err,
            "err_server_full" => Self::ErrServerFull,
            "err_username_unavailable" => Self::ErrUsernameUnavailable,
            "err_unknown_message" => Self::ErrUnknownMessage,
            "ack" => Self::Ack,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MessageFormat
// ---------------------------------------------------------------------------

/// The four message layouts of the chat protocol.
///
/// Only [`MessageFormat::Empty`] changes the encoding; the other three all
/// render as `"<type> <len> <content>"` and differ only in what the content
/// means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Format 1: the content is a username (`join`, `disconnect`).
    Identity,
    /// Format 2: no content, declared length 0.
    Empty,
    /// Format 3: the content is a username list.
    Listing,
    /// Format 4: the content is a chat payload (`send_message`, `forward_message`).
    Chat,
}

impl MessageFormat {
    /// The layout each message type is sent with.
    pub fn for_type(kind: &MessageType) -> Self {
        match kind {
            MessageType::Join | MessageType::Disconnect => Self::Identity,
            MessageType::ResponseUsersList => Self::Listing,
            MessageType::SendMessage
            | MessageType::ForwardMessage
            | MessageType::Unknown(_) => Self::Chat,
            MessageType::RequestUsersList
            | MessageType::Err
            | MessageType::ErrServerFull
            | MessageType::ErrUsernameUnavailable
            | MessageType::ErrUnknownMessage
            | MessageType::Ack => Self::Empty,
        }
    }
}

/// Encodes a message: `"<type> 0"` for [`MessageFormat::Empty`], otherwise
/// `"<type> <byte length of content> <content>"`.
pub fn encode_message(kind: &MessageType, format: MessageFormat, content: &str) -> String {
    match format {
        MessageFormat::Empty => format!("{kind} 0"),
        MessageFormat::Identity | MessageFormat::Listing | MessageFormat::Chat => {
            format!("{kind} {} {content}", content.len())
        }
    }
}

// ---------------------------------------------------------------------------
// AppMessage
// ---------------------------------------------------------------------------

/// A decoded application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMessage {
    /// The message type.
    pub kind: MessageType,
    /// The length field as sent. Used for framing only, never re-validated.
    pub declared_len: usize,
    /// Everything after the length field, single-space joined.
    pub content: String,
}

impl AppMessage {
    /// Builds a message whose declared length matches its content.
    pub fn new(kind: MessageType, content: impl Into<String>) -> Self {
        let content = content.into();
        let declared_len = match MessageFormat::for_type(&kind) {
            MessageFormat::Empty => 0,
            _ => content.len(),
        };
        Self {
            kind,
            declared_len,
            content,
        }
    }

    /// Builds a zero-content message.
    pub fn empty(kind: MessageType) -> Self {
        Self {
            kind,
            declared_len: 0,
            content: String::new(),
        }
    }

    /// Encodes with the layout that belongs to this message's type.
    pub fn encode(&self) -> String {
        encode_message(&self.kind, MessageFormat::for_type(&self.kind), &self.content)
    }

    /// Decodes a reassembled message.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] if the text has no type token or
    /// the length field is not a number.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut tokens = text.split_whitespace();
        let kind = tokens
            .next()
            .map(MessageType::from)
            .ok_or_else(|| ProtocolError::InvalidMessage("empty message".into()))?;
        let declared_len = match tokens.next() {
            Some(len) => len.parse::<usize>().map_err(|_| {
                ProtocolError::InvalidMessage(format!("bad length field {len:?}"))
            })?,
            None => 0,
        };
        let content = tokens.collect::<Vec<_>>().join(" ");

        Ok(Self {
            kind,
            declared_len,
            content,
        })
    }
}

// ---------------------------------------------------------------------------
// Structured contents
// ---------------------------------------------------------------------------

/// The content of a `send_message`: `<count> <user1> ... <userN> <body>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    /// Recipient usernames, in the order given.
    pub recipients: Vec<String>,
    /// The chat text. May be empty.
    pub body: String,
}

impl SendRequest {
    /// Parses a `send_message` content string.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] if the count is missing, is not in
    /// `1..=MAX_RECIPIENTS`, or fewer recipient tokens follow it.
    pub fn parse(content: &str) -> Result<Self, ProtocolError> {
        let tokens: Vec<&str> = content.split_whitespace().collect();
        let count = tokens
            .first()
            .and_then(|t| t.parse::<usize>().ok())
            .filter(|n| (1..=MAX_RECIPIENTS).contains(n))
            .ok_or_else(|| {
                ProtocolError::InvalidMessage(format!(
                    "recipient count must be 1..={MAX_RECIPIENTS}"
                ))
            })?;

        if tokens.len() < 1 + count {
            return Err(ProtocolError::InvalidMessage(format!(
                "expected {count} recipients, found {}",
                tokens.len() - 1
            )));
        }

        Ok(Self {
            recipients: tokens[1..=count].iter().map(|s| s.to_string()).collect(),
            body: tokens[1 + count..].join(" "),
        })
    }

    /// Renders back into `send_message` content.
    pub fn to_content(&self) -> String {
        let mut parts = vec![self.recipients.len().to_string()];
        parts.extend(self.recipients.iter().cloned());
        if !self.body.is_empty() {
            parts.push(self.body.clone());
        }
        parts.join(" ")
    }
}

/// The content of a `forward_message`: `<sender> <body>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedMessage {
    /// Username of the original sender.
    pub sender: String,
    /// The chat text.
    pub body: String,
}

impl ForwardedMessage {
    /// Parses a `forward_message` content string.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] if there is no sender token.
    pub fn parse(content: &str) -> Result<Self, ProtocolError> {
        let (sender, body) = match content.split_once(' ') {
            Some((sender, body)) => (sender, body),
            None => (content, ""),
        };
        if sender.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "forward_message without sender".into(),
            ));
        }
        Ok(Self {
            sender: sender.to_string(),
            body: body.to_string(),
        })
    }

    /// Renders into `forward_message` content.
    pub fn to_content(&self) -> String {
        if self.body.is_empty() {
            return self.sender.clone();
        }
        format!("{} {}", self.sender, self.body)
    }
}

// =========================================================================
// Tests
// =========================================================================
