//! Server-side routing: one inbound application message in, replies out.
//!
//! [`route`] is a pure function over the [`Directory`]. It never touches
//! the network; the server turns each returned [`Outbound`] into its own
//! reliable send so a slow peer never stalls the receive loop, and drops
//! the transport state of any endpoint named in [`Routed::release`].
//!
//! Every failure site maps to a [`Rejection`], and every rejection has one
//! fixed [`Policy`]:
//!
//! | Rejection             | Policy                                   |
//! |-----------------------|------------------------------------------|
//! | `ServerFull`          | reply `err_server_full`                  |
//! | `UsernameUnavailable` | reply `err_username_unavailable`         |
//! | `UnknownMessage`      | reply `err_unknown_message`, then evict  |
//! | `NotJoined`           | log only                                 |

use std::net::SocketAddr;

use tracing::{debug, info, warn};
use udpchat_protocol::{AppMessage, ForwardedMessage, MessageType, SendRequest};
use udpchat_session::{Directory, Joined, SessionError};

/// A message the server must send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Destination endpoint.
    pub to: SocketAddr,
    /// The application message to deliver.
    pub message: AppMessage,
}

impl Outbound {
    fn new(to: SocketAddr, message: AppMessage) -> Self {
        Self { to, message }
    }
}

/// Everything one inbound message asks the server to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routed {
    /// Messages to send.
    pub outbound: Vec<Outbound>,
    /// An endpoint that left cleanly. Its in-flight sends can be abandoned.
    pub release: Option<SocketAddr>,
}

impl From<Vec<Outbound>> for Routed {
    fn from(outbound: Vec<Outbound>) -> Self {
        Self {
            outbound,
            release: None,
        }
    }
}

/// Why an inbound message was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `join` while the directory is at capacity.
    ServerFull,
    /// `join` with a username held by another endpoint.
    UsernameUnavailable,
    /// Unrecognised type, or a known type with a malformed body.
    UnknownMessage,
    /// A request that needs a directory entry from an endpoint without one.
    NotJoined,
}

/// What the server does about a [`Rejection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// Send an error message back; the endpoint was never joined.
    Reply(MessageType),
    /// Send an error message back and remove the endpoint's entry.
    ReplyAndEvict(MessageType),
    /// Record it and move on.
    Log,
}

impl Rejection {
    /// The fixed handling for this rejection.
    pub fn policy(self) -> Policy {
        match self {
            Self::ServerFull => Policy::Reply(MessageType::ErrServerFull),
            Self::UsernameUnavailable => Policy::Reply(MessageType::ErrUsernameUnavailable),
            Self::UnknownMessage => Policy::ReplyAndEvict(MessageType::ErrUnknownMessage),
            Self::NotJoined => Policy::Log,
        }
    }
}

impl From<SessionError> for Rejection {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ServerFull { .. } => Self::ServerFull,
            SessionError::UsernameUnavailable(_) => Self::UsernameUnavailable,
        }
    }
}

/// Applies one message from `from` to the directory and returns what to send.
pub fn route(directory: &mut Directory, from: SocketAddr, message: AppMessage) -> Routed {
    let kind = message.kind.clone();
    match handle(directory, from, message) {
        Ok(routed) => routed,
        Err(rejection) => {
            debug!(%from, %kind, ?rejection, "message rejected");
            reject(directory, from, rejection).into()
        }
    }
}

/// Carries out the [`Policy`] of `rejection` for `from`.
///
/// An evicted endpoint is never released: its error reply is still owed.
pub fn reject(directory: &mut Directory, from: SocketAddr, rejection: Rejection) -> Vec<Outbound> {
    match rejection {
        Rejection::ServerFull => info!(%from, "disconnected: server full"),
        Rejection::UsernameUnavailable => info!(%from, "disconnected: username not available"),
        Rejection::UnknownMessage | Rejection::NotJoined => {}
    }

    match rejection.policy() {
        Policy::Reply(kind) => vec![Outbound::new(from, AppMessage::empty(kind))],
        Policy::ReplyAndEvict(kind) => {
            match directory.leave(&from) {
                Some(username) => info!(%from, "disconnected: {username} sent unknown command"),
                None => info!(%from, "disconnected: {from} sent unknown command"),
            }
            vec![Outbound::new(from, AppMessage::empty(kind))]
        }
        Policy::Log => {
            warn!(%from, "message from endpoint that never joined, ignoring");
            Vec::new()
        }
    }
}

fn handle(
    directory: &mut Directory,
    from: SocketAddr,
    message: AppMessage,
) -> Result<Routed, Rejection> {
    match message.kind {
        MessageType::Join => join(directory, from, &message.content).map(Routed::from),
        MessageType::RequestUsersList => users_list(directory, from).map(Routed::from),
        MessageType::SendMessage => {
            send_message(directory, from, &message.content).map(Routed::from)
        }
        MessageType::Disconnect => {
            let username = directory.leave(&from).ok_or(Rejection::NotJoined)?;
            info!(%from, "disconnected: {username}");
            Ok(Routed {
                outbound: Vec::new(),
                release: Some(from),
            })
        }
        _ => Err(Rejection::UnknownMessage),
    }
}

fn join(directory: &mut Directory, from: SocketAddr, content: &str) -> Result<Vec<Outbound>, Rejection> {
    let username = content
        .split_whitespace()
        .next()
        .ok_or(Rejection::UnknownMessage)?;

    match directory.join(from, username)? {
        Joined::New => info!(%from, "join: {username}"),
        Joined::Renamed { previous } => info!(%from, %previous, "join: {username}"),
        Joined::Unchanged => debug!(%from, username, "repeated join"),
    }
    Ok(Vec::new())
}

fn users_list(directory: &Directory, from: SocketAddr) -> Result<Vec<Outbound>, Rejection> {
    let username = directory.username(&from).ok_or(Rejection::NotJoined)?;
    info!(%from, "request_users_list: {username}");

    let listing = directory.usernames_sorted().join(" ");
    Ok(vec![Outbound::new(
        from,
        AppMessage::new(MessageType::ResponseUsersList, listing),
    )])
}

fn send_message(
    directory: &Directory,
    from: SocketAddr,
    content: &str,
) -> Result<Vec<Outbound>, Rejection> {
    let sender = directory.username(&from).ok_or(Rejection::NotJoined)?;
    info!(%from, "msg: {sender}");

    let request = SendRequest::parse(content).map_err(|e| {
        debug!(%from, error = %e, "malformed send_message");
        Rejection::UnknownMessage
    })?;

    let forwarded = ForwardedMessage {
        sender: sender.to_string(),
        body: request.body,
    }
    .to_content();

    let mut outbound = Vec::with_capacity(request.recipients.len());
    for recipient in &request.recipients {
        match directory.endpoint(recipient) {
            Some(to) => outbound.push(Outbound::new(
                to,
                AppMessage::new(MessageType::ForwardMessage, forwarded.clone()),
            )),
            None => warn!(%from, "msg: {sender} to non-existent user {recipient}"),
        }
    }
    Ok(outbound)
}
