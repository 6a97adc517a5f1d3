//! The chat client: console commands out, server messages in.
//!
//! [`parse_input`] turns a console line into a [`Command`], and
//! [`dispatch`] turns a message from the server into a [`ClientAction`].
//! [`ChatClient::run`] drives both over any line reader and writer, so the
//! binary wires it to stdin/stdout and tests wire it to in-memory pipes.

use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};
use udpchat_protocol::{AppMessage, ForwardedMessage, MessageType};
use udpchat_transport::{ReliableEndpoint, TransportConfig};

use crate::ChatError;

/// Usage lines printed by `help`.
pub const HELP: &[&str] = &[
    "Input for sending message (... to represent possibility for multiple users): msg <num of users to be messaged> <user1> <user2> ... <message>",
    "Input for accesing client list: list",
    "Input for viewing all user-inputs and their format input: help",
    "Input for disconnecting from server: quit",
];

/// One console line, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `list`
    List,
    /// `msg <rest>`: `rest` becomes the `send_message` content verbatim.
    Message(String),
    /// `quit`
    Quit,
    /// `help`
    Help,
    /// `list`, `quit`, or `help` followed by extra words. Reported to the
    /// server as `err`.
    ExtraArguments,
    /// Anything else.
    Unrecognized,
    /// Only whitespace.
    Blank,
}

/// Interprets one line of console input.
pub fn parse_input(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Command::Blank;
    };
    let has_more = words.next().is_some();

    match (first, has_more) {
        ("msg", _) => {
            let rest = line.trim_start()[first.len()..].trim();
            Command::Message(rest.to_string())
        }
        ("list" | "quit" | "help", true) => Command::ExtraArguments,
        ("list", false) => Command::List,
        ("quit", false) => Command::Quit,
        ("help", false) => Command::Help,
        _ => Command::Unrecognized,
    }
}

/// What the client does with a message from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Print the line and keep going.
    Print(String),
    /// Print the line, then shut down.
    Disconnect(String),
    /// Nothing to show.
    Ignore,
}

/// Maps a server message to console output.
pub fn dispatch(message: &AppMessage) -> ClientAction {
    match &message.kind {
        MessageType::ResponseUsersList => ClientAction::Print(format!("list: {}", message.content)),
        MessageType::ForwardMessage => match ForwardedMessage::parse(&message.content) {
            Ok(fwd) => ClientAction::Print(format!("msg: {}: {}", fwd.sender, fwd.body)),
            Err(e) => {
                warn!(error = %e, "bad forward_message");
                ClientAction::Ignore
            }
        },
        MessageType::ErrServerFull => {
            ClientAction::Disconnect("disconnected: server full".to_string())
        }
        MessageType::ErrUsernameUnavailable => {
            ClientAction::Disconnect("disconnected: username not available".to_string())
        }
        MessageType::ErrUnknownMessage => {
            ClientAction::Disconnect("disconnected: server received an unknown command".to_string())
        }
        other => {
            debug!(kind = %other, "unexpected message from server");
            ClientAction::Ignore
        }
    }
}

/// Whether the run loop keeps going.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// A joined chat client.
pub struct ChatClient {
    endpoint: ReliableEndpoint,
    server: SocketAddr,
    username: String,
}

impl ChatClient {
    /// Binds an ephemeral socket and joins `server` as `username`.
    ///
    /// Returns once the server has acknowledged the `join`. Whether the
    /// join was accepted arrives later as a message, handled by
    /// [`run`](Self::run).
    pub async fn connect(
        server: SocketAddr,
        username: &str,
        config: TransportConfig,
    ) -> Result<Self, ChatError> {
        let local = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let endpoint = ReliableEndpoint::bind(local, config).await?;

        let join = AppMessage::new(MessageType::Join, username);
        endpoint.handle().send(server, join.encode()).await?;
        debug!(%server, username, "join sent");

        Ok(Self {
            endpoint,
            server,
            username: username.to_string(),
        })
    }

    /// The local address of the client's socket.
    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// Reads commands from `input` and writes output lines to `output`
    /// until the user quits, the input ends, or the server disconnects us.
    pub async fn run<R, W>(mut self, input: R, mut output: W) -> Result<(), ChatError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        loop {
            let flow = tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => self.on_command(parse_input(&line), &mut output).await?,
                    None => self.on_command(Command::Quit, &mut output).await?,
                },
                delivery = self.endpoint.recv() => match delivery {
                    Some(delivery) if delivery.from == self.server => {
                        self.on_server_message(&delivery.payload, &mut output).await?
                    }
                    Some(delivery) => {
                        trace!(from = %delivery.from, "message from non-server peer, ignoring");
                        Flow::Continue
                    }
                    None => Flow::Stop,
                },
            };
            if flow == Flow::Stop {
                break;
            }
        }

        self.endpoint.shutdown();
        Ok(())
    }

    async fn on_command<W>(&self, command: Command, output: &mut W) -> Result<Flow, ChatError>
    where
        W: AsyncWrite + Unpin,
    {
        let message = match command {
            Command::List => AppMessage::empty(MessageType::RequestUsersList),
            Command::Message(content) => AppMessage::new(MessageType::SendMessage, content),
            Command::ExtraArguments => AppMessage::empty(MessageType::Err),
            Command::Help => {
                for line in HELP {
                    write_line(output, line).await?;
                }
                return Ok(Flow::Continue);
            }
            Command::Unrecognized => {
                write_line(output, "incorrect userinput format").await?;
                return Ok(Flow::Continue);
            }
            Command::Blank => return Ok(Flow::Continue),
            Command::Quit => {
                write_line(output, "quitting").await?;
                let goodbye = AppMessage::new(MessageType::Disconnect, self.username.as_str());
                self.send(goodbye).await;
                return Ok(Flow::Stop);
            }
        };

        self.send(message).await;
        Ok(Flow::Continue)
    }

    async fn on_server_message<W>(&self, payload: &str, output: &mut W) -> Result<Flow, ChatError>
    where
        W: AsyncWrite + Unpin,
    {
        let message = match AppMessage::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "undecodable message from server");
                return Ok(Flow::Continue);
            }
        };

        match dispatch(&message) {
            ClientAction::Print(line) => {
                write_line(output, &line).await?;
                Ok(Flow::Continue)
            }
            ClientAction::Disconnect(line) => {
                write_line(output, &line).await?;
                Ok(Flow::Stop)
            }
            ClientAction::Ignore => Ok(Flow::Continue),
        }
    }

    /// Sends to the server, logging failures. The console keeps running
    /// even if one message could not be delivered.
    async fn send(&self, message: AppMessage) {
        if let Err(e) = self.endpoint.handle().send(self.server, message.encode()).await {
            warn!(kind = %message.kind, error = %e, "send to server failed");
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> std::io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // parse_input()
    // =====================================================================

    #[test]
    fn test_parse_input_simple_commands() {
        assert_eq!(parse_input("list"), Command::List);
        assert_eq!(parse_input("  quit  "), Command::Quit);
        assert_eq!(parse_input("help"), Command::Help);
    }

    #[test]
    fn test_parse_input_extra_words_send_err() {
        assert_eq!(parse_input("list all"), Command::ExtraArguments);
        assert_eq!(parse_input("quit now"), Command::ExtraArguments);
        assert_eq!(parse_input("help me"), Command::ExtraArguments);
    }

    #[test]
    fn test_parse_input_msg_keeps_rest_verbatim() {
        assert_eq!(
            parse_input("msg 2 bob carol hello  world"),
            Command::Message("2 bob carol hello  world".to_string())
        );
    }

    #[test]
    fn test_parse_input_bare_msg_is_empty_message() {
        assert_eq!(parse_input("msg"), Command::Message(String::new()));
    }

    #[test]
    fn test_parse_input_unknown_and_blank() {
        assert_eq!(parse_input("dance"), Command::Unrecognized);
        assert_eq!(parse_input("msgbob hi"), Command::Unrecognized);
        assert_eq!(parse_input("   "), Command::Blank);
    }

    // =====================================================================
    // dispatch()
    // =====================================================================

    fn decode(text: &str) -> AppMessage {
        AppMessage::decode(text).unwrap()
    }

    #[test]
    fn test_dispatch_users_list_prints() {
        assert_eq!(
            dispatch(&decode("response_users_list 9 alice bob")),
            ClientAction::Print("list: alice bob".to_string())
        );
    }

    #[test]
    fn test_dispatch_forward_prints_sender_and_body() {
        assert_eq!(
            dispatch(&decode("forward_message 8 alice hi")),
            ClientAction::Print("msg: alice: hi".to_string())
        );
    }

    #[test]
    fn test_dispatch_errors_disconnect() {
        assert_eq!(
            dispatch(&decode("err_server_full 0")),
            ClientAction::Disconnect("disconnected: server full".to_string())
        );
        assert_eq!(
            dispatch(&decode("err_username_unavailable 0")),
            ClientAction::Disconnect("disconnected: username not available".to_string())
        );
        assert_eq!(
            dispatch(&decode("err_unknown_message 0")),
            ClientAction::Disconnect(
                "disconnected: server received an unknown command".to_string()
            )
        );
    }

    #[test]
    fn test_dispatch_other_types_ignored() {
        assert_eq!(dispatch(&decode("join 5 alice")), ClientAction::Ignore);
    }
}
