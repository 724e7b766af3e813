//! Client connection to the session server

use log::{debug, info, warn};
use shared::{
    read_frame, write_frame, ClientEvent, ClientMessage, FrameError, PlayerId, ProfileView,
    Request, Response, ServerEvent, PROTOCOL_VERSION,
};
use std::collections::VecDeque;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub enum ClientError {
    Frame(FrameError),
    /// The server refused the handshake
    Rejected(String),
    /// The server closed the connection
    Closed,
    /// The server answered the handshake with something other than a welcome
    UnexpectedReply(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Frame(e) => write!(f, "{}", e),
            ClientError::Rejected(reason) => write!(f, "server rejected connection: {}", reason),
            ClientError::Closed => write!(f, "connection closed by server"),
            ClientError::UnexpectedReply(reply) => write!(f, "unexpected reply: {}", reply),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<FrameError> for ClientError {
    fn from(e: FrameError) -> Self {
        ClientError::Frame(e)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Frame(FrameError::Io(e))
    }
}

/// What the server told us when it accepted the connection
#[derive(Debug, Clone, PartialEq)]
pub struct Welcome {
    pub connection_id: PlayerId,
    pub profile: Option<ProfileView>,
    pub needs_display_name: bool,
}

/// Sends the hello frame and waits for the server's verdict.
pub async fn handshake<S>(stream: &mut S, token: Option<String>) -> Result<Welcome, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_frame(
        stream,
        &ClientMessage::Hello {
            client_version: PROTOCOL_VERSION,
            token,
        },
    )
    .await?;

    match read_frame::<_, ServerEvent>(stream).await? {
        Some(ServerEvent::Welcome {
            connection_id,
            profile,
            needs_display_name,
        }) => Ok(Welcome {
            connection_id,
            profile,
            needs_display_name,
        }),
        Some(ServerEvent::Rejected { reason }) => Err(ClientError::Rejected(reason)),
        Some(other) => Err(ClientError::UnexpectedReply(format!("{:?}", other))),
        None => Err(ClientError::Closed),
    }
}

/// An established session with the server
///
/// Incoming frames are read by a background task so [`Connection::recv`] can
/// sit in a `select!` without losing partial frames.
pub struct Connection {
    writer: OwnedWriteHalf,
    events: mpsc::UnboundedReceiver<ServerEvent>,
    /// Events that arrived while [`Connection::request`] waited for its reply
    backlog: VecDeque<ServerEvent>,
    reader_task: JoinHandle<()>,
    welcome: Welcome,
    next_request_id: u32,
}

impl Connection {
    pub async fn connect(addr: &str, token: Option<String>) -> Result<Self, ClientError> {
        let mut stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let welcome = handshake(&mut stream, token).await?;
        info!(
            "Connected to {} as connection {}{}",
            addr,
            welcome.connection_id,
            match &welcome.profile {
                Some(profile) => format!(" ({})", profile.display_name),
                None => String::new(),
            }
        );

        let (mut reader, writer) = stream.into_split();
        let (tx, events) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(async move {
            loop {
                match read_frame::<_, ServerEvent>(&mut reader).await {
                    Ok(Some(event)) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Server closed the connection");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read from server: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Connection {
            writer,
            events,
            backlog: VecDeque::new(),
            reader_task,
            welcome,
            next_request_id: 1,
        })
    }

    pub fn welcome(&self) -> &Welcome {
        &self.welcome
    }

    pub fn player_id(&self) -> PlayerId {
        self.welcome.connection_id
    }

    pub async fn send_event(&mut self, event: ClientEvent) -> Result<(), ClientError> {
        write_frame(&mut self.writer, &ClientMessage::Event(event)).await?;
        Ok(())
    }

    /// Sends a request without waiting. The reply arrives through
    /// [`Connection::recv`] as a `ServerEvent::Response` carrying the returned id.
    pub async fn send_request(&mut self, request: Request) -> Result<u32, ClientError> {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        write_frame(
            &mut self.writer,
            &ClientMessage::Request {
                request_id,
                request,
            },
        )
        .await?;
        Ok(request_id)
    }

    /// Sends a request and waits for its reply. Other events received in the
    /// meantime stay queued for [`Connection::recv`].
    pub async fn request(&mut self, request: Request) -> Result<Response, ClientError> {
        let id = self.send_request(request).await?;
        loop {
            match self.events.recv().await {
                Some(ServerEvent::Response {
                    request_id,
                    response,
                }) if request_id == id => return Ok(response),
                Some(other) => self.backlog.push_back(other),
                None => return Err(ClientError::Closed),
            }
        }
    }

    /// Next event from the server, or `None` once the connection is closed.
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        self.events.recv().await
    }

    /// Like [`Connection::recv`] but never waits.
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.backlog
            .pop_front()
            .or_else(|| self.events.try_recv().ok())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}
