//! Server network layer handling TCP connections and reactor coordination

use crate::config::ServerConfig;
use crate::connection_manager::Outbound;
use crate::identity::{Identity, IdentityResolver};
use crate::profile::ProfileStore;
use crate::season::SeasonKeeper;
use crate::session::{ReactorEvent, SessionCoordinator};
use chrono::Utc;
use log::{debug, error, info, warn};
use shared::{read_frame, write_frame, ClientMessage, PlayerId, ServerEvent, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};

/// How long a released connection may spend flushing its queue.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Stops a running [`Server`] from another task.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    reactor_tx: mpsc::UnboundedSender<ReactorEvent>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.reactor_tx.send(ReactorEvent::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

/// Main server accepting connections and feeding the session reactor
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    store: Arc<dyn ProfileStore>,
    seasons: Arc<SeasonKeeper>,

    // Reactor queue
    reactor_tx: mpsc::UnboundedSender<ReactorEvent>,
    reactor_rx: mpsc::UnboundedReceiver<ReactorEvent>,
}

impl Server {
    pub async fn bind(
        config: ServerConfig,
        store: Arc<dyn ProfileStore>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(config.bind_addr()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let seasons = Arc::new(SeasonKeeper::new(
            Arc::clone(&store),
            config.leaderboard_size,
        ));
        let (reactor_tx, reactor_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            config,
            store,
            seasons,
            reactor_tx,
            reactor_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            reactor_tx: self.reactor_tx.clone(),
        }
    }

    /// Spawns task that periodically recomputes the season leaderboard
    fn spawn_leaderboard_refresher(&self) -> JoinHandle<()> {
        let seasons = Arc::clone(&self.seasons);
        let period = self.config.leaderboard_refresh;

        tokio::spawn(async move {
            let mut ticker = interval(period);

            loop {
                ticker.tick().await;

                let seasons = Arc::clone(&seasons);
                match tokio::task::spawn_blocking(move || seasons.refresh(Utc::now().date_naive()))
                    .await
                {
                    Ok(Ok(record)) => debug!(
                        "Leaderboard for season {} refreshed, {} entries",
                        record.id,
                        record.leaderboard.len()
                    ),
                    Ok(Err(e)) => error!("Leaderboard refresh failed: {}", e),
                    Err(e) => error!("Leaderboard refresh task failed: {}", e),
                }
            }
        })
    }

    /// Main server loop: accepts sockets until the reactor shuts down
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        let reactor_rx = std::mem::replace(&mut self.reactor_rx, mpsc::unbounded_channel().1);
        let session = SessionCoordinator::new(
            &self.config,
            Arc::clone(&self.store),
            Arc::clone(&self.seasons),
            self.reactor_tx.clone(),
        );
        let mut reactor = tokio::spawn(session.run(reactor_rx));
        let refresher = self.spawn_leaderboard_refresher();
        let resolver = IdentityResolver::new(Arc::clone(&self.store));
        let mut next_connection_id: PlayerId = 1;

        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let conn = next_connection_id;
                            next_connection_id += 1;
                            debug!("Accepted {} as connection {}", addr, conn);
                            tokio::spawn(serve_connection(
                                stream,
                                addr,
                                conn,
                                resolver.clone(),
                                self.reactor_tx.clone(),
                                self.config.handshake_timeout,
                                self.config.outbound_queue,
                            ));
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                },

                result = &mut reactor => {
                    if let Err(e) = result {
                        error!("Session reactor task failed: {}", e);
                    }
                    break;
                },
            }
        }

        refresher.abort();
        info!("Server stopped");
        Ok(())
    }
}

/// Drives one socket: handshake, then frames into the reactor until EOF
async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    conn: PlayerId,
    resolver: IdentityResolver,
    reactor_tx: mpsc::UnboundedSender<ReactorEvent>,
    handshake_timeout: Duration,
    outbound_queue: usize,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle for {}: {}", addr, e);
    }
    let (mut reader, mut writer) = stream.into_split();

    let (client_version, token) =
        match timeout(handshake_timeout, read_frame::<_, ClientMessage>(&mut reader)).await {
            Ok(Ok(Some(ClientMessage::Hello {
                client_version,
                token,
            }))) => (client_version, token),
            Ok(Ok(Some(other))) => {
                warn!("Expected hello from {}, got {:?}", addr, other);
                return;
            }
            Ok(Ok(None)) => {
                debug!("{} closed before handshake", addr);
                return;
            }
            Ok(Err(e)) => {
                warn!("Bad handshake frame from {}: {}", addr, e);
                return;
            }
            Err(_) => {
                warn!("Handshake from {} timed out", addr);
                return;
            }
        };

    info!(
        "Client connecting from {} (version: {})",
        addr, client_version
    );
    if client_version != PROTOCOL_VERSION {
        let rejected = ServerEvent::Rejected {
            reason: format!(
                "Unsupported client version {}, server speaks {}",
                client_version, PROTOCOL_VERSION
            ),
        };
        if let Err(e) = write_frame(&mut writer, &rejected).await {
            debug!("Failed to reject {}: {}", addr, e);
        }
        return;
    }

    let identity = match tokio::task::spawn_blocking(move || resolver.resolve(token.as_deref())).await {
        Ok(identity) => identity,
        Err(e) => {
            error!("Identity resolution for {} failed: {}", addr, e);
            Identity::guest()
        }
    };

    let (outbound, queue, mut hung_up) = Outbound::channel(outbound_queue);
    let mut writer_task = tokio::spawn(write_loop(writer, queue, conn));
    if reactor_tx
        .send(ReactorEvent::Connected {
            conn,
            outbound,
            identity,
        })
        .is_err()
    {
        return;
    }

    tokio::select! {
        _ = read_loop(&mut reader, conn, &reactor_tx) => {
            if reactor_tx.send(ReactorEvent::Disconnected { conn }).is_err() {
                debug!("Reactor gone before connection {} closed", conn);
            }
        }
        _ = &mut hung_up => {
            // Dropped by the reactor; flush what is queued, then close.
            debug!("Connection {} released by the reactor", conn);
            if timeout(DRAIN_TIMEOUT, &mut writer_task).await.is_err() {
                warn!("Connection {} did not drain in time", conn);
                writer_task.abort();
            }
        }
    }
}

/// Forwards frames to the reactor in arrival order
async fn read_loop(
    reader: &mut OwnedReadHalf,
    conn: PlayerId,
    reactor_tx: &mpsc::UnboundedSender<ReactorEvent>,
) {
    loop {
        let event = match read_frame::<_, ClientMessage>(reader).await {
            Ok(Some(ClientMessage::Event(event))) => ReactorEvent::Event { conn, event },
            Ok(Some(ClientMessage::Request {
                request_id,
                request,
            })) => ReactorEvent::Request {
                conn,
                request_id,
                request,
            },
            Ok(Some(ClientMessage::Hello { .. })) => {
                warn!("Ignoring repeated hello from connection {}", conn);
                continue;
            }
            Ok(None) => {
                debug!("Connection {} closed by peer", conn);
                return;
            }
            Err(e) => {
                warn!("Closing connection {} after bad frame: {}", conn, e);
                return;
            }
        };

        if reactor_tx.send(event).is_err() {
            return;
        }
    }
}

/// Writes queued events until the reactor drops the queue
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<ServerEvent>,
    conn: PlayerId,
) {
    while let Some(event) = outbound.recv().await {
        let last = matches!(event, ServerEvent::Rejected { .. });
        if let Err(e) = write_frame(&mut writer, &event).await {
            debug!("Failed to write to connection {}: {}", conn, e);
            break;
        }
        if last {
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Failed to shut down connection {}: {}", conn, e);
    }
}
