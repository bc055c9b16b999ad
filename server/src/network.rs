//! Server network layer handling WebSocket connections and game loop coordination

use crate::session::{Outgoing, Session, SessionError};
use crate::tick::{self, TickClock};
use crate::world::{ConnectionId, World};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{decode, encode, ClientMessage, GameConfig, ServerMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

/// Events sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ConnectionEvent {
    Opened {
        connection: ConnectionId,
        outbound: mpsc::UnboundedSender<Outbound>,
    },
    Received {
        connection: ConnectionId,
        message: ClientMessage,
    },
    Closed {
        connection: ConnectionId,
    },
}

/// Instructions sent from the main loop to one connection task
#[derive(Debug, Clone)]
pub enum Outbound {
    /// An encoded frame, shared between every recipient of a broadcast
    Frame(Arc<Vec<u8>>),
    Close,
}

struct Connection {
    session: Session,
    outbound: mpsc::UnboundedSender<Outbound>,
}

/// Main server owning the world and coordinating networking with the tick
pub struct Server {
    listener: Arc<TcpListener>,
    world: World,
    connections: HashMap<ConnectionId, Connection>,
    clock: TickClock,
    rng: StdRng,

    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    event_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl Server {
    pub async fn new(addr: &str, config: GameConfig) -> std::io::Result<Self> {
        let listener = Arc::new(TcpListener::bind(addr).await?);
        info!("Server listening on {}", listener.local_addr()?);

        let mut rng = StdRng::from_entropy();
        let clock = TickClock::new(config.tick_period, Instant::now());
        let world = World::new(config, &mut rng);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            world,
            connections: HashMap::new(),
            clock,
            rng,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns task that accepts TCP connections and hands each to its own task
    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let event_tx = self.event_tx.clone();
        let next_id = Arc::new(AtomicU64::new(0));

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let connection = next_id.fetch_add(1, Ordering::Relaxed);
                        tokio::spawn(handle_connection(
                            stream,
                            peer,
                            connection,
                            event_tx.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened {
                connection,
                outbound,
            } => {
                self.connections.insert(
                    connection,
                    Connection {
                        session: Session::new(connection),
                        outbound,
                    },
                );
            }
            ConnectionEvent::Received {
                connection,
                message,
            } => {
                let Some(entry) = self.connections.get_mut(&connection) else {
                    return;
                };
                match entry.session.handle(&mut self.world, message, &mut self.rng) {
                    Ok(outgoing) => self.dispatch(outgoing),
                    Err(e) => {
                        match &e {
                            SessionError::ProtocolViolation(_) => {
                                warn!("Closing connection {}: {}", connection, e)
                            }
                            SessionError::CapacityExceeded(_) => {
                                info!("Refusing connection {}: {}", connection, e)
                            }
                        }
                        self.close(connection);
                    }
                }
            }
            ConnectionEvent::Closed { connection } => {
                if let Some(mut entry) = self.connections.remove(&connection) {
                    let outgoing = entry.session.disconnect(&mut self.world);
                    self.dispatch(outgoing);
                }
            }
        }
    }

    /// Tells the connection task to close and tears the session down now
    fn close(&mut self, connection: ConnectionId) {
        if let Some(mut entry) = self.connections.remove(&connection) {
            let _ = entry.outbound.send(Outbound::Close);
            let outgoing = entry.session.disconnect(&mut self.world);
            self.dispatch(outgoing);
        }
    }

    fn dispatch(&self, outgoing: Vec<Outgoing>) {
        for item in outgoing {
            match item {
                Outgoing::Send { to, message } => {
                    if let Some(frame) = encode_frame(&message) {
                        self.send_frame(to, frame);
                    }
                }
                Outgoing::Broadcast { message, exclude } => {
                    self.broadcast(&message, exclude);
                }
            }
        }
    }

    fn broadcast(&self, message: &ServerMessage, exclude: Option<ConnectionId>) {
        let Some(frame) = encode_frame(message) else {
            return;
        };
        for connection in self.world.connections() {
            if Some(connection) != exclude {
                self.send_frame(connection, Arc::clone(&frame));
            }
        }
    }

    fn send_frame(&self, connection: ConnectionId, frame: Arc<Vec<u8>>) {
        if let Some(entry) = self.connections.get(&connection) {
            if entry.outbound.send(Outbound::Frame(frame)).is_err() {
                debug!("Connection {} already gone, dropping frame", connection);
            }
        }
    }

    fn run_tick(&mut self) {
        let dt = self.clock.fire(Instant::now());
        let snapshot = tick::advance(&mut self.world, dt);
        self.broadcast(&snapshot, None);

        // Periodic monitoring
        if self.clock.stats_due() {
            debug!(
                "Tick {}: {} players, {} connections, dt {:.1}",
                self.clock.ticks(),
                self.world.len(),
                self.connections.len(),
                dt
            );
        }
    }

    /// Main server loop multiplexing connection events with the tick
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.spawn_acceptor();

        let mut tick_interval = interval(self.clock.period());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.clock = TickClock::new(self.clock.period(), Instant::now());

        info!("Server started successfully");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.run_tick();
                },
            }
        }

        Ok(())
    }
}

fn encode_frame(message: &ServerMessage) -> Option<Arc<Vec<u8>>> {
    match encode(message) {
        Ok(bytes) => Some(Arc::new(bytes)),
        Err(e) => {
            error!("Failed to encode {:?}: {}", message, e);
            None
        }
    }
}

/// Runs one WebSocket connection until either side closes it
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    connection: ConnectionId,
    events: mpsc::UnboundedSender<ConnectionEvent>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    if events
        .send(ConnectionEvent::Opened {
            connection,
            outbound: outbound_tx,
        })
        .is_err()
    {
        return;
    }
    info!("Connection {} opened from {}", connection, peer);

    let (mut sink, mut source) = ws_stream.split();

    loop {
        tokio::select! {
            frame = source.next() => {
                match frame {
                    Some(Ok(Message::Binary(bytes))) => match decode::<ClientMessage>(&bytes) {
                        Ok(Some(message)) => {
                            if events.send(ConnectionEvent::Received { connection, message }).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            debug!("Ignoring message with unknown tag from connection {}", connection);
                        }
                        Err(e) => {
                            warn!("Closing connection {}: {}", connection, e);
                            break;
                        }
                    },
                    Some(Ok(Message::Text(_))) => {
                        warn!("Closing connection {}: unexpected text frame", connection);
                        break;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("Connection {} read error: {}", connection, e);
                        break;
                    }
                }
            },

            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(Outbound::Frame(bytes)) => {
                        if let Err(e) = sink.send(Message::Binary(bytes.to_vec())).await {
                            debug!("Connection {} write error: {}", connection, e);
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => break,
                }
            },
        }
    }

    let _ = sink.close().await;
    let _ = events.send(ConnectionEvent::Closed { connection });
    info!("Connection {} closed", connection);
}
