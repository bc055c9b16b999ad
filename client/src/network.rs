//! Client network layer: a WebSocket connection on its own thread

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode, encode, ClientMessage, ServerMessage};
use std::sync::mpsc as std_mpsc;
use std::thread;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Events delivered from the network thread to the frame loop
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    Connected,
    Message(ServerMessage),
    Disconnected(String),
}

/// Frame-loop side of the connection
pub struct NetworkHandle {
    events: std_mpsc::Receiver<NetworkEvent>,
    outgoing: mpsc::UnboundedSender<ClientMessage>,
}

impl NetworkHandle {
    /// Queues a message for the server. Returns false once the connection is gone.
    pub fn send(&self, message: ClientMessage) -> bool {
        self.outgoing.send(message).is_ok()
    }

    /// Everything received since the last call, without blocking.
    pub fn drain(&self) -> Vec<NetworkEvent> {
        self.events.try_iter().collect()
    }

    /// Blocks until the next event or until the network thread exits.
    pub fn recv(&self) -> Option<NetworkEvent> {
        self.events.recv().ok()
    }
}

/// Accepts `host:port` or a full `ws://` URL.
pub fn server_url(server: &str) -> String {
    if server.starts_with("ws://") || server.starts_with("wss://") {
        server.to_string()
    } else {
        format!("ws://{}", server)
    }
}

/// Starts the network thread and returns the handle used by the frame loop.
pub fn connect(server: &str) -> std::io::Result<NetworkHandle> {
    let url = server_url(server);
    let (event_tx, event_rx) = std_mpsc::channel();
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

    thread::Builder::new()
        .name("network".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start network runtime: {}", e);
                    let _ = event_tx.send(NetworkEvent::Disconnected(e.to_string()));
                    return;
                }
            };

            let reason = match runtime.block_on(run_connection(&url, &event_tx, outgoing_rx)) {
                Ok(()) => "connection closed".to_string(),
                Err(e) => {
                    warn!("Connection to {} ended: {}", url, e);
                    e.to_string()
                }
            };
            let _ = event_tx.send(NetworkEvent::Disconnected(reason));
        })?;

    Ok(NetworkHandle {
        events: event_rx,
        outgoing: outgoing_tx,
    })
}

async fn run_connection(
    url: &str,
    events: &std_mpsc::Sender<NetworkEvent>,
    mut outgoing: mpsc::UnboundedReceiver<ClientMessage>,
) -> Result<(), BoxError> {
    info!("Connecting to {}", url);
    let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
    info!("Connected to {}", url);
    events.send(NetworkEvent::Connected)?;

    let (mut sink, mut source) = ws_stream.split();

    loop {
        tokio::select! {
            frame = source.next() => {
                match frame {
                    Some(Ok(Message::Binary(bytes))) => match decode::<ServerMessage>(&bytes)? {
                        Some(message) => events.send(NetworkEvent::Message(message))?,
                        None => debug!("Ignoring message with unknown tag"),
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            },

            message = outgoing.recv() => {
                match message {
                    Some(message) => sink.send(Message::Binary(encode(&message)?)).await?,
                    None => {
                        let _ = sink.close().await;
                        return Ok(());
                    }
                }
            },
        }
    }
}
