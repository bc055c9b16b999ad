//! Integration tests for the arena server and client
//!
//! These tests run a real server on an ephemeral port and drive it over
//! WebSocket connections.

use futures_util::{SinkExt, StreamExt};
use server::network::Server;
use shared::{decode, encode, ClientMessage, GameConfig, PlayerId, ServerMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const XP_BLOBS: usize = 3;
const WAIT: Duration = Duration::from_secs(3);

fn test_config() -> GameConfig {
    GameConfig {
        tick_period: Duration::from_millis(20),
        xp_blob_count: XP_BLOBS,
        ..GameConfig::default()
    }
}

async fn start_server(config: GameConfig) -> SocketAddr {
    let mut server = Server::new("127.0.0.1:0", config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn connect(addr: SocketAddr) -> Ws {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
        .await
        .unwrap();
    ws
}

async fn send(ws: &mut Ws, message: ClientMessage) {
    ws.send(Message::Binary(encode(&message).unwrap()))
        .await
        .unwrap();
}

async fn spawn(ws: &mut Ws, name: &str) {
    send(
        ws,
        ClientMessage::Spawn {
            name: name.to_string(),
        },
    )
    .await;
}

/// Next server message, or None if the connection closed or went quiet.
async fn recv(ws: &mut Ws, wait: Duration) -> Option<ServerMessage> {
    let deadline = Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, ws.next()).await {
            Ok(Some(Ok(Message::Binary(bytes)))) => {
                if let Some(message) = decode::<ServerMessage>(&bytes).unwrap() {
                    return Some(message);
                }
            }
            Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_))) | Ok(None) | Err(_) => {
                return None
            }
            Ok(Some(Ok(_))) => {}
        }
    }
}

async fn recv_until<F>(ws: &mut Ws, mut predicate: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    let deadline = Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match recv(ws, remaining).await {
            Some(message) if predicate(&message) => return message,
            Some(_) => {}
            None => panic!("Expected message never arrived"),
        }
    }
}

/// Waits for our own addPlayer and returns the assigned id.
async fn own_player_id(ws: &mut Ws) -> PlayerId {
    match recv_until(ws, |m| matches!(m, ServerMessage::AddPlayer { is_mine: true, .. })).await {
        ServerMessage::AddPlayer { player, .. } => player.id,
        _ => unreachable!(),
    }
}

fn updated_ids(message: &ServerMessage) -> Option<Vec<PlayerId>> {
    match message {
        ServerMessage::UpdatePlayers(updates) => Some(updates.iter().map(|u| u.id).collect()),
        _ => None,
    }
}

/// Waits until the server has dropped the connection.
async fn expect_closed(ws: &mut Ws) {
    let deadline = Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, ws.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_))) | Ok(None) => return,
            Ok(Some(Ok(_))) => {}
            Err(_) => panic!("Connection was not closed"),
        }
    }
}

/// SESSION LIFECYCLE TESTS
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn spawn_announces_own_player_first() {
        let addr = start_server(test_config()).await;
        let mut alice = connect(addr).await;

        spawn(&mut alice, "Alice").await;

        match recv(&mut alice, WAIT).await {
            Some(ServerMessage::AddPlayer { player, is_mine }) => {
                assert!(is_mine);
                assert_eq!(player.id, 0);
                assert_eq!(player.name, "Alice");
                assert_eq!(player.blobs.len(), 1);
                let blob = &player.blobs[0];
                assert_eq!((blob.x, blob.y), (player.x, player.y));
                assert!(blob.scale >= 35.0 && blob.scale < 35.0 + 10f32.sqrt() * 2.0);
            }
            other => panic!("Unexpected first message: {:?}", other),
        }

        for _ in 0..XP_BLOBS {
            match recv(&mut alice, WAIT).await {
                Some(ServerMessage::AddBlob(blob)) => assert_eq!(blob.scale, 5.0),
                other => panic!("Expected addBlob, got {:?}", other),
            }
        }

        let update = recv_until(&mut alice, |m| updated_ids(m).is_some()).await;
        assert_eq!(updated_ids(&update), Some(vec![0]));
    }

    #[tokio::test]
    async fn two_players_see_each_other() {
        let addr = start_server(test_config()).await;
        let mut alice = connect(addr).await;
        let mut bob = connect(addr).await;

        spawn(&mut alice, "Alice").await;
        let alice_id = own_player_id(&mut alice).await;

        spawn(&mut bob, "Bob").await;
        let bob_id = own_player_id(&mut bob).await;
        assert_ne!(alice_id, bob_id);

        let seen_by_bob = recv_until(&mut bob, |m| {
            matches!(m, ServerMessage::AddPlayer { is_mine: false, .. })
        })
        .await;
        match seen_by_bob {
            ServerMessage::AddPlayer { player, .. } => {
                assert_eq!(player.id, alice_id);
                assert_eq!(player.name, "Alice");
            }
            _ => unreachable!(),
        }

        let seen_by_alice = recv_until(&mut alice, |m| {
            matches!(m, ServerMessage::AddPlayer { is_mine: false, .. })
        })
        .await;
        match seen_by_alice {
            ServerMessage::AddPlayer { player, .. } => {
                assert_eq!(player.id, bob_id);
                assert_eq!(player.name, "Bob");
            }
            _ => unreachable!(),
        }

        let update = recv_until(&mut alice, |m| {
            updated_ids(m).map_or(false, |ids| ids.len() == 2)
        })
        .await;
        assert_eq!(updated_ids(&update), Some(vec![alice_id, bob_id]));
    }

    #[tokio::test]
    async fn move_before_spawn_is_ignored() {
        let addr = start_server(test_config()).await;
        let mut idle = connect(addr).await;

        send(
            &mut idle,
            ClientMessage::Move {
                direction: Some(1.0),
                magnitude: 1.0,
            },
        )
        .await;

        // nothing is broadcast to a connection that has not spawned
        assert!(recv(&mut idle, Duration::from_millis(200)).await.is_none());

        spawn(&mut idle, "Late").await;
        assert_eq!(own_player_id(&mut idle).await, 0);
    }

    #[tokio::test]
    async fn movement_is_simulated() {
        let addr = start_server(test_config()).await;
        let mut alice = connect(addr).await;
        spawn(&mut alice, "Alice").await;

        let start = match recv_until(&mut alice, |m| {
            matches!(m, ServerMessage::AddPlayer { is_mine: true, .. })
        })
        .await
        {
            ServerMessage::AddPlayer { player, .. } => (player.x, player.y),
            _ => unreachable!(),
        };

        // head for the middle of the map so the walls never get in the way
        let centre = shared::config::MAP_SIZE / 2.0;
        let direction = (centre - start.1).atan2(centre - start.0);
        send(
            &mut alice,
            ClientMessage::Move {
                direction: Some(direction),
                magnitude: 1.0,
            },
        )
        .await;

        let progress = |x: f32, y: f32| {
            (x - start.0) * direction.cos() + (y - start.1) * direction.sin()
        };
        let update = recv_until(&mut alice, |m| match m {
            ServerMessage::UpdatePlayers(updates) => {
                updates.first().map_or(false, |u| progress(u.x, u.y) > 1.0)
            }
            _ => false,
        })
        .await;

        match update {
            ServerMessage::UpdatePlayers(updates) => {
                let player = &updates[0];
                assert!((0.0..=shared::config::MAP_SIZE).contains(&player.x));
                assert!((0.0..=shared::config::MAP_SIZE).contains(&player.y));
                assert_eq!((player.blobs[0].x, player.blobs[0].y), (player.x, player.y));
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn disconnect_removes_player_once() {
        let addr = start_server(test_config()).await;
        let mut alice = connect(addr).await;
        let mut bob = connect(addr).await;

        spawn(&mut alice, "Alice").await;
        let alice_id = own_player_id(&mut alice).await;
        spawn(&mut bob, "Bob").await;
        let bob_id = own_player_id(&mut bob).await;

        bob.close(None).await.unwrap();

        let removed = recv_until(&mut alice, |m| matches!(m, ServerMessage::RemovePlayer { .. })).await;
        assert_eq!(removed, ServerMessage::RemovePlayer { id: bob_id });

        // later snapshots only carry alice, and no second removal arrives
        let deadline = Instant::now() + Duration::from_millis(300);
        while Instant::now() < deadline {
            match recv(&mut alice, Duration::from_millis(300)).await {
                Some(ServerMessage::RemovePlayer { id }) => panic!("Duplicate removal of {}", id),
                Some(message) => {
                    if let Some(ids) = updated_ids(&message) {
                        assert_eq!(ids, vec![alice_id]);
                    }
                }
                None => break,
            }
        }

        // the freed id goes to the next player
        let mut carol = connect(addr).await;
        spawn(&mut carol, "Carol").await;
        assert_eq!(own_player_id(&mut carol).await, bob_id);
    }

    #[tokio::test]
    async fn server_full_refuses_spawn() {
        let config = GameConfig {
            id_pool_capacity: 1,
            ..test_config()
        };
        let addr = start_server(config).await;
        let mut alice = connect(addr).await;
        let mut bob = connect(addr).await;

        spawn(&mut alice, "Alice").await;
        own_player_id(&mut alice).await;

        spawn(&mut bob, "Bob").await;
        expect_closed(&mut bob).await;

        // alice is unaffected
        let update = recv_until(&mut alice, |m| updated_ids(m).is_some()).await;
        assert_eq!(updated_ids(&update), Some(vec![0]));
    }
}

/// PROTOCOL VIOLATION TESTS
mod protocol_tests {
    use super::*;

    #[tokio::test]
    async fn malformed_frame_closes_connection() {
        let addr = start_server(test_config()).await;
        let mut ws = connect(addr).await;

        ws.send(Message::Binary(vec![0xff, 0xff, 0xff]))
            .await
            .unwrap();

        expect_closed(&mut ws).await;
    }

    #[tokio::test]
    async fn text_frame_closes_connection() {
        let addr = start_server(test_config()).await;
        let mut ws = connect(addr).await;

        ws.send(Message::Text("[\"spawn\",\"Alice\"]".to_string()))
            .await
            .unwrap();

        expect_closed(&mut ws).await;
    }

    #[tokio::test]
    async fn non_finite_direction_closes_and_removes() {
        let addr = start_server(test_config()).await;
        let mut alice = connect(addr).await;
        let mut mallory = connect(addr).await;

        spawn(&mut alice, "Alice").await;
        own_player_id(&mut alice).await;
        spawn(&mut mallory, "Mallory").await;
        let mallory_id = own_player_id(&mut mallory).await;

        send(
            &mut mallory,
            ClientMessage::Move {
                direction: Some(f32::INFINITY),
                magnitude: 1.0,
            },
        )
        .await;

        expect_closed(&mut mallory).await;
        let removed = recv_until(&mut alice, |m| matches!(m, ServerMessage::RemovePlayer { .. })).await;
        assert_eq!(removed, ServerMessage::RemovePlayer { id: mallory_id });
    }

    #[tokio::test]
    async fn unknown_tag_is_ignored() {
        let addr = start_server(test_config()).await;
        let mut ws = connect(addr).await;

        // ("chat", "hi") with varint string lengths
        let mut frame = vec![4];
        frame.extend_from_slice(b"chat");
        frame.push(2);
        frame.extend_from_slice(b"hi");
        ws.send(Message::Binary(frame)).await.unwrap();

        spawn(&mut ws, "Alice").await;
        assert_eq!(own_player_id(&mut ws).await, 0);
    }
}

/// CLIENT NETWORK TESTS
mod client_tests {
    use super::*;
    use client::game::ClientWorld;
    use client::network::{self, NetworkEvent};

    #[tokio::test(flavor = "multi_thread")]
    async fn client_mirror_follows_server() {
        let addr = start_server(test_config()).await;

        let handle = network::connect(&addr.to_string()).unwrap();
        handle.send(ClientMessage::Spawn {
            name: "Alice".to_string(),
        });

        let world = tokio::task::spawn_blocking(move || {
            let mut world = ClientWorld::new();
            let mut snapshots = 0;
            while snapshots < 3 {
                match handle.recv() {
                    Some(NetworkEvent::Message(message)) => {
                        if world.apply(message, std::time::Instant::now()) {
                            snapshots += 1;
                            handle.send(ClientMessage::Move {
                                direction: None,
                                magnitude: 0.0,
                            });
                        }
                    }
                    Some(NetworkEvent::Connected) => {}
                    Some(NetworkEvent::Disconnected(reason)) => panic!("Disconnected: {}", reason),
                    None => panic!("Network thread exited"),
                }
            }
            world
        });

        let mut world = timeout(WAIT, world).await.unwrap().unwrap();

        assert_eq!(world.my_player(), Some(0));
        assert_eq!(world.player_count(), 1);
        assert_eq!(world.xp_blobs().count(), XP_BLOBS);

        world.sample(std::time::Instant::now() + Duration::from_secs(1));
        let focus = world.camera_focus().unwrap();
        let player = world.player(0).unwrap();
        assert_eq!(focus, player.blobs[&0].confirmed);
    }
}
