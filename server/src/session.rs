//! Per-connection session state machine
//!
//! A session starts `Connected`, becomes `Spawned` once the client asks to
//! join, and ends `Disconnected` when the transport goes away. Handlers never
//! touch sockets: they mutate the [`World`] and return the messages to send,
//! leaving delivery to the network layer.

use crate::utils::{random_color, random_point};
use crate::world::{ConnectionId, RegistryError, World};
use log::{debug, info};
use rand::Rng;
use shared::config::STARTER_XP_MAX;
use shared::{BlobState, ClientMessage, Player, PlayerId, PlayerState, ServerMessage};
use thiserror::Error;

/// Name given to players that spawn without one.
pub const DEFAULT_PLAYER_NAME: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Spawned { player_id: PlayerId },
    Disconnected,
}

/// Reasons a session must be closed.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("server full: {0}")]
    CapacityExceeded(#[from] RegistryError),
}

/// A message produced by a handler, addressed by connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Send {
        to: ConnectionId,
        message: ServerMessage,
    },
    /// Delivered to every connection that owns a player, minus `exclude`.
    Broadcast {
        message: ServerMessage,
        exclude: Option<ConnectionId>,
    },
}

#[derive(Debug)]
pub struct Session {
    connection: ConnectionId,
    state: SessionState,
}

impl Session {
    pub fn new(connection: ConnectionId) -> Self {
        Self {
            connection,
            state: SessionState::Connected,
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        match self.state {
            SessionState::Spawned { player_id } => Some(player_id),
            _ => None,
        }
    }

    /// Applies one decoded client message to the world.
    pub fn handle<R: Rng + ?Sized>(
        &mut self,
        world: &mut World,
        message: ClientMessage,
        rng: &mut R,
    ) -> Result<Vec<Outgoing>, SessionError> {
        match (self.state, message) {
            (SessionState::Connected, ClientMessage::Spawn { name }) => {
                self.spawn(world, name, rng)
            }
            (
                SessionState::Spawned { player_id },
                ClientMessage::Move {
                    direction,
                    magnitude,
                },
            ) => {
                self.apply_move(world, player_id, direction, magnitude)?;
                Ok(Vec::new())
            }
            (state, message) => {
                debug!(
                    "Ignoring {:?} from connection {} in state {:?}",
                    message, self.connection, state
                );
                Ok(Vec::new())
            }
        }
    }

    fn spawn<R: Rng + ?Sized>(
        &mut self,
        world: &mut World,
        name: String,
        rng: &mut R,
    ) -> Result<Vec<Outgoing>, SessionError> {
        let player_id = world.allocate_id()?;

        let name = if name.is_empty() {
            DEFAULT_PLAYER_NAME.to_string()
        } else {
            name
        };
        let position = random_point(rng, world.config().map_size);
        let starter_xp = rng.gen::<f32>() * STARTER_XP_MAX;
        let player = Player::new(player_id, name, random_color(rng), position, starter_xp);

        info!(
            "Connection {} spawned player {} ({}) at ({:.0}, {:.0})",
            self.connection, player_id, player.name, position.x, position.y
        );

        let state = PlayerState::from(&player);
        world.add_player(self.connection, player);
        self.state = SessionState::Spawned { player_id };

        let mut outgoing = vec![
            Outgoing::Send {
                to: self.connection,
                message: ServerMessage::AddPlayer {
                    player: state.clone(),
                    is_mine: true,
                },
            },
            Outgoing::Broadcast {
                message: ServerMessage::AddPlayer {
                    player: state,
                    is_mine: false,
                },
                exclude: Some(self.connection),
            },
        ];

        // Catch-up for the new session only
        outgoing.extend(
            world
                .all_players()
                .iter()
                .filter(|p| p.id != player_id)
                .map(|p| Outgoing::Send {
                    to: self.connection,
                    message: ServerMessage::AddPlayer {
                        player: PlayerState::from(p),
                        is_mine: false,
                    },
                }),
        );
        outgoing.extend(world.xp_blobs().iter().map(|blob| Outgoing::Send {
            to: self.connection,
            message: ServerMessage::AddBlob(BlobState::from(blob)),
        }));

        Ok(outgoing)
    }

    fn apply_move(
        &self,
        world: &mut World,
        player_id: PlayerId,
        direction: Option<f32>,
        magnitude: f32,
    ) -> Result<(), SessionError> {
        if direction.map_or(false, |d| !d.is_finite()) {
            return Err(SessionError::ProtocolViolation(format!(
                "non-finite move direction {:?}",
                direction
            )));
        }
        if !magnitude.is_finite() {
            return Err(SessionError::ProtocolViolation(format!(
                "non-finite move magnitude {}",
                magnitude
            )));
        }

        if let Some(player) = world.find_player_mut(player_id) {
            player.set_movement(direction, magnitude);
        }
        Ok(())
    }

    /// Tears the session down. Safe to call more than once.
    pub fn disconnect(&mut self, world: &mut World) -> Vec<Outgoing> {
        let previous = std::mem::replace(&mut self.state, SessionState::Disconnected);

        match previous {
            SessionState::Spawned { player_id } => {
                world.remove_player(player_id);
                world.release_id(player_id);
                info!(
                    "Connection {} left, removed player {}",
                    self.connection, player_id
                );
                vec![Outgoing::Broadcast {
                    message: ServerMessage::RemovePlayer { id: player_id },
                    exclude: Some(self.connection),
                }]
            }
            SessionState::Connected => {
                info!("Connection {} left without spawning", self.connection);
                Vec::new()
            }
            SessionState::Disconnected => Vec::new(),
        }
    }
}
