use crate::interpolation::BlobShadow;
use log::{debug, info};
use shared::{BlobId, BlobState, PlayerId, PlayerState, ServerMessage, Vec2};
use std::collections::BTreeMap;
use std::time::Instant;

/// A player as the client knows it
#[derive(Debug, Clone)]
pub struct RemotePlayer {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub blobs: BTreeMap<BlobId, BlobShadow>,
}

impl RemotePlayer {
    fn from_state(state: PlayerState) -> Self {
        Self {
            id: state.id,
            name: state.name,
            color: state.color,
            blobs: state.blobs.iter().map(shadow_entry).collect(),
        }
    }
}

fn shadow_entry(blob: &BlobState) -> (BlobId, BlobShadow) {
    (blob.id, BlobShadow::new(Vec2::new(blob.x, blob.y), blob.scale))
}

/// Mirror of the server world, fed by decoded server messages
#[derive(Debug, Default)]
pub struct ClientWorld {
    players: BTreeMap<PlayerId, RemotePlayer>,
    xp_blobs: BTreeMap<BlobId, BlobShadow>,
    my_player: Option<PlayerId>,
}

impl ClientWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one server message received at `now`.
    ///
    /// Returns `true` for a tick snapshot, which is the client's cue to send
    /// its current movement.
    pub fn apply(&mut self, message: ServerMessage, now: Instant) -> bool {
        match message {
            ServerMessage::AddPlayer { player, is_mine } => {
                if is_mine {
                    info!("Spawned as player {} ({})", player.id, player.name);
                    self.my_player = Some(player.id);
                }
                self.players
                    .insert(player.id, RemotePlayer::from_state(player));
                false
            }
            ServerMessage::AddBlob(blob) => {
                let (id, shadow) = shadow_entry(&blob);
                self.xp_blobs.insert(id, shadow);
                false
            }
            ServerMessage::RemovePlayer { id } => {
                self.players.remove(&id);
                if self.my_player == Some(id) {
                    self.my_player = None;
                }
                false
            }
            ServerMessage::UpdatePlayers(updates) => {
                for update in updates {
                    let Some(player) = self.players.get_mut(&update.id) else {
                        debug!("Skipping update for unknown player {}", update.id);
                        continue;
                    };
                    for blob in update.blobs {
                        match player.blobs.get_mut(&blob.id) {
                            Some(shadow) => {
                                shadow.confirm(Vec2::new(blob.x, blob.y), blob.scale, now)
                            }
                            None => debug!(
                                "Skipping unknown blob {} of player {}",
                                blob.id, update.id
                            ),
                        }
                    }
                }
                true
            }
        }
    }

    /// Advances every player blob's rendered position to `now`.
    pub fn sample(&mut self, now: Instant) {
        for player in self.players.values_mut() {
            for shadow in player.blobs.values_mut() {
                shadow.sample(now);
            }
        }
    }

    /// Mean rendered position of the local player's blobs
    pub fn camera_focus(&self) -> Option<Vec2> {
        let player = self.players.get(&self.my_player?)?;
        if player.blobs.is_empty() {
            return None;
        }
        let sum = player
            .blobs
            .values()
            .fold(Vec2::ZERO, |acc, shadow| acc.add(&shadow.rendered));
        Some(sum.scale(1.0 / player.blobs.len() as f32))
    }

    pub fn my_player(&self) -> Option<PlayerId> {
        self.my_player
    }

    pub fn player(&self, id: PlayerId) -> Option<&RemotePlayer> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &RemotePlayer> {
        self.players.values()
    }

    pub fn xp_blobs(&self) -> impl Iterator<Item = &BlobShadow> {
        self.xp_blobs.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
