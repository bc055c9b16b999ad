//! Wire protocol shared by the server and the client.
//!
//! Every frame is a bincode-encoded `[tag, payload]` pair. The tag is the
//! message name as a string so both sides can skip messages they do not
//! know; payloads are positional tuples. Nothing outside this module relies
//! on the byte layout.

use crate::entity::{Blob, BlobId, Player, PlayerId};
use bincode::Options;
use serde::de::{self, DeserializeOwned, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Upper bound on a single encoded frame.
pub const MAX_MESSAGE_BYTES: u64 = 1 << 20;

/// Wire tags, one per message kind.
pub mod tag {
    pub const SPAWN: &str = "spawn";
    pub const MOVE: &str = "move";
    pub const ADD_PLAYER: &str = "addPlayer";
    pub const ADD_BLOB: &str = "addBlob";
    pub const REMOVE_PLAYER: &str = "removePlayer";
    pub const UPDATE_PLAYERS: &str = "updatePlayers";
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    MalformedMessage(#[source] bincode::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[source] bincode::Error),
}

/// Position and size of one blob as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobState {
    pub id: BlobId,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl From<&Blob> for BlobState {
    fn from(blob: &Blob) -> Self {
        Self {
            id: blob.id,
            x: blob.position.x,
            y: blob.position.y,
            scale: blob.radius(),
        }
    }
}

/// Everything a client needs to start drawing a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub name: String,
    pub color: String,
    pub blobs: Vec<BlobState>,
}

impl From<&Player> for PlayerState {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            x: player.position.x,
            y: player.position.y,
            name: player.name.clone(),
            color: player.color.clone(),
            blobs: player.blobs.iter().map(BlobState::from).collect(),
        }
    }
}

/// Per-tick position sample of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub blobs: Vec<BlobState>,
}

impl From<&Player> for PlayerUpdate {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            x: player.position.x,
            y: player.position.y,
            blobs: player.blobs.iter().map(BlobState::from).collect(),
        }
    }
}

/// Messages a client sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Spawn {
        name: String,
    },
    /// `direction` is an angle in radians; `None` releases the stick.
    Move {
        direction: Option<f32>,
        magnitude: f32,
    },
}

/// Messages the server sends to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    AddPlayer { player: PlayerState, is_mine: bool },
    AddBlob(BlobState),
    RemovePlayer { id: PlayerId },
    UpdatePlayers(Vec<PlayerUpdate>),
}

/// A message family that travels as a `[tag, payload]` pair.
pub trait Envelope: Serialize + DeserializeOwned {
    /// Every tag this family can decode.
    const TAGS: &'static [&'static str];

    fn tag(&self) -> &'static str;
}

impl Envelope for ClientMessage {
    const TAGS: &'static [&'static str] = &[tag::SPAWN, tag::MOVE];

    fn tag(&self) -> &'static str {
        match self {
            ClientMessage::Spawn { .. } => tag::SPAWN,
            ClientMessage::Move { .. } => tag::MOVE,
        }
    }
}

impl Envelope for ServerMessage {
    const TAGS: &'static [&'static str] = &[
        tag::ADD_PLAYER,
        tag::ADD_BLOB,
        tag::REMOVE_PLAYER,
        tag::UPDATE_PLAYERS,
    ];

    fn tag(&self) -> &'static str {
        match self {
            ServerMessage::AddPlayer { .. } => tag::ADD_PLAYER,
            ServerMessage::AddBlob(_) => tag::ADD_BLOB,
            ServerMessage::RemovePlayer { .. } => tag::REMOVE_PLAYER,
            ServerMessage::UpdatePlayers(_) => tag::UPDATE_PLAYERS,
        }
    }
}

impl Serialize for ClientMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut envelope = serializer.serialize_tuple(2)?;
        envelope.serialize_element(self.tag())?;
        match self {
            ClientMessage::Spawn { name } => envelope.serialize_element(&(name,))?,
            ClientMessage::Move {
                direction,
                magnitude,
            } => envelope.serialize_element(&(direction, magnitude))?,
        }
        envelope.end()
    }
}

impl Serialize for ServerMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut envelope = serializer.serialize_tuple(2)?;
        envelope.serialize_element(self.tag())?;
        match self {
            ServerMessage::AddPlayer { player, is_mine } => {
                envelope.serialize_element(&(player, is_mine))?
            }
            ServerMessage::AddBlob(blob) => envelope.serialize_element(blob)?,
            ServerMessage::RemovePlayer { id } => envelope.serialize_element(&(id,))?,
            ServerMessage::UpdatePlayers(players) => envelope.serialize_element(players)?,
        }
        envelope.end()
    }
}

fn next_field<'de, A, T>(seq: &mut A, index: usize) -> Result<T, A::Error>
where
    A: SeqAccess<'de>,
    T: Deserialize<'de>,
{
    seq.next_element()?
        .ok_or_else(|| de::Error::invalid_length(index, &"a [tag, payload] pair"))
}

struct ClientVisitor;

impl<'de> Visitor<'de> for ClientVisitor {
    type Value = ClientMessage;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a [tag, payload] client message")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let kind: String = next_field(&mut seq, 0)?;
        match kind.as_str() {
            tag::SPAWN => {
                let (name,): (String,) = next_field(&mut seq, 1)?;
                Ok(ClientMessage::Spawn { name })
            }
            tag::MOVE => {
                let (direction, magnitude) = next_field(&mut seq, 1)?;
                Ok(ClientMessage::Move {
                    direction,
                    magnitude,
                })
            }
            other => Err(de::Error::unknown_variant(other, ClientMessage::TAGS)),
        }
    }
}

impl<'de> Deserialize<'de> for ClientMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(2, ClientVisitor)
    }
}

struct ServerVisitor;

impl<'de> Visitor<'de> for ServerVisitor {
    type Value = ServerMessage;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a [tag, payload] server message")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let kind: String = next_field(&mut seq, 0)?;
        match kind.as_str() {
            tag::ADD_PLAYER => {
                let (player, is_mine) = next_field(&mut seq, 1)?;
                Ok(ServerMessage::AddPlayer { player, is_mine })
            }
            tag::ADD_BLOB => Ok(ServerMessage::AddBlob(next_field(&mut seq, 1)?)),
            tag::REMOVE_PLAYER => {
                let (id,): (PlayerId,) = next_field(&mut seq, 1)?;
                Ok(ServerMessage::RemovePlayer { id })
            }
            tag::UPDATE_PLAYERS => Ok(ServerMessage::UpdatePlayers(next_field(&mut seq, 1)?)),
            other => Err(de::Error::unknown_variant(other, ServerMessage::TAGS)),
        }
    }
}

impl<'de> Deserialize<'de> for ServerMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(2, ServerVisitor)
    }
}

// Varint integers, little endian, trailing bytes rejected.
fn wire_options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_MESSAGE_BYTES)
}

/// Encodes a message into one binary frame.
pub fn encode<M: Envelope>(message: &M) -> Result<Vec<u8>, ProtocolError> {
    wire_options()
        .serialize(message)
        .map_err(ProtocolError::Encode)
}

/// Decodes one binary frame.
///
/// Returns `Ok(None)` when the frame carries a tag this family does not know,
/// so newer peers can add messages without breaking older ones. Truncated or
/// mistyped frames are `MalformedMessage`.
pub fn decode<M: Envelope>(bytes: &[u8]) -> Result<Option<M>, ProtocolError> {
    let tag: String = wire_options()
        .allow_trailing_bytes()
        .deserialize(bytes)
        .map_err(ProtocolError::MalformedMessage)?;

    if !M::TAGS.contains(&tag.as_str()) {
        return Ok(None);
    }

    wire_options()
        .deserialize(bytes)
        .map(Some)
        .map_err(ProtocolError::MalformedMessage)
}
