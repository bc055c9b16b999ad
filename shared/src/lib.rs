//! Types shared by the arena server and client: simulation constants, the
//! blob/player model with its movement step, and the binary wire protocol.

pub mod config;
pub mod entity;
pub mod protocol;

pub use config::GameConfig;
pub use entity::{blob_radius, Blob, BlobId, Player, PlayerId, Vec2};
pub use protocol::{
    decode, encode, BlobState, ClientMessage, Envelope, PlayerState, PlayerUpdate,
    ProtocolError, ServerMessage,
};
