//! Remote debugging for behaviour tree zones.
//!
//! A debug client connects over TCP, receives the zone names and the state of the debugged
//! zone every tick, and can select an agent to inspect its tree, pause, step, reset or
//! switch zones. Frames are length prefixed MessagePack, see [`codec`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod network;
pub mod protocol;
mod server;

pub use codec::{decode_frame, encode_frame, read_message, write_message, WireError};
pub use config::DebugServerConfig;
pub use network::{ClientId, Network, NetworkError, NetworkEvent};
pub use protocol::{
    AgentState, CharacterDetails, CharacterStatic, Message, MessageType, NodeDetails, NodeStatic,
};
pub use server::Server;
