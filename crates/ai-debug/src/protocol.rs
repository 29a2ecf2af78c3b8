//! Messages exchanged between the debug server and its clients.

use std::collections::BTreeMap;

use ai_core::{AggroEntry, AgentId, NodeId, TreeNodeStatus, Vec3};
use serde::{Deserialize, Serialize};

/// Type byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Ping = 0,
    StateWorld = 1,
    CharacterStatic = 2,
    CharacterDetails = 3,
    Select = 4,
    Pause = 5,
    ChangeZone = 6,
    Reset = 7,
    Step = 8,
    Names = 9,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => MessageType::Ping,
            1 => MessageType::StateWorld,
            2 => MessageType::CharacterStatic,
            3 => MessageType::CharacterDetails,
            4 => MessageType::Select,
            5 => MessageType::Pause,
            6 => MessageType::ChangeZone,
            7 => MessageType::Reset,
            8 => MessageType::Step,
            9 => MessageType::Names,
            _ => return None,
        })
    }
}

/// Where one agent is and what it looks like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub position: Vec3,
    pub orientation: f32,
    pub attributes: BTreeMap<String, String>,
}

/// Static description of one node of the selected agent's tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatic {
    pub id: NodeId,
    pub name: String,
    pub node_type: String,
    pub parameters: String,
    pub condition_name: String,
    pub condition_parameters: String,
}

/// Tree nodes of the selected agent, flattened depth first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStatic {
    pub id: AgentId,
    pub nodes: Vec<NodeStatic>,
}

/// Runtime view of one node for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetails {
    pub id: NodeId,
    /// Condition rendered with its current result, empty without a condition.
    pub condition: String,
    /// Milliseconds since the node last ran, `-1` if it never did.
    pub last_run_millis: i64,
    pub status: Option<TreeNodeStatus>,
    pub running: bool,
    pub children: Vec<NodeDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDetails {
    pub id: AgentId,
    /// Aggro list of the agent, highest first.
    pub aggro: Vec<AggroEntry>,
    pub root: NodeDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Keep-alive, no payload.
    Ping,
    /// Server to client: every agent of the debugged zone.
    StateWorld(Vec<AgentState>),
    /// Server to client: tree layout of the selected agent.
    CharacterStatic(CharacterStatic),
    /// Server to client: tree state of the selected agent.
    CharacterDetails(CharacterDetails),
    /// Client to server: select an agent.
    Select(AgentId),
    /// Both ways: pause state of the debugged zone.
    Pause(bool),
    /// Client to server: debug another zone.
    ChangeZone(String),
    /// Client to server: reset all node state in the debugged zone.
    Reset,
    /// Client to server: advance paused agents by this many milliseconds.
    Step(i64),
    /// Server to client: names of all debuggable zones.
    Names(Vec<String>),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Ping => MessageType::Ping,
            Message::StateWorld(_) => MessageType::StateWorld,
            Message::CharacterStatic(_) => MessageType::CharacterStatic,
            Message::CharacterDetails(_) => MessageType::CharacterDetails,
            Message::Select(_) => MessageType::Select,
            Message::Pause(_) => MessageType::Pause,
            Message::ChangeZone(_) => MessageType::ChangeZone,
            Message::Reset => MessageType::Reset,
            Message::Step(_) => MessageType::Step,
            Message::Names(_) => MessageType::Names,
        }
    }
}
