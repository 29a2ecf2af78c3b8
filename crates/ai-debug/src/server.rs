use std::net::SocketAddr;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use ai_core::{AgentId, AgentPtr, NodeStateStore, TreeNodePtr};
use ai_zone::Zone;
use tracing::{debug, info};

use crate::config::DebugServerConfig;
use crate::network::{ClientId, Network, NetworkError, NetworkEvent};
use crate::protocol::{
    AgentState, CharacterDetails, CharacterStatic, Message, NodeDetails, NodeStatic,
};

/// Streams the state of one zone to remote debuggers and applies their commands.
///
/// The server is driven by [`Server::update`] from the game loop; it never blocks. Zones are
/// registered with [`Server::add_zone`] and one of them at a time is debugged.
#[derive(Debug)]
pub struct Server {
    network: Network,
    events: Receiver<NetworkEvent>,
    zones: Vec<Arc<Zone>>,
    zone: Option<Arc<Zone>>,
    selected: Option<AgentId>,
    paused: bool,
    time_millis: i64,
}

impl Server {
    pub fn new(config: DebugServerConfig) -> Self {
        let mut network = Network::new(config);
        let events = network.subscribe();
        Self {
            network,
            events,
            zones: Vec::new(),
            zone: None,
            selected: None,
            paused: false,
            time_millis: 0,
        }
    }

    pub fn start(&mut self) -> Result<SocketAddr, NetworkError> {
        self.network.start()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.network.local_addr()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Makes `zone` debuggable. Zone names must be unique; returns `false` for a duplicate.
    pub fn add_zone(&mut self, zone: Arc<Zone>) -> bool {
        if self.zones.iter().any(|z| z.name() == zone.name()) {
            return false;
        }
        debug!(zone = zone.name(), "zone added");
        self.zones.push(zone);
        self.broadcast_zone_names();
        true
    }

    pub fn remove_zone(&mut self, name: &str) -> bool {
        let Some(index) = self.zones.iter().position(|z| z.name() == name) else {
            return false;
        };
        let zone = self.zones.remove(index);
        if self.zone.as_ref().is_some_and(|z| Arc::ptr_eq(z, &zone)) {
            zone.set_debug(false);
            self.zone = None;
            self.selected = None;
        }
        self.broadcast_zone_names();
        true
    }

    pub fn zone_names(&self) -> Vec<String> {
        self.zones.iter().map(|z| z.name().to_string()).collect()
    }

    /// The zone currently being debugged.
    pub fn debug_zone(&self) -> Option<&Arc<Zone>> {
        self.zone.as_ref()
    }

    /// Debugs the zone called `name`, or none if there is no such zone. Unpauses and clears
    /// the selection first.
    pub fn set_debug(&mut self, name: &str) -> bool {
        if self.paused {
            self.pause(false);
        }
        self.zone = None;
        self.selected = None;
        for zone in &self.zones {
            let debug = zone.name() == name;
            zone.set_debug(debug);
            if debug {
                self.zone = Some(Arc::clone(zone));
            }
        }
        info!(zone = name, found = self.zone.is_some(), "debug zone changed");
        self.zone.is_some()
    }

    pub fn selected(&self) -> Option<AgentId> {
        self.selected
    }

    pub fn select(&mut self, id: AgentId) {
        self.selected = None;
        if self.zone.is_none() {
            return;
        }
        self.selected = Some(id);
        self.broadcast_character_static();
        if self.paused {
            self.broadcast_state();
            self.broadcast_character_details();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pauses or resumes every agent of the debugged zone.
    pub fn pause(&mut self, pause: bool) {
        let Some(zone) = &self.zone else {
            return;
        };
        self.paused = pause;
        zone.execute(|agent| agent.set_pause(pause));
        self.network.broadcast(&Message::Pause(pause));
        if pause {
            self.broadcast_state();
            self.broadcast_character_details();
        }
    }

    /// Advances the paused zone by `millis`.
    pub fn step(&mut self, millis: i64) {
        let Some(zone) = &self.zone else {
            return;
        };
        if !self.paused {
            return;
        }
        zone.step(millis);
        self.broadcast_state();
        self.broadcast_character_details();
    }

    /// Resets the node state of every agent in the debugged zone.
    pub fn reset(&mut self) {
        if let Some(zone) = &self.zone {
            zone.reset_agent_states();
        }
    }

    /// Broadcasts the zone while not paused, then polls the network and handles commands.
    pub fn update(&mut self, delta_millis: i64) {
        self.time_millis += delta_millis;
        if self.network.connected_clients() > 0 && self.zone.is_some() {
            if !self.paused {
                self.broadcast_state();
                self.broadcast_character_details();
            }
        } else if self.paused {
            self.pause(false);
            self.selected = None;
        }

        if let Err(err) = self.network.update() {
            debug!(error = %err, "network update skipped");
            return;
        }
        while let Ok(event) = self.events.try_recv() {
            self.handle(event);
        }
    }

    /// Milliseconds accumulated through [`Server::update`].
    pub fn time(&self) -> i64 {
        self.time_millis
    }

    fn handle(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Connected(client) => self.on_connect(client),
            NetworkEvent::Disconnected(client) => self.on_disconnect(client),
            NetworkEvent::Message(client, message) => {
                debug!(client, ty = ?message.message_type(), "debug command");
                match message {
                    Message::Ping => {}
                    Message::Select(id) => self.select(id),
                    Message::Pause(pause) => self.pause(pause),
                    Message::ChangeZone(name) => {
                        self.set_debug(&name);
                    }
                    Message::Reset => self.reset(),
                    Message::Step(millis) => self.step(millis),
                    other => debug!(client, ty = ?other.message_type(), "ignoring server message"),
                }
            }
        }
    }

    fn on_connect(&mut self, client: ClientId) {
        self.network.send_to_client(client, &Message::Pause(self.paused));
        self.network
            .send_to_client(client, &Message::Names(self.zone_names()));
        if let Some(message) = self.character_static() {
            self.network.send_to_client(client, &message);
        }
    }

    fn on_disconnect(&mut self, client: ClientId) {
        if self.network.connected_clients() > 0 {
            return;
        }
        let Some(zone) = self.zone.clone() else {
            return;
        };
        debug!(client, zone = zone.name(), "last debug client left");
        if self.paused {
            self.pause(false);
        }
        zone.set_debug(false);
        self.zone = None;
        self.selected = None;
    }

    fn broadcast_zone_names(&mut self) {
        let names = self.zone_names();
        self.network.broadcast(&Message::Names(names));
    }

    fn broadcast_state(&mut self) {
        let Some(zone) = &self.zone else {
            return;
        };
        let mut states = Vec::with_capacity(zone.size());
        zone.execute(|agent| {
            let character = agent.character();
            states.push(AgentState {
                id: agent.id(),
                position: character.position(),
                orientation: character.orientation(),
                attributes: character.attributes(),
            });
        });
        self.network.broadcast(&Message::StateWorld(states));
    }

    fn broadcast_character_static(&mut self) {
        if let Some(message) = self.character_static() {
            self.network.broadcast(&message);
        }
    }

    fn broadcast_character_details(&mut self) {
        let (Some(zone), Some(id)) = (&self.zone, self.selected) else {
            return;
        };
        let details = zone.with_agent_state(id, |agent, states| {
            agent.behaviour().map(|root| CharacterDetails {
                id,
                aggro: agent.aggro_mgr().entries().to_vec(),
                root: node_details(&root, agent, states, true),
            })
        });
        match details {
            Some(Some(details)) => {
                self.network.broadcast(&Message::CharacterDetails(details));
            }
            Some(None) => {}
            None => self.selected = None,
        }
    }

    /// Static tree data of the selected agent. Clears the selection if the agent is gone.
    fn character_static(&mut self) -> Option<Message> {
        let (zone, id) = (self.zone.as_ref()?, self.selected?);
        let Some(agent) = zone.get(id) else {
            self.selected = None;
            return None;
        };
        let root = agent.behaviour()?;
        let mut nodes = Vec::new();
        collect_static(&root, &mut nodes);
        Some(Message::CharacterStatic(CharacterStatic { id, nodes }))
    }
}

fn collect_static(node: &TreeNodePtr, out: &mut Vec<NodeStatic>) {
    let (condition_name, condition_parameters) = node
        .condition()
        .map(|c| (c.name().to_string(), c.parameters().to_string()))
        .unwrap_or_default();
    out.push(NodeStatic {
        id: node.id(),
        name: node.name().to_string(),
        node_type: node.type_name().to_string(),
        parameters: node.parameters().to_string(),
        condition_name,
        condition_parameters,
    });
    for child in node.children() {
        collect_static(child, out);
    }
}

fn node_details(
    node: &TreeNodePtr,
    agent: &AgentPtr,
    states: &NodeStateStore,
    running: bool,
) -> NodeDetails {
    let condition = node
        .condition()
        .map(|c| c.name_with_conditions(agent))
        .unwrap_or_default();
    let last_run_millis = states
        .last_exec_millis(node.id())
        .map_or(-1, |last| agent.time() - last);
    let running_children = node.running_children(states);
    let children = node
        .children()
        .iter()
        .enumerate()
        .map(|(i, child)| {
            let running = running_children.get(i).copied().unwrap_or(false);
            node_details(child, agent, states, running)
        })
        .collect();
    NodeDetails {
        id: node.id(),
        condition,
        last_run_millis,
        status: states.last_status(node.id()),
        running,
        children,
    }
}
