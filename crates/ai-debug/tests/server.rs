use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ai_bt::{AiRegistry, TreeSpec};
use ai_core::{Agent, AgentId, BasicCharacter, TreeNodeStatus};
use ai_debug::{read_message, write_message, DebugServerConfig, Message, Server};
use ai_zone::Zone;

const MAX_FRAME: usize = 1 << 20;

fn arena() -> Arc<Zone> {
    let registry = AiRegistry::new();
    let mut spec = TreeSpec::new("guard");
    let root = spec.create_root("PrioritySelector", "root").unwrap();
    spec.add_node(root, "Idle{1000}", "idle").unwrap();
    let tree = spec.build(&registry).unwrap();

    let zone = Zone::new("arena", 1);
    for id in 1..=2 {
        let agent = Agent::new(Arc::new(BasicCharacter::new(id))).with_behaviour(tree.clone());
        zone.add_agent(Arc::new(agent));
    }
    zone.update(16);
    zone
}

fn server_with(zone: &Arc<Zone>) -> Server {
    let mut server = Server::new(DebugServerConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        ..DebugServerConfig::default()
    });
    server.start().expect("bind loopback");
    assert!(server.add_zone(zone.clone()));
    server
}

fn connect(server: &mut Server) -> TcpStream {
    let client = TcpStream::connect(server.local_addr().unwrap()).unwrap();
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    poll_until(server, |s| s.network().connected_clients() == 1);
    client
}

fn poll_until(server: &mut Server, mut done: impl FnMut(&Server) -> bool) {
    for _ in 0..400 {
        server.update(10);
        if done(server) {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("condition not reached");
}

/// Reads until `pick` accepts a message, skipping the periodic broadcasts in between.
fn read_until<T>(client: &mut TcpStream, mut pick: impl FnMut(Message) -> Option<T>) -> T {
    for _ in 0..200 {
        let message = read_message(client, MAX_FRAME).expect("message from server");
        if let Some(found) = pick(message) {
            return found;
        }
    }
    panic!("expected message never arrived");
}

#[test]
fn new_clients_receive_pause_state_and_zone_names() {
    let zone = arena();
    let mut server = server_with(&zone);
    assert!(!server.add_zone(arena()));
    assert!(server.set_debug("arena"));
    assert!(zone.is_debug());

    let mut client = connect(&mut server);
    assert_eq!(read_message(&mut client, MAX_FRAME).unwrap(), Message::Pause(false));
    assert_eq!(
        read_message(&mut client, MAX_FRAME).unwrap(),
        Message::Names(vec!["arena".into()])
    );
    let states = read_until(&mut client, |m| match m {
        Message::StateWorld(states) => Some(states),
        _ => None,
    });
    let mut ids: Vec<_> = states.iter().map(|s| s.id).collect();
    ids.sort();
    assert_eq!(ids, vec![AgentId(1), AgentId(2)]);
}

#[test]
fn selection_sends_the_tree_layout() {
    let zone = arena();
    let mut server = server_with(&zone);
    server.set_debug("arena");
    let mut client = connect(&mut server);

    write_message(&mut client, &Message::Select(AgentId(2))).unwrap();
    poll_until(&mut server, |s| s.selected() == Some(AgentId(2)));

    let layout = read_until(&mut client, |m| match m {
        Message::CharacterStatic(layout) => Some(layout),
        _ => None,
    });
    assert_eq!(layout.id, AgentId(2));
    let types: Vec<_> = layout.nodes.iter().map(|n| n.node_type.as_str()).collect();
    assert_eq!(types, vec!["PrioritySelector", "Idle"]);
    assert_eq!(layout.nodes[1].name, "idle");
    assert_eq!(layout.nodes[1].parameters, "1000");
}

#[test]
fn pause_freezes_the_zone_and_step_advances_it() {
    let zone = arena();
    let mut server = server_with(&zone);
    server.set_debug("arena");
    server.select(AgentId(1));
    let mut client = connect(&mut server);

    write_message(&mut client, &Message::Pause(true)).unwrap();
    poll_until(&mut server, Server::is_paused);
    let agent = zone.get(AgentId(1)).unwrap();
    assert!(agent.is_paused());

    let details = read_until(&mut client, |m| match m {
        Message::CharacterDetails(details) => Some(details),
        _ => None,
    });
    assert_eq!(details.id, AgentId(1));
    assert_eq!(details.root.status, Some(TreeNodeStatus::Running));
    assert!(details.root.running);
    assert!(details.root.children[0].running);
    assert!(details.root.children[0].last_run_millis >= 0);

    let before = agent.time();
    zone.update(500);
    assert_eq!(agent.time(), before);

    write_message(&mut client, &Message::Step(100)).unwrap();
    poll_until(&mut server, |_| agent.time() == before + 100);
    assert!(agent.is_paused());
}

#[test]
fn stepping_is_ignored_while_running() {
    let zone = arena();
    let mut server = server_with(&zone);
    server.set_debug("arena");
    let before = zone.get(AgentId(1)).unwrap().time();
    server.step(100);
    assert_eq!(zone.get(AgentId(1)).unwrap().time(), before);
}

#[test]
fn change_zone_switches_the_debugged_zone() {
    let zone = arena();
    let other = Zone::new("harbour", 1);
    let mut server = server_with(&zone);
    assert!(server.add_zone(other.clone()));
    server.set_debug("arena");
    let mut client = connect(&mut server);

    write_message(&mut client, &Message::ChangeZone("harbour".into())).unwrap();
    poll_until(&mut server, |s| {
        s.debug_zone().map(|z| z.name().to_string()) == Some("harbour".into())
    });
    assert!(other.is_debug());
    assert!(!zone.is_debug());

    write_message(&mut client, &Message::ChangeZone("nowhere".into())).unwrap();
    poll_until(&mut server, |s| s.debug_zone().is_none());
    assert!(!other.is_debug());
}

#[test]
fn removing_a_zone_broadcasts_names() {
    let zone = arena();
    let mut server = server_with(&zone);
    server.set_debug("arena");
    let mut client = connect(&mut server);

    assert!(server.remove_zone("arena"));
    assert!(!server.remove_zone("arena"));
    assert!(server.debug_zone().is_none());
    assert!(!zone.is_debug());
    let names = read_until(&mut client, |m| match m {
        Message::Names(names) if names.is_empty() => Some(names),
        _ => None,
    });
    assert!(names.is_empty());
}

#[test]
fn last_disconnect_resumes_and_stops_debugging() {
    let zone = arena();
    let mut server = server_with(&zone);
    server.set_debug("arena");
    let client = connect(&mut server);

    server.pause(true);
    assert!(zone.get(AgentId(1)).unwrap().is_paused());

    drop(client);
    poll_until(&mut server, |s| s.network().connected_clients() == 0);
    assert!(!server.is_paused());
    assert!(server.debug_zone().is_none());
    assert!(!zone.is_debug());
    assert!(!zone.get(AgentId(1)).unwrap().is_paused());
}

#[test]
fn vanished_agents_clear_the_selection() {
    let zone = arena();
    let mut server = server_with(&zone);
    server.set_debug("arena");
    let _client = connect(&mut server);

    server.select(AgentId(2));
    assert_eq!(server.selected(), Some(AgentId(2)));
    zone.remove_agent(AgentId(2));
    zone.update(16);

    poll_until(&mut server, |s| s.selected().is_none());
}

#[test]
fn reset_clears_node_state() {
    let zone = arena();
    let mut server = server_with(&zone);
    server.set_debug("arena");
    let mut client = connect(&mut server);

    let has_state = |zone: &Zone| {
        zone.with_agent_state(AgentId(1), |agent, states| {
            let root = agent.behaviour().unwrap();
            states.last_status(root.id()).is_some()
        })
        .unwrap_or(false)
    };
    assert!(has_state(&zone));

    write_message(&mut client, &Message::Reset).unwrap();
    poll_until(&mut server, |_| !has_state(&zone));
}

#[test]
fn details_carry_the_aggro_list() {
    let zone = arena();
    let agent = zone.get(AgentId(1)).unwrap();
    agent.aggro_mgr().add_aggro(AgentId(2), 3.0);
    agent.aggro_mgr().add_aggro(AgentId(7), 9.0);

    let mut server = server_with(&zone);
    server.set_debug("arena");
    server.select(AgentId(1));
    let mut client = connect(&mut server);
    server.update(10);

    let details = read_until(&mut client, |m| match m {
        Message::CharacterDetails(details) => Some(details),
        _ => None,
    });
    let aggro: Vec<(AgentId, f32)> = details.aggro.iter().map(|e| (e.id, e.aggro)).collect();
    assert_eq!(aggro, vec![(AgentId(7), 9.0), (AgentId(2), 3.0)]);
}
