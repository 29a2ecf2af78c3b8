use std::io::Read;
use std::net::TcpStream;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;

use ai_core::AgentId;
use ai_debug::{
    read_message, write_message, DebugServerConfig, Message, Network, NetworkError, NetworkEvent,
};

fn local_config() -> DebugServerConfig {
    DebugServerConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        ..DebugServerConfig::default()
    }
}

fn started(config: DebugServerConfig) -> (Network, Receiver<NetworkEvent>, TcpStream) {
    let mut network = Network::new(config);
    let events = network.subscribe();
    let addr = network.start().expect("bind loopback");
    let client = TcpStream::connect(addr).expect("connect");
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    (network, events, client)
}

fn next_event(network: &mut Network, events: &Receiver<NetworkEvent>) -> NetworkEvent {
    for _ in 0..400 {
        network.update().unwrap();
        if let Ok(event) = events.try_recv() {
            return event;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("no network event");
}

#[test]
fn update_before_start_is_an_error() {
    let mut network = Network::new(local_config());
    assert!(matches!(network.update(), Err(NetworkError::NotStarted)));
    assert!(!network.is_started());
}

#[test]
fn bind_failure_names_the_address() {
    let (network, _events, _client) = started(local_config());
    let taken = network.local_addr().unwrap();
    let mut other = Network::new(DebugServerConfig {
        bind_address: taken,
        ..DebugServerConfig::default()
    });
    match other.start() {
        Err(NetworkError::BindFailed(addr, _)) => assert_eq!(addr, taken),
        other => panic!("expected bind failure, got {other:?}"),
    }
}

#[test]
fn client_lifecycle_produces_events() {
    let (mut network, events, mut client) = started(local_config());

    let NetworkEvent::Connected(id) = next_event(&mut network, &events) else {
        panic!("expected connect");
    };
    assert_eq!(network.connected_clients(), 1);
    assert_eq!(network.client_ids(), vec![id]);

    write_message(&mut client, &Message::Select(AgentId(7))).unwrap();
    write_message(&mut client, &Message::Step(16)).unwrap();
    assert_eq!(
        next_event(&mut network, &events),
        NetworkEvent::Message(id, Message::Select(AgentId(7)))
    );
    assert_eq!(
        next_event(&mut network, &events),
        NetworkEvent::Message(id, Message::Step(16))
    );

    drop(client);
    assert_eq!(next_event(&mut network, &events), NetworkEvent::Disconnected(id));
    assert_eq!(network.connected_clients(), 0);
}

#[test]
fn broadcast_and_direct_sends_reach_the_client() {
    let (mut network, events, mut client) = started(local_config());
    let NetworkEvent::Connected(id) = next_event(&mut network, &events) else {
        panic!("expected connect");
    };

    assert_eq!(network.broadcast(&Message::Names(vec!["arena".into()])), 1);
    assert!(network.send_to_client(id, &Message::Pause(true)));
    assert!(!network.send_to_client(id + 100, &Message::Ping));
    network.update().unwrap();

    let max = network.config().max_frame_size;
    assert_eq!(
        read_message(&mut client, max).unwrap(),
        Message::Names(vec!["arena".into()])
    );
    assert_eq!(read_message(&mut client, max).unwrap(), Message::Pause(true));
}

#[test]
fn oversized_frames_disconnect_the_sender() {
    let config = DebugServerConfig {
        max_frame_size: 16,
        ..local_config()
    };
    let (mut network, events, mut client) = started(config);
    let NetworkEvent::Connected(id) = next_event(&mut network, &events) else {
        panic!("expected connect");
    };

    write_message(&mut client, &Message::ChangeZone("x".repeat(64))).unwrap();
    assert_eq!(next_event(&mut network, &events), NetworkEvent::Disconnected(id));
}

#[test]
fn server_side_disconnect_closes_the_socket() {
    let (mut network, events, mut client) = started(local_config());
    let NetworkEvent::Connected(id) = next_event(&mut network, &events) else {
        panic!("expected connect");
    };

    assert!(network.disconnect(id));
    assert_eq!(next_event(&mut network, &events), NetworkEvent::Disconnected(id));
    let mut buf = [0u8; 8];
    assert_eq!(client.read(&mut buf).unwrap(), 0);
    assert!(!network.disconnect(id));
}

#[test]
fn connections_beyond_the_limit_are_refused() {
    let config = DebugServerConfig {
        max_clients: 1,
        ..local_config()
    };
    let (mut network, events, _first) = started(config);
    assert!(matches!(next_event(&mut network, &events), NetworkEvent::Connected(_)));

    let mut second = TcpStream::connect(network.local_addr().unwrap()).unwrap();
    second
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    for _ in 0..20 {
        network.update().unwrap();
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(network.connected_clients(), 1);
    let mut buf = [0u8; 8];
    assert_eq!(second.read(&mut buf).unwrap(), 0);
}

#[test]
fn client_that_never_reads_is_dropped_once_its_backlog_is_full() {
    let config = DebugServerConfig {
        max_outbox_bytes: 256 * 1024,
        ..local_config()
    };
    let (mut network, events, _idle_client) = started(config);
    let NetworkEvent::Connected(id) = next_event(&mut network, &events) else {
        panic!("expected connect");
    };

    let bulky = Message::Names(vec!["x".repeat(64 * 1024)]);
    let mut disconnected = false;
    for _ in 0..2_000 {
        network.broadcast(&bulky);
        network.update().unwrap();
        if let Ok(event) = events.try_recv() {
            assert_eq!(event, NetworkEvent::Disconnected(id));
            disconnected = true;
            break;
        }
    }
    assert!(disconnected, "backlog was never capped");
    assert_eq!(network.connected_clients(), 0);
    assert!(!network.send_to_client(id, &Message::Ping));
}
