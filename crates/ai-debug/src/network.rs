//! Non-blocking TCP transport for debug clients.
//!
//! Nothing here spawns threads: [`Network::update`] is polled from the owner's tick and
//! accepts, reads, dispatches and flushes whatever is ready at that moment.

use std::collections::BTreeMap;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, info, warn};

use crate::codec::{decode_frame, encode_frame};
use crate::config::DebugServerConfig;
use crate::protocol::Message;

pub type ClientId = u32;

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    Connected(ClientId),
    Disconnected(ClientId),
    Message(ClientId, Message),
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("failed to bind socket to {0}: {1}")]
    BindFailed(SocketAddr, io::Error),

    #[error("failed to determine bound address: {0}")]
    LocalAddrFailed(io::Error),

    #[error("failed to configure socket: {0}")]
    SocketConfig(io::Error),

    #[error("network is not started")]
    NotStarted,
}

struct Client {
    stream: TcpStream,
    addr: SocketAddr,
    inbox: Vec<u8>,
    outbox: Vec<u8>,
    closed: bool,
}

impl Client {
    /// Appends `frame` to the outbox and flushes. Closes the client instead when the unsent
    /// backlog would exceed `max_outbox_bytes`.
    fn queue(&mut self, id: ClientId, frame: &[u8], max_outbox_bytes: usize) {
        if self.outbox.len() + frame.len() > max_outbox_bytes {
            warn!(
                client = id,
                queued = self.outbox.len(),
                max_outbox_bytes,
                "client is not reading, disconnecting"
            );
            self.outbox.clear();
            self.closed = true;
            return;
        }
        self.outbox.extend_from_slice(frame);
        self.flush(id);
    }

    /// Writes as much of the outbox as the socket takes right now.
    fn flush(&mut self, id: ClientId) {
        while !self.closed && !self.outbox.is_empty() {
            match self.stream.write(&self.outbox) {
                Ok(0) => self.closed = true,
                Ok(n) => {
                    self.outbox.drain(..n);
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(client = id, error = %err, "write failed");
                    self.closed = true;
                }
            }
        }
    }
}

pub struct Network {
    config: DebugServerConfig,
    listener: Option<TcpListener>,
    clients: BTreeMap<ClientId, Client>,
    next_id: ClientId,
    subscribers: Vec<Sender<NetworkEvent>>,
}

impl Network {
    pub fn new(config: DebugServerConfig) -> Self {
        Self {
            config,
            listener: None,
            clients: BTreeMap::new(),
            next_id: 1,
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &DebugServerConfig {
        &self.config
    }

    /// Binds the listener. Returns the bound address, which differs from the configured one
    /// when port 0 was requested.
    pub fn start(&mut self) -> Result<SocketAddr, NetworkError> {
        if let Some(addr) = self.local_addr() {
            return Ok(addr);
        }
        let bind = self.config.bind_address;
        let listener =
            TcpListener::bind(bind).map_err(|err| NetworkError::BindFailed(bind, err))?;
        listener
            .set_nonblocking(true)
            .map_err(NetworkError::SocketConfig)?;
        let addr = listener.local_addr().map_err(NetworkError::LocalAddrFailed)?;
        info!(%addr, max_clients = self.config.max_clients, "debug server listening");
        self.listener = Some(listener);
        Ok(addr)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn is_started(&self) -> bool {
        self.listener.is_some()
    }

    /// Channel receiving every event from now on.
    pub fn subscribe(&mut self) -> Receiver<NetworkEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn connected_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    pub fn client_addr(&self, id: ClientId) -> Option<SocketAddr> {
        self.clients.get(&id).map(|c| c.addr)
    }

    /// One poll round. Never blocks.
    pub fn update(&mut self) -> Result<(), NetworkError> {
        if self.listener.is_none() {
            return Err(NetworkError::NotStarted);
        }
        self.accept();
        self.receive();
        for (&id, client) in &mut self.clients {
            client.flush(id);
        }
        self.reap();
        Ok(())
    }

    /// Queues `message` for every client. Returns how many clients it was queued for.
    pub fn broadcast(&mut self, message: &Message) -> usize {
        let frame = match encode_frame(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "failed to encode broadcast");
                return 0;
            }
        };
        let max_outbox_bytes = self.config.max_outbox_bytes;
        let mut sent = 0;
        for (&id, client) in &mut self.clients {
            if client.closed {
                continue;
            }
            client.queue(id, &frame, max_outbox_bytes);
            if !client.closed {
                sent += 1;
            }
        }
        sent
    }

    /// Returns `false` if the client is unknown or gone.
    pub fn send_to_client(&mut self, id: ClientId, message: &Message) -> bool {
        let Some(client) = self.clients.get_mut(&id).filter(|c| !c.closed) else {
            return false;
        };
        match encode_frame(message) {
            Ok(frame) => {
                client.queue(id, &frame, self.config.max_outbox_bytes);
                !client.closed
            }
            Err(err) => {
                warn!(client = id, error = %err, "failed to encode message");
                false
            }
        }
    }

    /// Drops the connection; the disconnect event follows on the next update.
    pub fn disconnect(&mut self, id: ClientId) -> bool {
        match self.clients.get_mut(&id) {
            Some(client) => {
                client.flush(id);
                client.closed = true;
                true
            }
            None => false,
        }
    }

    fn accept(&mut self) {
        let Some(listener) = &self.listener else {
            return;
        };
        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    if self.clients.len() >= self.config.max_clients {
                        warn!(%addr, "client limit reached, closing connection");
                        continue;
                    }
                    if let Err(err) = stream.set_nonblocking(true) {
                        warn!(%addr, error = %err, "failed to configure client socket");
                        continue;
                    }
                    let _ = stream.set_nodelay(true);
                    let id = self.next_id;
                    self.next_id = self.next_id.wrapping_add(1);
                    self.clients.insert(
                        id,
                        Client {
                            stream,
                            addr,
                            inbox: Vec::new(),
                            outbox: Vec::new(),
                            closed: false,
                        },
                    );
                    info!(client = id, %addr, "debug client connected");
                    emit(&mut self.subscribers, NetworkEvent::Connected(id));
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    break;
                }
            }
        }
    }

    fn receive(&mut self) {
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        let max_frame_size = self.config.max_frame_size;
        let mut events = Vec::new();
        for (&id, client) in &mut self.clients {
            if client.closed {
                continue;
            }
            loop {
                match client.stream.read(&mut buf) {
                    Ok(0) => {
                        client.closed = true;
                        break;
                    }
                    Ok(n) => {
                        client.inbox.extend_from_slice(&buf[..n]);
                        if n < buf.len() {
                            break;
                        }
                    }
                    Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => {
                        debug!(client = id, error = %err, "read failed");
                        client.closed = true;
                        break;
                    }
                }
            }

            let mut consumed = 0;
            loop {
                match decode_frame(&client.inbox[consumed..], max_frame_size) {
                    Ok(Some((message, used))) => {
                        consumed += used;
                        events.push(NetworkEvent::Message(id, message));
                    }
                    Ok(None) => break,
                    Err(err) => {
                        warn!(client = id, error = %err, "invalid frame, disconnecting");
                        client.closed = true;
                        break;
                    }
                }
            }
            client.inbox.drain(..consumed);
        }
        for event in events {
            emit(&mut self.subscribers, event);
        }
    }

    fn reap(&mut self) {
        let closed: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, c)| c.closed)
            .map(|(&id, _)| id)
            .collect();
        for id in closed {
            if let Some(client) = self.clients.remove(&id) {
                info!(client = id, addr = %client.addr, "debug client disconnected");
            }
            emit(&mut self.subscribers, NetworkEvent::Disconnected(id));
        }
    }
}

/// Sends to every live subscriber, forgetting the ones whose receiver is gone.
fn emit(subscribers: &mut Vec<Sender<NetworkEvent>>, event: NetworkEvent) {
    subscribers.retain(|tx| tx.send(event.clone()).is_ok());
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("local_addr", &self.local_addr())
            .field("clients", &self.client_ids())
            .finish()
    }
}
