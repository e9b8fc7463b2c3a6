use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    str::FromStr,
    sync::Arc,
};

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    connection::{self, ReceiveSocket, SendSocket},
    error::Error,
    events::EventSenders,
    neighbor::Neighbor,
    packer::Packer,
    reconnect,
    TransportEvents,
};

/// The transport-level state machine: `Running` holds the two background
/// tasks that only exist while armed — the inbound accept loop and the
/// reconnection timer.
pub(crate) enum RunState {
    Idle,
    Running { listener_task: JoinHandle<()>, reconnect_task: JoinHandle<()> },
}

impl RunState {
    pub(crate) fn is_running(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }
}

/// Everything the one logical mutex protects. Mutated only while the lock
/// is held; no `.await` ever happens while holding it.
pub(crate) struct State {
    pub(crate) run: RunState,
    pub(crate) neighbors: Vec<Neighbor>,
    pub(crate) send_sockets: HashMap<Neighbor, SendSocket>,
    pub(crate) receive_sockets: HashMap<Neighbor, ReceiveSocket>,
    pub(crate) needs_reconnect: HashSet<Neighbor>,
}

impl State {
    fn new() -> Self {
        Self {
            run: RunState::Idle,
            neighbors: Vec::new(),
            send_sockets: HashMap::new(),
            receive_sockets: HashMap::new(),
            needs_reconnect: HashSet::new(),
        }
    }
}

pub(crate) struct Shared<P: Packer> {
    pub(crate) config: Config,
    pub(crate) packer: Arc<P>,
    pub(crate) events: EventSenders<P::Data>,
    pub(crate) state: RwLock<State>,
}

/// A TCP transport between known neighbors.
///
/// Cheap to `Clone` (an `Arc` bump) so the listener task, the reconnection
/// loop, and per-connection tasks can all hold a handle back to shared
/// state.
pub struct Transport<P: Packer> {
    pub(crate) shared: Arc<Shared<P>>,
}

impl<P: Packer> Clone for Transport<P> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<P: Packer> Transport<P> {
    /// Construct a transport and its event subscription handle. The codec
    /// is supplied by value, never reached for as global state.
    pub fn new(config: Config, packer: P) -> (Self, TransportEvents<P::Data>) {
        let (events, subscription) = EventSenders::new();
        let shared = Arc::new(Shared { config, packer: Arc::new(packer), events, state: RwLock::new(State::new()) });
        (Self { shared }, subscription)
    }

    /// True iff `neighbor` is a neighbor this transport's kind can dial —
    /// always true here, since this crate implements exactly one transport
    /// kind (TCP). A host that juggles multiple transport kinds behind a
    /// common neighbor type would use this to route `send`/`connect` calls.
    pub fn supports(&self, _neighbor: &Neighbor) -> bool {
        true
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.read().run.is_running()
    }

    pub fn is_connected_to(&self, neighbor: &Neighbor) -> bool {
        self.shared.state.read().send_sockets.contains_key(neighbor)
    }

    /// First admitted neighbor whose `matches(addr)` is true, in insertion
    /// order; `None` if there is no such neighbor.
    pub fn get_neighbor(&self, addr: &str) -> Option<Neighbor> {
        self.shared.state.read().neighbors.iter().find(|n| n.matches(addr)).cloned()
    }

    /// Admit `neighbor`. If the transport is running, a connect attempt is
    /// spawned in the background and `add_neighbor` resolves immediately —
    /// the attempt's outcome only shows up later, in `is_connected_to` or
    /// `needs_reconnect`. A connect failure is swallowed into
    /// `needs_reconnect` rather than returned.
    pub async fn add_neighbor(&self, neighbor: Neighbor) -> Result<Neighbor, Error> {
        {
            let mut state = self.shared.state.write();
            if state.neighbors.contains(&neighbor) {
                return Err(Error::AlreadyExists);
            }
            state.neighbors.push(neighbor.clone());
        }

        if self.is_running() {
            let transport = self.clone();
            let target = neighbor.clone();
            tokio::spawn(async move { transport.connect_and_register(&target).await });
        }
        Ok(neighbor)
    }

    /// Remove `neighbor` and tear down whichever sockets it has open.
    pub async fn remove_neighbor(&self, neighbor: &Neighbor) -> Result<(), Error> {
        let (receive_socket, send_socket) = {
            let mut state = self.shared.state.write();
            let position = state.neighbors.iter().position(|n| n == neighbor).ok_or(Error::NotFound)?;
            state.neighbors.remove(position);
            state.needs_reconnect.remove(neighbor);
            (state.receive_sockets.remove(neighbor), state.send_sockets.remove(neighbor))
        };
        if let Some(socket) = receive_socket {
            socket.close().await;
        }
        if let Some(socket) = send_socket {
            socket.close().await;
        }
        info!("removed neighbor {neighbor}");
        Ok(())
    }

    /// Bind the listener, connect to every currently-known neighbor, and
    /// arm the reconnection loop.
    pub async fn run(&self) -> Result<(), Error> {
        if self.is_running() {
            return Err(Error::AlreadyRunning);
        }

        let bind_addr = format!("{}:{}", self.shared.config.host, self.shared.config.port);
        let listener = TcpListener::bind(&bind_addr).await.map_err(Error::ListenFailed)?;
        info!("listening on {bind_addr}");

        let listener_task = spawn_listener_loop(self.clone(), listener);

        let initial_neighbors = self.shared.state.read().neighbors.clone();
        for neighbor in &initial_neighbors {
            self.connect_and_register(neighbor).await;
        }

        let reconnect_task = reconnect::spawn(self.shared.clone());

        self.shared.state.write().run = RunState::Running { listener_task, reconnect_task };
        Ok(())
    }

    /// Disconnect every send socket, stop accepting, disarm reconnection,
    /// and return to `Idle`. Receive sockets are not explicitly closed —
    /// they end when their peers close — unless the caller already closed
    /// them via `remove_neighbor`.
    pub async fn shutdown(&self) -> Result<(), Error> {
        let (listener_task, reconnect_task, send_sockets) = {
            let mut state = self.shared.state.write();
            let RunState::Running { listener_task, reconnect_task } = std::mem::replace(&mut state.run, RunState::Idle)
            else {
                state.run = RunState::Idle;
                return Err(Error::NotRunning);
            };
            state.needs_reconnect.clear();
            let send_sockets = state.send_sockets.drain().map(|(_, socket)| socket).collect::<Vec<_>>();
            (listener_task, reconnect_task, send_sockets)
        };

        listener_task.abort();
        reconnect_task.abort();

        futures_util::future::join_all(send_sockets.into_iter().map(SendSocket::close)).await;

        info!("shut down");
        Ok(())
    }

    /// Write `data` to `neighbor`'s send socket, resolving once the write
    /// is flushed to the OS.
    pub async fn send(&self, data: &P::Data, neighbor: &Neighbor) -> Result<(), Error> {
        if !neighbor.gateway_can_send_to() {
            return Err(Error::SendForbidden);
        }
        let payload: Bytes = self.shared.packer.pack(data);

        let (ack_tx, ack_rx) = oneshot::channel();
        let submitted = {
            let state = self.shared.state.read();
            match state.send_sockets.get(neighbor) {
                Some(socket) => socket.submit(payload, ack_tx),
                None => return Err(Error::NotConnected),
            }
        };
        if !submitted {
            return Err(Error::NotConnected);
        }
        ack_rx.await.map_err(|_| Error::NotConnected)?
    }

    /// Open a connection, register it, then write the handshake. On
    /// failure, queue the neighbor for reconnection instead of propagating
    /// the error — callers of `add_neighbor`/`run` never see a
    /// `ConnectFailed`.
    async fn connect_and_register(&self, neighbor: &Neighbor) {
        match self.try_connect(neighbor).await {
            Ok(()) => {
                self.shared.state.write().needs_reconnect.remove(neighbor);
            }
            Err(err) => {
                debug!("connect to {neighbor} failed, queued for reconnection: {err}");
                self.shared.state.write().needs_reconnect.insert(neighbor.clone());
            }
        }
    }

    pub(crate) async fn try_connect(&self, neighbor: &Neighbor) -> Result<(), Error> {
        let addr = resolve(neighbor)?;
        let local_port = self.shared.config.port;
        let pending = connection::send::connect(addr, local_port).await?;

        let mut state = self.shared.state.write();
        if !state.run.is_running() {
            // A concurrent shutdown raced us; drop the socket we just
            // opened instead of leaking it into a table nobody will clean
            // up.
            drop(state);
            pending.close().await;
            return Err(Error::ConnectFailed("closed".to_owned()));
        }

        // Arm the close-detection task while still holding the lock: its
        // callback takes the same lock to remove this entry, so it cannot
        // run until the insert below is visible, and the table can never
        // hold a handle for an already-dead connection.
        let weak_neighbor = neighbor.clone();
        let shared = self.shared.clone();
        let socket = pending.arm(move || {
            shared.state.write().send_sockets.remove(&weak_neighbor);
            warn!("send connection to {weak_neighbor} closed unexpectedly");
        });
        state.send_sockets.insert(neighbor.clone(), socket);
        debug!("connected to {neighbor}");
        Ok(())
    }

    async fn accept(&self, mut stream: tokio::net::TcpStream, peer_addr: SocketAddr) {
        let handshake = match connection::receive::read_handshake(&mut stream).await {
            Ok(handshake) => handshake,
            Err(err) => {
                debug!("dropping inbound connection from {peer_addr}, handshake failed: {err}");
                return;
            }
        };

        let remote_host = peer_addr.ip().to_string();
        let neighbor = match self.get_neighbor(&remote_host) {
            Some(neighbor) => neighbor,
            None if self.shared.config.receive_unknown_neighbor => {
                let synthesized = Neighbor::new(remote_host, handshake.remote_port, true, true);
                match self.add_neighbor(synthesized).await {
                    Ok(handle) => {
                        info!("admitted {handle} as a previously-unknown neighbor");
                        self.shared.events.emit_neighbor(handle.clone());
                        handle
                    }
                    Err(_) => return,
                }
            }
            None => return,
        };

        if !neighbor.gateway_can_receive_from() {
            return;
        }

        // Insert before spawning lets the lock serialize against the
        // receive loop's own `on_close`, same reasoning as `try_connect`.
        let mut state = self.shared.state.write();
        let shared = self.shared.clone();
        let weak_neighbor = neighbor.clone();
        let task = connection::spawn_receive_loop(
            stream,
            self.shared.packer.clone(),
            handshake.leftover,
            neighbor.clone(),
            peer_addr,
            self.shared.events.clone(),
            move || {
                shared.state.write().receive_sockets.remove(&weak_neighbor);
            },
        );
        state.receive_sockets.insert(neighbor.clone(), ReceiveSocket::new(task));
        drop(state);
        info!("accepted connection from {peer_addr} as {neighbor}");
    }
}

fn resolve(neighbor: &Neighbor) -> Result<SocketAddr, Error> {
    let candidate = format!("{}:{}", neighbor.host(), neighbor.port());
    SocketAddr::from_str(&candidate).map_err(|err| Error::ConnectFailed(err.to_string()))
}

fn spawn_listener_loop<P: Packer>(transport: Transport<P>, listener: TcpListener) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let transport = transport.clone();
                    tokio::spawn(async move { transport.accept(stream, peer_addr).await });
                }
                Err(err) => transport.shared.events.emit_error(Error::SocketError(err)),
            }
        }
    })
}

