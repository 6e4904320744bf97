//! Switch registration, receive loop, and keep-alive timer.

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use crate::codec::{Message, NeighborReport, MAX_DATAGRAM_SIZE};
use crate::error::RegistrationError;
use crate::logging::EventLog;
use crate::{TIMEOUT, UPDATE_DELAY};

use super::state::{NeighborState, SwitchState};

/// A running (or about-to-run) Switch: its socket, the Controller's
/// address, its own id, its shared neighbor state, and its event log.
pub struct Switch {
    socket: Arc<UdpSocket>,
    controller_addr: SocketAddr,
    self_id: i32,
    state: Arc<Mutex<SwitchState>>,
    log: Arc<EventLog>,
}

impl Switch {
    /// Bind an ephemeral port, send `REGISTER_REQUEST`, and block for the
    /// two expected replies: `REGISTER_RESPONSE` then the first
    /// `ROUTING_UPDATE`.
    pub fn register(
        self_id: i32,
        controller_host: &str,
        controller_port: u16,
        failed_neighbor: Option<i32>,
        log: Arc<EventLog>,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        let bound_port = socket.local_addr()?.port();
        let controller_addr: SocketAddr = format!("{controller_host}:{controller_port}")
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "bad controller address"))?;

        send_message(
            &socket,
            &Message::RegisterRequest {
                switch_id: self_id,
                announced_port: bound_port as i32,
            },
            controller_addr,
        )?;
        log.register_request_sent();

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, _) = socket.recv_from(&mut buf)?;
        let msg = Message::decode(&buf[..len])
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "malformed REGISTER_RESPONSE"))?;
        let neighbors = match msg {
            Message::RegisterResponse { neighbors } => neighbors,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    RegistrationError { got_tag: other.tag() },
                ));
            }
        };
        log.register_response_received();

        let now = Instant::now();
        let mut neighbor_map = HashMap::new();
        for nbr in neighbors {
            neighbor_map.insert(
                nbr.id,
                NeighborState {
                    host: nbr.host,
                    port: nbr.port as u16,
                    alive: true,
                    last_heard: now,
                },
            );
        }

        let (len, _) = socket.recv_from(&mut buf)?;
        if let Ok(Message::RoutingUpdate { routes }) = Message::decode(&buf[..len]) {
            log.routing_update_self(&routes);
        }

        let state = Arc::new(Mutex::new(SwitchState {
            neighbors: neighbor_map,
            failed_neighbor,
        }));

        Ok(Self {
            socket: Arc::new(socket),
            controller_addr,
            self_id,
            state,
            log,
        })
    }

    /// Run the keep-alive/topology-update timer loop on a background
    /// thread and the receive loop on the current thread.
    pub fn run(self) -> io::Result<()> {
        let socket = Arc::clone(&self.socket);
        let state = Arc::clone(&self.state);
        let log = Arc::clone(&self.log);
        let self_id = self.self_id;
        let controller_addr = self.controller_addr;
        thread::spawn(move || timer_loop(&socket, &state, &log, self_id, controller_addr));
        receive_loop(&self.socket, &self.state, &self.log, self.self_id, self.controller_addr)
    }
}

fn receive_loop(
    socket: &UdpSocket,
    state: &Mutex<SwitchState>,
    log: &EventLog,
    self_id: i32,
    controller_addr: SocketAddr,
) -> io::Result<()> {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (len, src) = socket.recv_from(&mut buf)?;
        let msg = match Message::decode(&buf[..len]) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed datagram");
                continue;
            }
        };
        match msg {
            Message::KeepAlive { switch_id } => {
                handle_keep_alive(socket, state, log, switch_id, src, self_id, controller_addr)?;
            }
            Message::RoutingUpdate { routes } => log.routing_update_self(&routes),
            Message::RegisterRequest { .. } | Message::RegisterResponse { .. } | Message::TopologyUpdate { .. } => {
                // Not directed at a Switch in steady state; ignore.
            }
        }
    }
}

fn handle_keep_alive(
    socket: &UdpSocket,
    state: &Mutex<SwitchState>,
    log: &EventLog,
    switch_id: i32,
    src: SocketAddr,
    self_id: i32,
    controller_addr: SocketAddr,
) -> io::Result<()> {
    let was_dead = {
        let mut guard = state.lock().unwrap();
        if guard.failed_neighbor == Some(switch_id) {
            return Ok(());
        }
        let Some(nbr) = guard.neighbors.get_mut(&switch_id) else {
            return Ok(());
        };
        nbr.last_heard = Instant::now();
        let was_dead = !nbr.alive;
        if was_dead {
            nbr.alive = true;
            nbr.host = src.ip().to_string();
            nbr.port = src.port();
        }
        was_dead
    };

    if was_dead {
        log.neighbor_alive(switch_id);
        send_topology_update(socket, state, self_id, controller_addr)?;
    }
    Ok(())
}

fn timer_loop(
    socket: &UdpSocket,
    state: &Mutex<SwitchState>,
    log: &EventLog,
    self_id: i32,
    controller_addr: SocketAddr,
) {
    loop {
        thread::sleep(UPDATE_DELAY);
        let now = Instant::now();

        let mut newly_dead = Vec::new();
        {
            let mut guard = state.lock().unwrap();
            for (&id, nbr) in guard.neighbors.iter_mut() {
                if nbr.alive && now.duration_since(nbr.last_heard) >= TIMEOUT {
                    nbr.alive = false;
                    newly_dead.push(id);
                }
            }
        }
        for id in newly_dead {
            log.neighbor_dead(id);
        }

        {
            let guard = state.lock().unwrap();
            for (&id, nbr) in guard.neighbors.iter() {
                if nbr.alive && guard.failed_neighbor != Some(id) {
                    if let Ok(addr) = neighbor_addr(nbr) {
                        let _ = send_message(socket, &Message::KeepAlive { switch_id: self_id }, addr);
                    }
                }
            }
        }

        if let Err(e) = send_topology_update(socket, state, self_id, controller_addr) {
            tracing::warn!(error = %e, "failed to send topology update");
        }
    }
}

fn send_topology_update(
    socket: &UdpSocket,
    state: &Mutex<SwitchState>,
    self_id: i32,
    controller_addr: SocketAddr,
) -> io::Result<()> {
    let neighbors: Vec<NeighborReport> = {
        let guard = state.lock().unwrap();
        guard
            .neighbors
            .iter()
            .map(|(&id, nbr)| NeighborReport {
                neighbor_id: id,
                alive: nbr.alive,
            })
            .collect()
    };
    send_message(
        socket,
        &Message::TopologyUpdate {
            switch_id: self_id,
            neighbors,
        },
        controller_addr,
    )
}

fn neighbor_addr(n: &NeighborState) -> io::Result<SocketAddr> {
    format!("{}:{}", n.host, n.port)
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("bad neighbor address {}:{}", n.host, n.port)))
}

fn send_message(socket: &UdpSocket, msg: &Message, addr: SocketAddr) -> io::Result<()> {
    socket.send_to(&msg.encode(), addr)?;
    Ok(())
}
