//! Controller bootstrap and steady-state loops.

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use crate::codec::{Message, NeighborAnnouncement, NeighborReport, RoutingEntry, MAX_DATAGRAM_SIZE};
use crate::engine::{self, CacheUpdate};
use crate::logging::EventLog;
use crate::topology::{self, SwitchId};
use crate::{TIMEOUT, UPDATE_DELAY};

use super::state::{ControllerState, SwitchState};

/// A running (or about-to-run) Controller: the bound socket, the shared
/// mutable state, and the event log it writes to.
pub struct Controller {
    socket: Arc<UdpSocket>,
    state: Arc<Mutex<ControllerState>>,
    log: Arc<EventLog>,
}

impl Controller {
    /// Bind, load the config, block until all `N` switches have registered,
    /// hand out their neighbor lists, and push the initial routing tables.
    pub fn bootstrap(port: u16, config_path: &Path, log: Arc<EventLog>) -> io::Result<Self> {
        let topology =
            topology::load_config(config_path).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        let n = topology.n;

        let mut registered: HashMap<SwitchId, SwitchState> = HashMap::new();
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        while registered.len() < n {
            let (len, src) = socket.recv_from(&mut buf)?;
            let msg = match Message::decode(&buf[..len]) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed datagram during bootstrap");
                    continue;
                }
            };
            if let Message::RegisterRequest { switch_id, announced_port } = msg {
                if switch_id < 0 || switch_id as usize >= n {
                    continue;
                }
                let sid = switch_id as usize;
                registered.insert(
                    sid,
                    SwitchState {
                        host: src.ip().to_string(),
                        port: announced_port as u16,
                    },
                );
                log.register_request(switch_id);
            }
        }

        let switches: Vec<SwitchState> = (0..n)
            .map(|i| registered.remove(&i).expect("every id 0..n registered before loop exits"))
            .collect();

        for sid in 0..n {
            let neighbors: Vec<NeighborAnnouncement> = topology
                .neighbors(sid)
                .iter()
                .map(|&(nid, _cost)| NeighborAnnouncement {
                    id: nid as i32,
                    alive: true,
                    port: switches[nid].port as i32,
                    host: switches[nid].host.clone(),
                })
                .collect();
            let addr = switch_addr(&switches[sid])?;
            send_message(&socket, &Message::RegisterResponse { neighbors }, addr)?;
            log.register_response(sid as i32);
        }

        let state = Arc::new(Mutex::new(ControllerState::new(topology, switches)));
        let socket = Arc::new(socket);
        recompute_and_broadcast(&socket, &state, &log)?;

        Ok(Self { socket, state, log })
    }

    /// Run the steady-state timer loop on a background thread and the
    /// receive loop on the current thread. Returns only on a socket error.
    pub fn run(self) -> io::Result<()> {
        let socket = Arc::clone(&self.socket);
        let state = Arc::clone(&self.state);
        let log = Arc::clone(&self.log);
        thread::spawn(move || timeout_loop(&socket, &state, &log));
        receive_loop(&self.socket, &self.state, &self.log)
    }
}

fn receive_loop(socket: &UdpSocket, state: &Mutex<ControllerState>, log: &EventLog) -> io::Result<()> {
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
            Message::TopologyUpdate { switch_id, neighbors } => {
                handle_topology_update(socket, state, log, switch_id, &neighbors, src)?;
            }
            Message::RegisterRequest { switch_id, announced_port } => {
                handle_reregistration(socket, state, log, switch_id, announced_port, src)?;
            }
            Message::RegisterResponse { .. } | Message::RoutingUpdate { .. } | Message::KeepAlive { .. } => {
                // Not directed at the Controller in steady state; ignore.
            }
        }
    }
}

fn handle_topology_update(
    socket: &UdpSocket,
    state: &Mutex<ControllerState>,
    log: &EventLog,
    switch_id: i32,
    neighbors: &[NeighborReport],
    src: SocketAddr,
) -> io::Result<()> {
    let n = state.lock().unwrap().topology.n;
    if switch_id < 0 || switch_id as usize >= n {
        return Ok(());
    }
    let s = switch_id as usize;

    {
        let mut guard = state.lock().unwrap();
        guard.last_heard[s] = Instant::now();
        guard.switches[s] = SwitchState {
            host: src.ip().to_string(),
            port: src.port(),
        };
        if !guard.alive[s] {
            guard.alive[s] = true;
            log.switch_alive(switch_id);
        }
        let old = guard.reported[s].clone();
        for nbr in neighbors {
            let nid = nbr.neighbor_id as usize;
            if nid >= n {
                continue;
            }
            if old[nid] && !nbr.alive {
                log.link_dead(switch_id, nbr.neighbor_id);
            }
            guard.reported[s][nid] = nbr.alive;
        }
    }

    recompute_and_broadcast(socket, state, log)
}

fn handle_reregistration(
    socket: &UdpSocket,
    state: &Mutex<ControllerState>,
    log: &EventLog,
    switch_id: i32,
    announced_port: i32,
    src: SocketAddr,
) -> io::Result<()> {
    let n = state.lock().unwrap().topology.n;
    if switch_id < 0 || switch_id as usize >= n {
        return Ok(());
    }
    let s = switch_id as usize;
    log.register_request(switch_id);

    let (neighbors, addr, was_dead) = {
        let mut guard = state.lock().unwrap();
        guard.switches[s] = SwitchState {
            host: src.ip().to_string(),
            port: announced_port as u16,
        };
        guard.reset_reported(s);
        let was_dead = !guard.alive[s];
        guard.alive[s] = true;
        guard.last_heard[s] = Instant::now();

        let declared: Vec<SwitchId> = guard.topology.neighbors(s).iter().map(|&(nid, _)| nid).collect();
        let neighbors: Vec<NeighborAnnouncement> = declared
            .iter()
            .map(|&nid| NeighborAnnouncement {
                id: nid as i32,
                alive: true,
                port: guard.switches[nid].port as i32,
                host: guard.switches[nid].host.clone(),
            })
            .collect();
        let addr = switch_addr(&guard.switches[s])?;
        (neighbors, addr, was_dead)
    };

    send_message(socket, &Message::RegisterResponse { neighbors }, addr)?;
    log.register_response(switch_id);
    if was_dead {
        log.switch_alive(switch_id);
    }

    recompute_and_broadcast(socket, state, log)?;

    // The restarted switch gets its table a second time, directly, even if
    // the cache reported no overall change.
    let (table, addr) = {
        let guard = state.lock().unwrap();
        let tables = engine::compute_routing_tables(&guard.effective_topology());
        let addr = switch_addr(&guard.switches[s])?;
        (tables[s].clone(), addr)
    };
    send_message(socket, &Message::RoutingUpdate { routes: table }, addr)
}

fn timeout_loop(socket: &UdpSocket, state: &Mutex<ControllerState>, log: &EventLog) {
    loop {
        thread::sleep(UPDATE_DELAY);
        let mut any_flipped = false;
        {
            let mut guard = state.lock().unwrap();
            let n = guard.topology.n;
            let now = Instant::now();
            for s in 0..n {
                if guard.alive[s] && now.duration_since(guard.last_heard[s]) >= TIMEOUT {
                    guard.alive[s] = false;
                    log.switch_dead(s as i32);
                    any_flipped = true;
                }
            }
        }
        if any_flipped {
            if let Err(e) = recompute_and_broadcast(socket, state, log) {
                tracing::warn!(error = %e, "failed to broadcast routing update after timeout");
            }
        }
    }
}

/// Derive the effective topology, ask the cache to update, and — only if it
/// changed — log the flat routing update and push each alive switch its
/// table. Sends happen inside the lock, so a concurrent recompute can't
/// interleave its own sends with this one's.
fn recompute_and_broadcast(socket: &UdpSocket, state: &Mutex<ControllerState>, log: &EventLog) -> io::Result<()> {
    let mut guard = state.lock().unwrap();
    let effective = guard.effective_topology();
    let tables = match guard.cache.update(&effective) {
        CacheUpdate::Unchanged => return Ok(()),
        CacheUpdate::Changed(tables) => tables,
    };

    let flat: Vec<RoutingEntry> = tables
        .iter()
        .enumerate()
        .filter(|(s, _)| guard.alive[*s])
        .flat_map(|(_, t)| t.iter().copied())
        .collect();
    log.routing_update_full(&flat);

    for s in 0..guard.topology.n {
        if !guard.alive[s] {
            continue;
        }
        let addr = switch_addr(&guard.switches[s])?;
        send_message(
            socket,
            &Message::RoutingUpdate {
                routes: tables[s].clone(),
            },
            addr,
        )?;
    }
    Ok(())
}

fn switch_addr(s: &SwitchState) -> io::Result<SocketAddr> {
    format!("{}:{}", s.host, s.port)
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("bad switch address {}:{}", s.host, s.port)))
}

fn send_message(socket: &UdpSocket, msg: &Message, addr: SocketAddr) -> io::Result<()> {
    socket.send_to(&msg.encode(), addr)?;
    Ok(())
}
