//! Controller-side mutable state.

use std::time::Instant;

use crate::engine::{self, EffectiveTopology, RoutingCache};
use crate::topology::{SwitchId, Topology};

/// A switch's last-known `{host, port}`, refreshed on every
/// `REGISTER_REQUEST` and every `TOPOLOGY_UPDATE` so a restarted switch's
/// new ephemeral port is picked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchState {
    pub host: String,
    pub port: u16,
}

/// Everything the Controller driver mutates under its single coarse lock:
/// the declared topology (read-only after bootstrap), per-switch
/// registration, liveness, last-heard time, reported-neighbor vectors, and
/// the routing cache.
pub struct ControllerState {
    pub topology: Topology,
    pub switches: Vec<SwitchState>,
    pub alive: Vec<bool>,
    pub last_heard: Vec<Instant>,
    /// `reported[s][n]` — does switch `s`'s most recent `TOPOLOGY_UPDATE`
    /// mark neighbor `n` alive? Defaults to `true` for every declared
    /// neighbor until overridden by that switch's own reports.
    pub reported: Vec<Vec<bool>>,
    pub cache: RoutingCache,
}

impl ControllerState {
    pub fn new(topology: Topology, switches: Vec<SwitchState>) -> Self {
        let n = topology.n;
        let now = Instant::now();
        Self {
            alive: vec![true; n],
            last_heard: vec![now; n],
            reported: vec![vec![true; n]; n],
            cache: RoutingCache::new(),
            switches,
            topology,
        }
    }

    /// Reset `s`'s reported-neighbor vector back to all-true for its
    /// declared neighbors, used on re-registration.
    pub fn reset_reported(&mut self, s: SwitchId) {
        self.reported[s] = vec![true; self.topology.n];
    }

    pub fn effective_topology(&self) -> EffectiveTopology {
        engine::effective_topology(
            &self.topology,
            |s| self.alive[s],
            |s, n| self.reported[s][n],
        )
    }
}
