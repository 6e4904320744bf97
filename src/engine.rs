//! All-pairs shortest-path next-hop engine and its routing cache.
//!
//! Single-source Dijkstra from every switch, run over the *effective*
//! topology. The priority queue is keyed by `(distance, node_id)`;
//! because relaxation only replaces a predecessor on a *strictly* shorter
//! path, the first-discovered predecessor for a tied-distance node survives,
//! which is exactly what makes the emitted next hop deterministic and
//! lowest-id (checked by hand against the four-node-cycle case below).

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::codec::RoutingEntry;
use crate::topology::{SwitchId, Topology};

/// Sentinel values emitted for a destination with no usable path.
pub const UNREACHABLE_DISTANCE: i32 = 9999;
pub const UNREACHABLE_HOP: i32 = -1;

/// The subset of the declared topology currently usable for routing: both
/// endpoints alive, and each reports the other alive. A switch with no
/// surviving edges is simply isolated here — the engine doesn't need a
/// separate liveness flag, dead switches fall out of reachability on their
/// own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveTopology {
    pub n: usize,
    pub adjacency: Vec<Vec<(SwitchId, u32)>>,
}

/// Structural cache key: the canonical (`min < max`) sorted edge list, so
/// two topologies with the same edges and costs compare equal regardless of
/// discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopologyKey(Vec<(SwitchId, SwitchId, u32)>);

/// Derive the effective topology from the declared one plus the two
/// liveness predicates. Both predicates are plain closures so this module
/// stays independent of how the controller stores alive flags and
/// reported-neighbor vectors.
pub fn effective_topology(
    declared: &Topology,
    alive: impl Fn(SwitchId) -> bool,
    reported_alive: impl Fn(SwitchId, SwitchId) -> bool,
) -> EffectiveTopology {
    let mut adjacency = vec![Vec::new(); declared.n];
    for s in 0..declared.n {
        for &(t, cost) in declared.neighbors(s) {
            if alive(s) && alive(t) && reported_alive(s, t) && reported_alive(t, s) {
                adjacency[s].push((t, cost));
            }
        }
    }
    EffectiveTopology {
        n: declared.n,
        adjacency,
    }
}

impl EffectiveTopology {
    pub fn cache_key(&self) -> TopologyKey {
        let mut edges = Vec::new();
        for s in 0..self.n {
            for &(t, cost) in &self.adjacency[s] {
                if s < t {
                    edges.push((s, t, cost));
                }
            }
        }
        edges.sort_unstable();
        TopologyKey(edges)
    }
}

/// Run Dijkstra from every switch and build its full routing table.
pub fn compute_routing_tables(effective: &EffectiveTopology) -> Vec<Vec<RoutingEntry>> {
    (0..effective.n)
        .map(|source| routing_table_from(effective, source))
        .collect()
}

fn routing_table_from(effective: &EffectiveTopology, source: SwitchId) -> Vec<RoutingEntry> {
    let (dist, prev) = dijkstra(effective, source);
    (0..effective.n)
        .map(|dest| {
            let (next_hop, distance) = next_hop(&prev, &dist, source, dest);
            RoutingEntry {
                src: source as i32,
                dest: dest as i32,
                next_hop,
                distance,
            }
        })
        .collect()
}

fn dijkstra(effective: &EffectiveTopology, source: SwitchId) -> (Vec<i64>, Vec<Option<SwitchId>>) {
    let n = effective.n;
    let mut dist = vec![i64::MAX; n];
    let mut prev: Vec<Option<SwitchId>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    dist[source] = 0;
    heap.push(Reverse((0i64, source)));

    while let Some(Reverse((d, u))) = heap.pop() {
        if d > dist[u] {
            continue; // stale entry, a shorter path to u was already found
        }
        for &(v, cost) in &effective.adjacency[u] {
            let nd = d + cost as i64;
            if nd < dist[v] {
                dist[v] = nd;
                prev[v] = Some(u);
                heap.push(Reverse((nd, v)));
            }
        }
    }

    (dist, prev)
}

/// Walk the predecessor chain from `dest` back to the edge leaving `source`.
fn next_hop(
    prev: &[Option<SwitchId>],
    dist: &[i64],
    source: SwitchId,
    dest: SwitchId,
) -> (i32, i32) {
    if dest == source {
        return (source as i32, 0);
    }
    if dist[dest] == i64::MAX {
        return (UNREACHABLE_HOP, UNREACHABLE_DISTANCE);
    }
    let mut cur = dest;
    loop {
        match prev[cur] {
            Some(p) if p == source => return (cur as i32, dist[dest] as i32),
            Some(p) => cur = p,
            None => return (UNREACHABLE_HOP, UNREACHABLE_DISTANCE),
        }
    }
}

/// Outcome of asking the [`RoutingCache`] to update.
pub enum CacheUpdate {
    /// The effective topology changed (or this is the first computation);
    /// here are the freshly computed per-switch tables.
    Changed(Arc<Vec<Vec<RoutingEntry>>>),
    /// Structurally identical to the last computation — nothing to log or
    /// broadcast.
    Unchanged,
}

/// Caches the most recently computed routing tables, keyed by the
/// structural identity of the effective topology that produced them. An
/// `lru::LruCache` is a natural fit here: the key space (distinct effective
/// topologies seen over a process's lifetime) is small and bounded, and
/// eviction keeps memory flat even if the process runs for a long time.
pub struct RoutingCache {
    cache: LruCache<TopologyKey, Arc<Vec<Vec<RoutingEntry>>>>,
    last_key: Option<TopologyKey>,
}

impl RoutingCache {
    pub fn new() -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(4).unwrap()),
            last_key: None,
        }
    }

    /// Recompute if `effective` differs structurally from the last update;
    /// otherwise report [`CacheUpdate::Unchanged`] without touching the
    /// underlying Dijkstra engine at all.
    pub fn update(&mut self, effective: &EffectiveTopology) -> CacheUpdate {
        let key = effective.cache_key();
        if self.last_key.as_ref() == Some(&key) {
            return CacheUpdate::Unchanged;
        }
        if let Some(tables) = self.cache.get(&key) {
            self.last_key = Some(key);
            return CacheUpdate::Changed(Arc::clone(tables));
        }
        let tables = Arc::new(compute_routing_tables(effective));
        self.cache.put(key.clone(), Arc::clone(&tables));
        self.last_key = Some(key);
        CacheUpdate::Changed(tables)
    }
}

impl Default for RoutingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::load_config_str;

    fn effective_all_alive(topo: &Topology) -> EffectiveTopology {
        effective_topology(topo, |_| true, |_, _| true)
    }

    #[test]
    fn four_node_line_reaches_across() {
        let topo = load_config_str("4\n0 1 1\n1 2 1\n2 3 1\n").unwrap();
        let eff = effective_all_alive(&topo);
        let tables = compute_routing_tables(&eff);
        let entry = tables[0]
            .iter()
            .find(|r| r.dest == 3)
            .unwrap();
        assert_eq!((entry.next_hop, entry.distance), (1, 3));
    }

    #[test]
    fn self_route_is_zero_distance() {
        let topo = load_config_str("3\n0 1 1\n1 2 1\n").unwrap();
        let eff = effective_all_alive(&topo);
        let tables = compute_routing_tables(&eff);
        for (s, table) in tables.iter().enumerate() {
            let self_entry = table.iter().find(|r| r.dest as usize == s).unwrap();
            assert_eq!((self_entry.next_hop, self_entry.distance), (s as i32, 0));
        }
    }

    #[test]
    fn unreachable_destination_is_sentinel() {
        let topo = load_config_str("3\n0 1 1\n").unwrap(); // 2 is isolated
        let eff = effective_all_alive(&topo);
        let tables = compute_routing_tables(&eff);
        let entry = tables[0].iter().find(|r| r.dest == 2).unwrap();
        assert_eq!((entry.next_hop, entry.distance), (UNREACHABLE_HOP, UNREACHABLE_DISTANCE));
    }

    #[test]
    fn triangle_with_asymmetric_costs_prefers_the_cheap_path() {
        let topo = load_config_str("3\n0 1 1\n1 2 1\n0 2 5\n").unwrap();
        let eff = effective_all_alive(&topo);
        let tables = compute_routing_tables(&eff);
        let entry = tables[0].iter().find(|r| r.dest == 2).unwrap();
        assert_eq!((entry.next_hop, entry.distance), (1, 2));
    }

    #[test]
    fn four_cycle_tie_break_prefers_lower_id_next_hop() {
        let topo = load_config_str("4\n0 1 1\n1 2 1\n2 3 1\n3 0 1\n").unwrap();
        let eff = effective_all_alive(&topo);
        let tables = compute_routing_tables(&eff);
        let entry = tables[0].iter().find(|r| r.dest == 2).unwrap();
        assert_eq!(entry.next_hop, 1);
    }

    #[test]
    fn dead_switch_is_isolated_in_the_effective_topology() {
        let topo = load_config_str("4\n0 1 1\n1 2 1\n2 3 1\n").unwrap();
        let eff = effective_topology(&topo, |s| s != 2, |_, _| true);
        let tables = compute_routing_tables(&eff);
        let entry = tables[0].iter().find(|r| r.dest == 3).unwrap();
        assert_eq!((entry.next_hop, entry.distance), (UNREACHABLE_HOP, UNREACHABLE_DISTANCE));
    }

    #[test]
    fn bidirectional_disagreement_drops_the_edge() {
        let topo = load_config_str("2\n0 1 1\n").unwrap();
        // 0 reports 1 alive, but 1 reports 0 dead.
        let eff = effective_topology(&topo, |_| true, |a, b| !(a == 1 && b == 0));
        assert!(eff.adjacency[0].is_empty());
        assert!(eff.adjacency[1].is_empty());
    }

    #[test]
    fn cache_reports_unchanged_for_structurally_equal_topology() {
        let topo = load_config_str("3\n0 1 1\n1 2 1\n").unwrap();
        let eff = effective_all_alive(&topo);
        let mut cache = RoutingCache::new();
        assert!(matches!(cache.update(&eff), CacheUpdate::Changed(_)));
        assert!(matches!(cache.update(&eff), CacheUpdate::Unchanged));
        // A structurally-rebuilt-but-equal topology still hits the cache.
        let eff2 = effective_all_alive(&topo);
        assert!(matches!(cache.update(&eff2), CacheUpdate::Unchanged));
    }

    #[test]
    fn cache_reports_changed_when_topology_differs() {
        let topo = load_config_str("3\n0 1 1\n1 2 1\n").unwrap();
        let mut cache = RoutingCache::new();
        let eff_full = effective_all_alive(&topo);
        assert!(matches!(cache.update(&eff_full), CacheUpdate::Changed(_)));
        let eff_partial = effective_topology(&topo, |s| s != 2, |_, _| true);
        assert!(matches!(cache.update(&eff_partial), CacheUpdate::Changed(_)));
    }
}
