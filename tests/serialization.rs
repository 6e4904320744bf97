//! Snapshot of a deterministic routing table dump.

use routectl::engine::{compute_routing_tables, effective_topology};
use routectl::topology::load_config_str;

#[test]
fn four_cycle_routing_table_snapshot() {
    let topo = load_config_str("4\n0 1 1\n1 2 1\n2 3 1\n3 0 1\n").unwrap();
    let eff = effective_topology(&topo, |_| true, |_, _| true);
    let tables = compute_routing_tables(&eff);
    let dump: Vec<String> = tables[0]
        .iter()
        .map(|r| format!("{},{}:{},{}", r.src, r.dest, r.next_hop, r.distance))
        .collect();
    insta::assert_yaml_snapshot!(dump);
}

/// `RoutingEntry`'s derived `Serialize` also has to serve plain JSON
/// consumers (a debugging dump, a future HTTP introspection endpoint), not
/// just the YAML snapshot format above.
#[test]
fn routing_table_serializes_to_json() {
    let topo = load_config_str("3\n0 1 1\n1 2 1\n").unwrap();
    let eff = effective_topology(&topo, |_| true, |_, _| true);
    let tables = compute_routing_tables(&eff);

    let json = serde_json::to_string(&tables[0]).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["src"], 0);
}
