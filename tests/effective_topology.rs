//! Integration-level checks for the bidirectional-agreement rule: an edge
//! is only usable if each endpoint reports the other alive.

use routectl::engine::{compute_routing_tables, effective_topology, UNREACHABLE_DISTANCE, UNREACHABLE_HOP};
use routectl::topology::load_config_str;

#[test]
fn asymmetric_report_removes_the_edge_from_routing() {
    let topo = load_config_str("3\n0 1 1\n1 2 1\n").unwrap();
    // 0 reports 1 alive, but 1 reports 0 dead.
    let eff = effective_topology(&topo, |_| true, |a, b| !(a == 1 && b == 0));
    let tables = compute_routing_tables(&eff);
    let entry = tables[0].iter().find(|r| r.dest == 1).unwrap();
    assert_eq!((entry.next_hop, entry.distance), (UNREACHABLE_HOP, UNREACHABLE_DISTANCE));
    // Switch 2 is still reachable from 0 only by crossing the dropped edge.
    let entry = tables[0].iter().find(|r| r.dest == 2).unwrap();
    assert_eq!((entry.next_hop, entry.distance), (UNREACHABLE_HOP, UNREACHABLE_DISTANCE));
}

#[test]
fn four_node_line_end_to_end_distances() {
    let topo = load_config_str("4\n0 1 1\n1 2 1\n2 3 1\n").unwrap();
    let eff = effective_topology(&topo, |_| true, |_, _| true);
    let tables = compute_routing_tables(&eff);
    let entry = tables[0].iter().find(|r| r.dest == 3).unwrap();
    assert_eq!((entry.next_hop, entry.distance), (1, 3));
}

#[test]
fn dead_switch_splits_the_line_in_two() {
    let topo = load_config_str("4\n0 1 1\n1 2 1\n2 3 1\n").unwrap();
    let eff = effective_topology(&topo, |s| s != 2, |_, _| true);
    let tables = compute_routing_tables(&eff);
    let zero_to_three = tables[0].iter().find(|r| r.dest == 3).unwrap();
    let three_to_zero = tables[3].iter().find(|r| r.dest == 0).unwrap();
    assert_eq!((zero_to_three.next_hop, zero_to_three.distance), (UNREACHABLE_HOP, UNREACHABLE_DISTANCE));
    assert_eq!((three_to_zero.next_hop, three_to_zero.distance), (UNREACHABLE_HOP, UNREACHABLE_DISTANCE));
}
