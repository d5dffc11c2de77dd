//! Property-based invariant tests for the grouping manager.
//!
//! Random sequences of membership and tree operations are applied to a fresh
//! manager. After every step:
//!
//! 1. The DAG has no cycles.
//! 2. Child and parent maps mirror each other.
//! 3. A tree parent is always one of the DAG parents.
//! 4. Depth is the tree parent's depth plus one, or zero for tree roots.
//! 5. Tree children point back at their tree parent.

use proptest::prelude::*;
use svg_graph_editor::components::graph_editor::events::NoEvents;
use svg_graph_editor::components::graph_editor::{EventSource, Graph, GroupingManager, NodeId};

const IDS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

#[derive(Clone, Debug)]
enum Op {
	Add(usize, usize),
	Remove(usize, usize),
	JoinTree(usize, usize),
	MarkRoot(usize),
	Clear(usize),
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn id(i: usize) -> NodeId {
	NodeId::from(IDS[i])
}

fn index() -> impl Strategy<Value = usize> {
	0..IDS.len()
}

fn op_strategy() -> impl Strategy<Value = Op> {
	prop_oneof![
		4 => (index(), index()).prop_map(|(p, c)| Op::Add(p, c)),
		2 => (index(), index()).prop_map(|(p, c)| Op::Remove(p, c)),
		3 => (index(), index()).prop_map(|(c, p)| Op::JoinTree(c, p)),
		1 => index().prop_map(Op::MarkRoot),
		1 => index().prop_map(Op::Clear),
	]
}

fn apply(m: &mut GroupingManager, graph: &Graph, op: &Op) {
	let source = EventSource::Api;
	match *op {
		Op::Add(p, c) => {
			m.add_node_to_group(graph, &mut NoEvents, &id(p), &id(c), None, source);
		}
		Op::Remove(p, c) => {
			m.remove_node_from_group(graph, &mut NoEvents, &id(p), &id(c), source);
		}
		Op::JoinTree(c, p) => {
			m.join_tree_of_parent(&mut NoEvents, &id(c), &id(p), source);
		}
		Op::MarkRoot(i) => {
			m.mark_as_tree_root(&id(i));
		}
		Op::Clear(i) => m.clear_node(graph, &mut NoEvents, &id(i), source),
	}
}

fn check_invariants(m: &GroupingManager) -> Result<(), TestCaseError> {
	for i in 0..IDS.len() {
		let node = id(i);
		prop_assert!(!m.is_descendant_of(&node, &node), "{} reaches itself", node);

		let parents = m.get_parents_of(&node);
		for parent in &parents {
			prop_assert!(m.get_children_of(parent).contains(&node));
		}
		for child in m.get_children_of(&node) {
			prop_assert!(m.get_parents_of(&child).contains(&node));
		}

		match m.get_tree_parent_of(&node) {
			Some(tree_parent) => {
				prop_assert!(
					parents.contains(tree_parent),
					"tree parent {} of {} is not a group of it",
					tree_parent,
					node
				);
				prop_assert_eq!(m.get_tree_depth_of(&node), m.get_tree_depth_of(tree_parent) + 1);
			}
			None => prop_assert_eq!(m.get_tree_depth_of(&node), 0),
		}

		for child in m.get_tree_children_of(&node) {
			prop_assert_eq!(m.get_tree_parent_of(&child), Some(&node));
		}
	}
	Ok(())
}

// ═════════════════════════════════════════════════════════════════════════
// Invariants hold after every step of any operation sequence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
	#[test]
	fn grouping_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..60)) {
		let graph = Graph::new();
		let mut m = GroupingManager::new();
		for op in &ops {
			apply(&mut m, &graph, op);
			check_invariants(&m)?;
		}
	}
}

// ═════════════════════════════════════════════════════════════════════════
// Clearing a node leaves no trace of it in anyone else's memberships
// ═════════════════════════════════════════════════════════════════════════

proptest! {
	#[test]
	fn clearing_removes_every_membership(
		ops in prop::collection::vec(op_strategy(), 1..40),
		victim in index(),
	) {
		let graph = Graph::new();
		let mut m = GroupingManager::new();
		for op in &ops {
			apply(&mut m, &graph, op);
		}
		let victim = id(victim);
		m.clear_node(&graph, &mut NoEvents, &victim, EventSource::Api);

		prop_assert!(m.get_parents_of(&victim).is_empty());
		prop_assert!(m.get_children_of(&victim).is_empty());
		prop_assert!(m.get_tree_parent_of(&victim).is_none());
		for i in 0..IDS.len() {
			let other = id(i);
			prop_assert!(!m.get_children_of(&other).contains(&victim));
			prop_assert!(!m.get_parents_of(&other).contains(&victim));
			prop_assert_ne!(m.get_tree_parent_of(&other), Some(&victim));
		}
		check_invariants(&m)?;
	}
}
