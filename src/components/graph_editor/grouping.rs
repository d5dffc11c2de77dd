//! Group membership as a DAG plus a single-parent tree projection.
//!
//! The DAG (`children_of`/`parents_of`) may give a node several parents, but
//! only the tree parent drives movement capture, move hooks and fixed child
//! positions. Every mutating method keeps these invariants:
//!
//! - the DAG has no directed cycle;
//! - a node's tree parent is one of its DAG parents;
//! - tree depth is `0` for roots and `parent + 1` otherwise.
//!
//! Membership is keyed by id only; ids need not exist in the [`Graph`].

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use super::behaviour::{
	ChildPosition, EdgeContext, GroupBehaviour, GroupHookKind, HookContext, decide, run_hook,
};
use super::events::{EventSink, EventSource, GraphEvent};
use super::types::{Edge, Graph, NodeId, Point};

/// Result of a membership change request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Membership {
	/// Structurally invalid; nothing changed.
	Rejected,
	Changed { full_render: bool },
}

impl Membership {
	pub fn is_changed(self) -> bool {
		matches!(self, Membership::Changed { .. })
	}

	pub fn needs_full_render(self) -> bool {
		matches!(self, Membership::Changed { full_render: true })
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EdgeEnd {
	Outgoing,
	Incoming,
}

#[derive(Debug, Default)]
pub struct GroupingManager {
	children_of: HashMap<NodeId, HashSet<NodeId>>,
	parents_of: HashMap<NodeId, HashSet<NodeId>>,
	tree_parent_of: HashMap<NodeId, NodeId>,
	tree_children_of: HashMap<NodeId, HashSet<NodeId>>,
	tree_root_of: HashMap<NodeId, NodeId>,
	tree_depth: HashMap<NodeId, usize>,
	behaviour_of: HashMap<NodeId, GroupBehaviour>,
}

fn link(map: &mut HashMap<NodeId, HashSet<NodeId>>, from: &NodeId, to: &NodeId) {
	map.entry(from.clone()).or_default().insert(to.clone());
}

fn unlink(map: &mut HashMap<NodeId, HashSet<NodeId>>, from: &NodeId, to: &NodeId) -> bool {
	let Some(set) = map.get_mut(from) else {
		return false;
	};
	let removed = set.remove(to);
	if set.is_empty() {
		map.remove(from);
	}
	removed
}

impl GroupingManager {
	pub fn new() -> Self {
		Self::default()
	}

	// --- queries ---

	pub fn get_children_of(&self, id: &NodeId) -> HashSet<NodeId> {
		self.children_of.get(id).cloned().unwrap_or_default()
	}

	/// Transitive closure over DAG children, excluding `id` itself.
	pub fn get_all_children_of(&self, id: &NodeId) -> HashSet<NodeId> {
		let mut seen = HashSet::new();
		let mut stack: Vec<&NodeId> = self.children_of.get(id).into_iter().flatten().collect();
		while let Some(next) = stack.pop() {
			if seen.insert(next.clone())
				&& let Some(children) = self.children_of.get(next)
			{
				stack.extend(children);
			}
		}
		seen
	}

	pub fn get_parents_of(&self, id: &NodeId) -> HashSet<NodeId> {
		self.parents_of.get(id).cloned().unwrap_or_default()
	}

	pub fn get_tree_parent_of(&self, id: &NodeId) -> Option<&NodeId> {
		self.tree_parent_of.get(id)
	}

	pub fn get_tree_children_of(&self, id: &NodeId) -> HashSet<NodeId> {
		self.tree_children_of.get(id).cloned().unwrap_or_default()
	}

	pub fn get_tree_root_of(&self, id: &NodeId) -> Option<&NodeId> {
		self.tree_root_of.get(id)
	}

	/// Depth in the tree projection; ids outside any tree read as `0`.
	pub fn get_tree_depth_of(&self, id: &NodeId) -> usize {
		self.tree_depth.get(id).copied().unwrap_or(0)
	}

	/// True when `id` is reachable from `ancestor` over DAG child edges.
	pub fn is_descendant_of(&self, id: &NodeId, ancestor: &NodeId) -> bool {
		let mut seen: HashSet<&NodeId> = HashSet::new();
		let mut stack: Vec<&NodeId> = vec![ancestor];
		while let Some(next) = stack.pop() {
			let Some(children) = self.children_of.get(next) else {
				continue;
			};
			for child in children {
				if child == id {
					return true;
				}
				if seen.insert(child) {
					stack.push(child);
				}
			}
		}
		false
	}

	/// Adding `parent -> child` would close a cycle.
	pub fn would_create_cycle(&self, parent: &NodeId, child: &NodeId) -> bool {
		parent == child || self.is_descendant_of(parent, child)
	}

	// --- behaviours ---

	/// Configured behaviour, or the inert default.
	pub fn get_group_behaviour_of(&self, id: &NodeId) -> GroupBehaviour {
		self.behaviour_of.get(id).cloned().unwrap_or_default()
	}

	pub fn behaviour(&self, id: &NodeId) -> Option<&GroupBehaviour> {
		self.behaviour_of.get(id)
	}

	/// Replaces the behaviour wholesale; nothing from the old one is kept.
	pub fn set_group_behaviour_of(&mut self, id: impl Into<NodeId>, behaviour: GroupBehaviour) {
		self.behaviour_of.insert(id.into(), behaviour);
	}

	/// Runs a lifecycle hook of `group` for `child`. Returns whether the hook
	/// asked for a full re-render.
	pub fn run_group_hook(
		&self,
		graph: &Graph,
		group: &NodeId,
		child: &NodeId,
		kind: GroupHookKind,
	) -> bool {
		let Some(behaviour) = self.behaviour_of.get(group) else {
			return false;
		};
		run_hook(behaviour.hook(kind), &HookContext::new(graph, group, child), kind)
	}

	pub fn fixed_position_of(&self, group: &NodeId, child: &NodeId) -> Option<&ChildPosition> {
		self.behaviour_of.get(group)?.child_node_positions.get(child)
	}

	// --- tree projection ---

	/// Makes `id` the root of its own tree. No-op returning `false` while it
	/// still has a tree parent.
	pub fn mark_as_tree_root(&mut self, id: &NodeId) -> bool {
		if self.tree_parent_of.contains_key(id) {
			debug!("{id} still has a tree parent, not marking it as tree root");
			return false;
		}
		self.tree_root_of.insert(id.clone(), id.clone());
		self.tree_depth.insert(id.clone(), 0);
		true
	}

	/// Moves `child` (with its tree descendants) under `parent` in the tree
	/// projection. `parent` must already be a DAG parent of `child`.
	pub fn join_tree_of_parent(
		&mut self,
		events: &mut dyn EventSink,
		child: &NodeId,
		parent: &NodeId,
		source: EventSource,
	) -> bool {
		if !self
			.parents_of
			.get(child)
			.is_some_and(|parents| parents.contains(parent))
		{
			debug!("{parent} is not a group of {child}, refusing tree join");
			return false;
		}
		let old_parent = self.tree_parent_of.get(child).cloned();
		if old_parent.as_ref() == Some(parent) {
			return true;
		}
		if !self.tree_root_of.contains_key(parent) {
			self.mark_as_tree_root(parent);
		}
		if let Some(old) = &old_parent {
			unlink(&mut self.tree_children_of, old, child);
		}
		self.tree_parent_of.insert(child.clone(), parent.clone());
		link(&mut self.tree_children_of, parent, child);

		let root = self
			.tree_root_of
			.get(parent)
			.cloned()
			.unwrap_or_else(|| parent.clone());
		let depth = self.get_tree_depth_of(parent) + 1;
		self.update_subtree(events, child, &root, depth, source);
		events.emit(GraphEvent::TreeChanged {
			node: child.clone(),
			old_parent,
			new_parent: Some(parent.clone()),
			source,
		});
		true
	}

	/// Detaches `child` from its tree parent, making it the root of its own
	/// tree.
	fn leave_tree(&mut self, events: &mut dyn EventSink, child: &NodeId, source: EventSource) {
		let Some(old_parent) = self.tree_parent_of.remove(child) else {
			return;
		};
		unlink(&mut self.tree_children_of, &old_parent, child);
		self.update_subtree(events, child, child, 0, source);
		events.emit(GraphEvent::TreeChanged {
			node: child.clone(),
			old_parent: Some(old_parent),
			new_parent: None,
			source,
		});
	}

	/// Rewrites root and depth for `start` and its tree descendants, emitting
	/// a depth change for every node whose depth actually moved.
	fn update_subtree(
		&mut self,
		events: &mut dyn EventSink,
		start: &NodeId,
		root: &NodeId,
		depth: usize,
		source: EventSource,
	) {
		let mut stack = vec![(start.clone(), depth)];
		while let Some((node, depth)) = stack.pop() {
			let old_depth = self.tree_depth.insert(node.clone(), depth).unwrap_or(0);
			self.tree_root_of.insert(node.clone(), root.clone());
			if let Some(children) = self.tree_children_of.get(&node) {
				stack.extend(children.iter().map(|c| (c.clone(), depth + 1)));
			}
			if old_depth != depth {
				events.emit(GraphEvent::TreeDepthChanged {
					node,
					old_depth,
					new_depth: depth,
					source,
				});
			}
		}
	}

	// --- DAG membership ---

	/// Adds the DAG edge `parent -> child`. Rejected when it would close a
	/// cycle or already exists.
	pub fn add_node_to_group(
		&mut self,
		graph: &Graph,
		events: &mut dyn EventSink,
		parent: &NodeId,
		child: &NodeId,
		position: Option<Point>,
		source: EventSource,
	) -> Membership {
		if self.would_create_cycle(parent, child) {
			debug!("adding {child} to {parent} would create a cycle");
			return Membership::Rejected;
		}
		if self
			.parents_of
			.get(child)
			.is_some_and(|parents| parents.contains(parent))
		{
			debug!("{child} is already in group {parent}");
			return Membership::Rejected;
		}
		link(&mut self.children_of, parent, child);
		link(&mut self.parents_of, child, parent);
		if let Some(at) = position {
			debug!("{child} joined {parent} at ({}, {})", at.x, at.y);
		}

		events.emit(GraphEvent::NodeJoinedGroup {
			parent: parent.clone(),
			child: child.clone(),
			parent_node: graph.node(parent.as_str()).cloned(),
			child_node: graph.node(child.as_str()).cloned(),
			source,
		});
		let kind = GroupHookKind::NodeJoinedGroup;
		let full_render = self.behaviour_of.get(parent).is_some_and(|b| {
			run_hook(
				b.hook(kind),
				&HookContext::new(graph, parent, child).with_position(position),
				kind,
			)
		});
		Membership::Changed { full_render }
	}

	/// Removes the DAG edge `parent -> child`. If `parent` was the tree
	/// parent, `child` becomes the root of its own tree.
	pub fn remove_node_from_group(
		&mut self,
		graph: &Graph,
		events: &mut dyn EventSink,
		parent: &NodeId,
		child: &NodeId,
		source: EventSource,
	) -> Membership {
		if !unlink(&mut self.parents_of, child, parent) {
			debug!("{child} is not in group {parent}");
			return Membership::Rejected;
		}
		unlink(&mut self.children_of, parent, child);

		if self.tree_parent_of.get(child) == Some(parent) {
			self.leave_tree(events, child, source);
		} else if !self.tree_root_of.contains_key(child) {
			self.mark_as_tree_root(child);
		}
		if let Some(behaviour) = self.behaviour_of.get_mut(parent) {
			behaviour.occupied_drop_zones.retain(|_, occupant| occupant != child);
		}

		events.emit(GraphEvent::NodeLeftGroup {
			parent: parent.clone(),
			child: child.clone(),
			parent_node: graph.node(parent.as_str()).cloned(),
			child_node: graph.node(child.as_str()).cloned(),
			source,
		});
		let full_render = self.run_group_hook(graph, parent, child, GroupHookKind::NodeLeftGroup);
		Membership::Changed { full_render }
	}

	/// Drops every membership and the behaviour of `id`. Former tree children
	/// become roots of their own trees.
	pub fn clear_node(
		&mut self,
		graph: &Graph,
		events: &mut dyn EventSink,
		id: &NodeId,
		source: EventSource,
	) {
		for parent in self.get_parents_of(id) {
			self.remove_node_from_group(graph, events, &parent, id, source);
		}
		for child in self.get_children_of(id) {
			self.remove_node_from_group(graph, events, id, &child, source);
		}
		self.tree_root_of.remove(id);
		self.tree_depth.remove(id);
		self.behaviour_of.remove(id);
	}

	// --- capture ---

	/// Outermost tree ancestor capturing the movement of `id`, or `id`.
	pub fn get_group_capturing_movement_of_child(&self, graph: &Graph, id: &NodeId) -> NodeId {
		let mut current = id;
		while let Some(parent) = self.tree_parent_of.get(current) {
			let captures = self.behaviour_of.get(parent).is_some_and(|b| {
				decide(
					b.capture_child_movement,
					b.capture_child_movement_for.as_ref(),
					&HookContext::new(graph, parent, current),
					"captureChildMovement",
				)
			});
			if !captures {
				break;
			}
			current = parent;
		}
		current.clone()
	}

	fn capturing_edge_group(&self, graph: &Graph, id: &NodeId, end: EdgeEnd) -> NodeId {
		let mut current = id;
		while let Some(parent) = self.tree_parent_of.get(current) {
			let captures = self.behaviour_of.get(parent).is_some_and(|b| {
				let (flag, decision, what) = match end {
					EdgeEnd::Outgoing => (
						b.capture_outgoing_edges,
						b.capture_outgoing_edges_for.as_ref(),
						"captureOutgoingEdges",
					),
					EdgeEnd::Incoming => (
						b.capture_incoming_edges,
						b.capture_incoming_edges_for.as_ref(),
						"captureIncomingEdges",
					),
				};
				decide(flag, decision, &HookContext::new(graph, parent, current), what)
			});
			if !captures {
				break;
			}
			current = parent;
		}
		current.clone()
	}

	/// Outermost tree ancestor taking over edges leaving `id`, or `id`.
	pub fn get_group_capturing_outgoing_edge(&self, graph: &Graph, id: &NodeId) -> NodeId {
		self.capturing_edge_group(graph, id, EdgeEnd::Outgoing)
	}

	/// Outermost tree ancestor taking over edges ending at `id`, or `id`.
	pub fn get_group_capturing_incoming_edge(&self, graph: &Graph, id: &NodeId) -> NodeId {
		self.capturing_edge_group(graph, id, EdgeEnd::Incoming)
	}

	/// `target` if its behaviour accepts `dragged` and joining would keep the
	/// DAG acyclic.
	pub fn get_group_capturing_dragged_node(
		&self,
		graph: &Graph,
		target: &NodeId,
		dragged: &NodeId,
	) -> Option<NodeId> {
		if self.would_create_cycle(target, dragged) {
			return None;
		}
		if self
			.parents_of
			.get(dragged)
			.is_some_and(|parents| parents.contains(target))
		{
			return None;
		}
		let behaviour = self.behaviour_of.get(target)?;
		decide(
			behaviour.capture_dragged_nodes,
			behaviour.capture_dragged_nodes_for.as_ref(),
			&HookContext::new(graph, target, dragged),
			"captureDraggedNodes",
		)
		.then(|| target.clone())
	}

	/// First group capturing `dragged`, starting at the hit node `hit` and
	/// walking up its tree parents.
	pub fn get_group_capturing_dragged_node_above(
		&self,
		graph: &Graph,
		hit: &NodeId,
		dragged: &NodeId,
	) -> Option<NodeId> {
		let mut seen = HashSet::new();
		let mut current = hit;
		loop {
			if !seen.insert(current) {
				return None;
			}
			if let Some(group) = self.get_group_capturing_dragged_node(graph, current, dragged) {
				return Some(group);
			}
			current = self.get_tree_parent_of(current)?;
		}
	}

	pub fn get_can_dragged_node_leave_group(
		&self,
		graph: &Graph,
		group: &NodeId,
		node: &NodeId,
	) -> bool {
		self.behaviour_of.get(group).is_some_and(|b| {
			decide(
				b.allow_dragged_nodes_leaving_group,
				b.allow_dragged_nodes_leaving_group_for.as_ref(),
				&HookContext::new(graph, group, node),
				"allowDraggedNodesLeavingGroup",
			)
		})
	}

	fn delegate_edge(&self, graph: &Graph, group: &NodeId, edge: &Edge, end: EdgeEnd) -> Option<NodeId> {
		let behaviour = self.behaviour_of.get(group)?;
		let delegate = match end {
			EdgeEnd::Outgoing => behaviour.delegate_outgoing_edge_source_to_node.as_ref(),
			EdgeEnd::Incoming => behaviour.delegate_incoming_edge_target_to_node.as_ref(),
		}?;
		let ctx = EdgeContext {
			group_id: group,
			group_node: graph.node(group.as_str()),
			edge,
			graph,
		};
		match delegate(&ctx) {
			Ok(id) => Some(id),
			Err(err) => {
				warn!("{end:?} edge delegation of group {group} failed: {err}");
				None
			}
		}
	}

	/// Node the source of `edge` is handed to by `group`. The id is returned
	/// as given by the callback, without checking it exists.
	pub fn delegate_outgoing_edge_source(&self, graph: &Graph, group: &NodeId, edge: &Edge) -> Option<NodeId> {
		self.delegate_edge(graph, group, edge, EdgeEnd::Outgoing)
	}

	/// Incoming counterpart of [`Self::delegate_outgoing_edge_source`].
	pub fn delegate_incoming_edge_target(&self, graph: &Graph, group: &NodeId, edge: &Edge) -> Option<NodeId> {
		self.delegate_edge(graph, group, edge, EdgeEnd::Incoming)
	}

	// --- drop zones ---

	pub fn drop_zone_occupant(&self, group: &NodeId, zone: &str) -> Option<&NodeId> {
		self.behaviour_of.get(group)?.occupied_drop_zones.get(zone)
	}

	/// Claims `zone` of `group` for `child`; fails if someone else holds it.
	pub fn occupy_drop_zone(&mut self, group: &NodeId, zone: &str, child: &NodeId) -> bool {
		let zones = &mut self
			.behaviour_of
			.entry(group.clone())
			.or_default()
			.occupied_drop_zones;
		match zones.get(zone) {
			Some(occupant) if occupant != child => false,
			_ => {
				zones.insert(zone.to_owned(), child.clone());
				true
			}
		}
	}

	pub fn free_drop_zone(&mut self, group: &NodeId, zone: &str) -> Option<NodeId> {
		self.behaviour_of.get_mut(group)?.occupied_drop_zones.remove(zone)
	}
}
