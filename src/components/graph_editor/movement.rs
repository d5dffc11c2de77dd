//! Drag coordination on top of the grouping manager.
//!
//! One gesture is `drag_start`, any number of `drag` steps and `drag_end`.
//! The [`NodeMovementInformation`] returned by `drag_start` is the drag
//! subject and is handed back on every step. Within a step the order is
//! fixed: leave check, join check, position update, position events.
//! Joins and leaves are final as soon as they happen.

use std::collections::HashSet;

use log::{debug, warn};

use super::behaviour::{ChildPosition, GroupHookKind};
use super::events::{EventSource, GraphEvent};
use super::state::GraphEditor;
use super::types::{Node, NodeId, Point};

/// Transient state of one drag gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeMovementInformation {
	/// Node that actually moves; a placeholder if the capturing group is not
	/// rendered.
	pub node: Node,
	/// Node the pointer grabbed.
	pub grabbed: NodeId,
	/// Nodes moved by the same delta as `node`.
	pub children: Option<HashSet<NodeId>>,
	/// Grab point minus node position.
	pub offset: Point,
	pub needs_full_render: bool,
}

/// Answer of the consumer's before-move hook.
#[derive(Clone, Debug, PartialEq)]
pub enum BeforeMove {
	Proceed,
	Replace(NodeMovementInformation),
	Veto,
}

/// What the renderer has to do after a drag step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderRequest {
	Full,
	PositionOnly,
}

impl RenderRequest {
	fn from_flag(full: bool) -> Self {
		if full {
			RenderRequest::Full
		} else {
			RenderRequest::PositionOnly
		}
	}
}

impl GraphEditor {
	/// Works out who moves when `node_id` is grabbed at graph point `(x, y)`.
	/// `None` if the before-move hook vetoed the gesture.
	pub fn get_node_movement_information(
		&self,
		node_id: &NodeId,
		x: f64,
		y: f64,
	) -> Option<NodeMovementInformation> {
		let mover = self
			.grouping
			.get_group_capturing_movement_of_child(&self.graph, node_id);
		let node = match self.graph.node(mover.as_str()) {
			Some(node) => node.clone(),
			None => {
				debug!("{mover} has no rendered node, dragging a placeholder");
				Node::placeholder(mover.clone(), Point::new(x, y))
			}
		};
		let children = self
			.grouping
			.behaviour(&mover)
			.filter(|b| b.move_children_along_group)
			.map(|_| self.grouping.get_all_children_of(&mover));
		let info = NodeMovementInformation {
			offset: Point::new(x - node.x, y - node.y),
			node,
			grabbed: node_id.clone(),
			children,
			needs_full_render: false,
		};

		let Some(hook) = &self.on_before_node_move else {
			return Some(info);
		};
		match hook(&info, &self.graph) {
			Ok(BeforeMove::Proceed) => Some(info),
			Ok(BeforeMove::Replace(replaced)) => Some(replaced),
			Ok(BeforeMove::Veto) => {
				debug!("movement of {node_id} vetoed");
				None
			}
			Err(err) => {
				warn!("onBeforeNodeMove failed for {node_id}: {err}");
				Some(info)
			}
		}
	}

	/// Position the tree parent `group` pins `child` to, if any.
	fn fixed_position_for(&self, group: &NodeId, child: &NodeId) -> Option<Point> {
		let behaviour = self.grouping.behaviour(group)?;
		if behaviour.allow_free_positioning {
			return None;
		}
		match behaviour.child_node_positions.get(child)? {
			ChildPosition::Offset(offset) => {
				let group_node = self.graph.node(group.as_str())?;
				Some(group_node.position() + *offset)
			}
			ChildPosition::DropZone(zone) => {
				let bbox = self.drop_zone_bbox(group, zone);
				if bbox.is_none() {
					debug!("drop zone {zone} of {group} not found");
				}
				bbox.map(|b| b.center())
			}
		}
	}

	/// Moves the mover so that its grab point sits at `(x, y)`, clamped to
	/// any position its tree parent dictates, and drags the tracked children
	/// along by the same delta.
	pub fn move_node_internal(
		&mut self,
		info: &mut NodeMovementInformation,
		x: f64,
		y: f64,
		source: EventSource,
	) {
		let mover = info.node.id.clone();
		let mut target = Point::new(x - info.offset.x, y - info.offset.y);

		if let Some(parent) = self.grouping.get_tree_parent_of(&mover).cloned() {
			info.needs_full_render |= self.grouping.run_group_hook(
				&self.graph,
				&parent,
				&mover,
				GroupHookKind::BeforeNodeMove,
			);
			if let Some(fixed) = self.fixed_position_for(&parent, &mover) {
				target = fixed;
			}
		}

		let delta = target - info.node.position();
		info.node.set_position(target);
		if let Some(node) = self.graph.node_mut(mover.as_str()) {
			node.set_position(target);
		}
		self.emit(GraphEvent::NodePositionChanged {
			node: mover,
			position: target,
			source,
		});

		let Some(children) = &info.children else {
			return;
		};
		let mut children: Vec<&NodeId> = children.iter().collect();
		children.sort();
		for child in children {
			let Some(node) = self.graph.node_mut(child.as_str()) else {
				continue;
			};
			let position = node.position() + delta;
			node.set_position(position);
			self.emit(GraphEvent::NodePositionChanged {
				node: child.clone(),
				position,
				source,
			});
		}
	}

	/// Nodes the pointer hit test ignores while `info` is dragged.
	fn dragged_ids(&self, info: &NodeMovementInformation) -> HashSet<NodeId> {
		let mut ids = self.grouping.get_all_children_of(&info.node.id);
		ids.insert(info.node.id.clone());
		if let Some(children) = &info.children {
			ids.extend(children.iter().cloned());
		}
		ids
	}

	/// Hit test at graph point `(x, y)` without the dragged nodes.
	fn hits_excluding_dragged(&self, info: &NodeMovementInformation, x: f64, y: f64) -> Vec<NodeId> {
		let dragged = self.dragged_ids(info);
		let client = self.graph_point_to_client_point(Point::new(x, y));
		self.nodes_under_point(client)
			.into_iter()
			.filter(|id| !dragged.contains(id))
			.collect()
	}

	/// Removes the mover from its tree group once the pointer no longer
	/// covers the group or any of its other members. Returns whether a full
	/// render is needed.
	pub fn try_to_leave_current_group(
		&mut self,
		info: &NodeMovementInformation,
		x: f64,
		y: f64,
		source: EventSource,
	) -> bool {
		let mover = &info.node.id;
		let Some(group) = self.grouping.get_tree_parent_of(mover).cloned() else {
			return false;
		};
		if !self
			.grouping
			.get_can_dragged_node_leave_group(&self.graph, &group, mover)
		{
			return false;
		}
		let mut members = self.grouping.get_all_children_of(&group);
		members.insert(group.clone());
		let still_inside = self
			.hits_excluding_dragged(info, x, y)
			.iter()
			.any(|id| members.contains(id));
		if still_inside {
			return false;
		}
		debug!("{mover} leaves group {group}");
		let mover = mover.clone();
		self.remove_node_from_group(&group, &mover, source).is_changed()
	}

	/// Puts a group-less mover into the group under the pointer, or the
	/// nearest tree ancestor of it, that captures the mover. Returns whether a
	/// full render is needed.
	pub fn try_join_node_into_group(
		&mut self,
		info: &NodeMovementInformation,
		x: f64,
		y: f64,
		source: EventSource,
	) -> bool {
		let mover = info.node.id.clone();
		if self.grouping.get_tree_parent_of(&mover).is_some() {
			return false;
		}
		let Some(candidate) = self.hits_excluding_dragged(info, x, y).into_iter().next() else {
			return false;
		};
		let Some(group) = self
			.grouping
			.get_group_capturing_dragged_node_above(&self.graph, &candidate, &mover)
		else {
			return false;
		};

		let was_root = self.grouping.get_tree_depth_of(&mover) == 0;
		let joined = self.add_node_to_group(&group, &mover, Some(Point::new(x, y)), source);
		if !joined.is_changed() {
			return false;
		}
		debug!("{mover} joins group {group}");
		if self.grouping.get_tree_root_of(&group).is_none() {
			self.grouping.mark_as_tree_root(&group);
		}
		if was_root {
			self.join_tree_of_parent(&mover, &group, source);
		}
		if let Some(ChildPosition::DropZone(zone)) = self.grouping.fixed_position_of(&group, &mover).cloned()
			&& !self.grouping.occupy_drop_zone(&group, &zone, &mover)
		{
			debug!("drop zone {zone} of {group} is already taken");
		}
		true
	}

	/// Starts a gesture on `node_id` grabbed at graph point `(x, y)`.
	pub fn drag_start(&mut self, node_id: &NodeId, x: f64, y: f64) -> Option<NodeMovementInformation> {
		let mut info = self.get_node_movement_information(node_id, x, y)?;
		let mover = info.node.id.clone();
		self.emit(GraphEvent::NodeMoveStart {
			node: mover.clone(),
			source: EventSource::UserInteraction,
		});
		if let Some(parent) = self.grouping.get_tree_parent_of(&mover) {
			info.needs_full_render |=
				self.grouping
					.run_group_hook(&self.graph, parent, &mover, GroupHookKind::NodeMoveStart);
		}
		Some(info)
	}

	/// One pointer move of the gesture.
	pub fn drag(&mut self, info: &mut NodeMovementInformation, x: f64, y: f64) -> RenderRequest {
		let source = EventSource::UserInteraction;
		let mut full = self.try_to_leave_current_group(info, x, y, source);
		full |= self.try_join_node_into_group(info, x, y, source);
		self.move_node_internal(info, x, y, source);
		full |= std::mem::take(&mut info.needs_full_render);
		RenderRequest::from_flag(full)
	}

	/// Ends the gesture; the subject is consumed.
	pub fn drag_end(&mut self, mut info: NodeMovementInformation) -> RenderRequest {
		let mover = info.node.id.clone();
		if let Some(parent) = self.grouping.get_tree_parent_of(&mover) {
			info.needs_full_render |=
				self.grouping
					.run_group_hook(&self.graph, parent, &mover, GroupHookKind::NodeMoveEnd);
		}
		self.emit(GraphEvent::NodeMoveEnd {
			node: mover,
			source: EventSource::UserInteraction,
		});
		RenderRequest::from_flag(info.needs_full_render)
	}
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use super::*;
	use crate::components::graph_editor::behaviour::{GroupBehaviour, HookContext};
	use crate::components::graph_editor::config::{DropZone, EditorConfig, NodeTemplate};
	use crate::components::graph_editor::error::HookError;
	use crate::components::graph_editor::geometry::NodeShape;
	use crate::components::graph_editor::types::{Graph, GraphData};

	fn id(s: &str) -> NodeId {
		NodeId::from(s)
	}

	fn editor(nodes: Vec<Node>) -> GraphEditor {
		let mut config = EditorConfig::default();
		config.templates.insert(
			String::from("group"),
			NodeTemplate {
				shape: NodeShape::Rect {
					width: 200.0,
					height: 200.0,
				},
				drop_zones: vec![DropZone {
					id: String::from("slot"),
					x: -90.0,
					y: -90.0,
					width: 20.0,
					height: 20.0,
				}],
				text: None,
			},
		);
		GraphEditor::new(GraphData { nodes, edges: Vec::new() }, config, 800.0, 600.0)
	}

	fn grouped(ed: &mut GraphEditor, parent: &str, child: &str) {
		ed.add_node_to_group(&id(parent), &id(child), None, EventSource::Api);
		ed.join_tree_of_parent(&id(child), &id(parent), EventSource::Api);
	}

	fn position(ed: &GraphEditor, node: &str) -> Point {
		ed.graph.node(node).map(Node::position).expect("node exists")
	}

	#[test]
	fn movement_info_tracks_offset_and_children() {
		let mut ed = editor(vec![
			Node::new("g", 100.0, 100.0),
			Node::new("a", 110.0, 100.0),
			Node::new("b", 90.0, 100.0),
		]);
		grouped(&mut ed, "g", "a");
		grouped(&mut ed, "g", "b");
		ed.set_group_behaviour_of(
			"g",
			GroupBehaviour {
				move_children_along_group: true,
				..GroupBehaviour::default()
			},
		);
		let info = ed
			.get_node_movement_information(&id("g"), 105.0, 97.0)
			.expect("no veto");
		assert_eq!(info.offset, Point::new(5.0, -3.0));
		assert_eq!(info.children, Some(HashSet::from([id("a"), id("b")])));
	}

	#[test]
	fn captured_child_moves_its_group_or_a_placeholder() {
		let mut ed = editor(vec![Node::new("c", 0.0, 0.0)]);
		grouped(&mut ed, "virtual", "c");
		ed.set_group_behaviour_of(
			"virtual",
			GroupBehaviour {
				capture_child_movement: true,
				..GroupBehaviour::default()
			},
		);
		let info = ed
			.get_node_movement_information(&id("c"), 3.0, 4.0)
			.expect("no veto");
		assert_eq!(info.node.id, id("virtual"));
		assert!(info.node.is_placeholder());
		assert_eq!(info.node.position(), Point::new(3.0, 4.0));
		assert_eq!(info.grabbed, id("c"));
	}

	#[test]
	fn before_move_hook_can_replace_veto_or_fail() {
		let mut ed = editor(vec![Node::new("n", 0.0, 0.0), Node::new("other", 50.0, 50.0)]);
		ed.on_before_node_move = Some(Rc::new(|_: &NodeMovementInformation, _: &Graph| Ok(BeforeMove::Veto)));
		assert!(ed.get_node_movement_information(&id("n"), 0.0, 0.0).is_none());

		ed.on_before_node_move = Some(Rc::new(
			|info: &NodeMovementInformation, graph: &Graph| -> Result<BeforeMove, HookError> {
				let mut replaced = info.clone();
				replaced.node = graph.node("other").cloned().ok_or(HookError::Vetoed)?;
				Ok(BeforeMove::Replace(replaced))
			},
		));
		let info = ed.get_node_movement_information(&id("n"), 0.0, 0.0).expect("replaced");
		assert_eq!(info.node.id, id("other"));

		ed.on_before_node_move = Some(Rc::new(|_: &NodeMovementInformation, _: &Graph| {
			Err(HookError::failed("consumer bug"))
		}));
		let info = ed.get_node_movement_information(&id("n"), 0.0, 0.0).expect("fallback");
		assert_eq!(info.node.id, id("n"));
	}

	#[test]
	fn children_follow_by_the_same_delta_even_when_clamped() {
		let mut ed = editor(vec![
			Node::new("p", 0.0, 0.0),
			Node::new("m", 10.0, 0.0),
			Node::new("c1", 20.0, 0.0),
			Node::new("c2", 10.0, 30.0),
		]);
		grouped(&mut ed, "p", "m");
		grouped(&mut ed, "m", "c1");
		grouped(&mut ed, "m", "c2");
		let mut pinned = GroupBehaviour::default();
		pinned
			.child_node_positions
			.insert(id("m"), ChildPosition::Offset(Point::new(10.0, 5.0)));
		ed.set_group_behaviour_of("p", pinned);
		ed.set_group_behaviour_of(
			"m",
			GroupBehaviour {
				move_children_along_group: true,
				..GroupBehaviour::default()
			},
		);

		let mut info = ed.get_node_movement_information(&id("m"), 10.0, 0.0).expect("no veto");
		ed.move_node_internal(&mut info, 300.0, 300.0, EventSource::Api);
		// Clamped to p + (10, 5): delta (0, 5).
		assert_eq!(position(&ed, "m"), Point::new(10.0, 5.0));
		assert_eq!(position(&ed, "c1"), Point::new(20.0, 5.0));
		assert_eq!(position(&ed, "c2"), Point::new(10.0, 35.0));
		let touched = ed
			.take_events()
			.into_iter()
			.filter(|e| matches!(e, GraphEvent::NodePositionChanged { .. }))
			.count();
		assert_eq!(touched, 3);
	}

	#[test]
	fn mover_position_event_fires_even_without_change() {
		let mut ed = editor(vec![Node::new("n", 5.0, 5.0)]);
		let mut info = ed.get_node_movement_information(&id("n"), 5.0, 5.0).expect("no veto");
		ed.take_events();
		ed.move_node_internal(&mut info, 5.0, 5.0, EventSource::Api);
		assert_eq!(
			ed.take_events(),
			[GraphEvent::NodePositionChanged {
				node: id("n"),
				position: Point::new(5.0, 5.0),
				source: EventSource::Api,
			}]
		);
	}

	#[test]
	fn drop_zone_positions_snap_to_zone_centre_unless_free() {
		let mut ed = editor(vec![
			Node::new("g", 100.0, 100.0).with_type("group"),
			Node::new("n", 100.0, 100.0),
		]);
		grouped(&mut ed, "g", "n");
		let mut behaviour = GroupBehaviour::default();
		behaviour
			.child_node_positions
			.insert(id("n"), ChildPosition::DropZone(String::from("slot")));
		ed.set_group_behaviour_of("g", behaviour.clone());

		let mut info = ed.get_node_movement_information(&id("n"), 100.0, 100.0).expect("no veto");
		ed.move_node_internal(&mut info, 150.0, 150.0, EventSource::Api);
		assert_eq!(position(&ed, "n"), Point::new(20.0, 20.0));

		behaviour.allow_free_positioning = true;
		ed.set_group_behaviour_of("g", behaviour);
		ed.move_node_internal(&mut info, 150.0, 150.0, EventSource::Api);
		assert_eq!(position(&ed, "n"), Point::new(150.0, 150.0));
	}

	#[test]
	fn before_node_move_hook_requests_full_render() {
		let mut ed = editor(vec![Node::new("g", 0.0, 0.0), Node::new("n", 0.0, 0.0)]);
		grouped(&mut ed, "g", "n");
		ed.set_group_behaviour_of(
			"g",
			GroupBehaviour {
				before_node_move: Some(Rc::new(|_: &HookContext<'_>| Ok(true))),
				allow_dragged_nodes_leaving_group: false,
				..GroupBehaviour::default()
			},
		);
		let mut info = ed.drag_start(&id("n"), 0.0, 0.0).expect("no veto");
		assert_eq!(ed.drag(&mut info, 1.0, 1.0), RenderRequest::Full);
		assert!(!info.needs_full_render);
	}

	#[test]
	fn leave_waits_until_pointer_clears_group_and_siblings() {
		let mut ed = editor(vec![
			Node::new("g", 0.0, 0.0).with_type("group"),
			Node::new("sib", 150.0, 0.0),
			Node::new("n", 0.0, 0.0),
		]);
		grouped(&mut ed, "g", "n");
		grouped(&mut ed, "g", "sib");
		ed.set_group_behaviour_of(
			"g",
			GroupBehaviour {
				allow_dragged_nodes_leaving_group: true,
				..GroupBehaviour::default()
			},
		);
		let mut info = ed.drag_start(&id("n"), 0.0, 0.0).expect("no veto");
		// Still over the group.
		assert_eq!(ed.drag(&mut info, 50.0, 50.0), RenderRequest::PositionOnly);
		// Outside the group box but over a sibling.
		assert_eq!(ed.drag(&mut info, 150.0, 5.0), RenderRequest::PositionOnly);
		assert_eq!(ed.grouping.get_tree_parent_of(&id("n")), Some(&id("g")));
		// Clear of everything.
		assert_eq!(ed.drag(&mut info, 400.0, 400.0), RenderRequest::Full);
		assert!(ed.grouping.get_tree_parent_of(&id("n")).is_none());
		assert_eq!(position(&ed, "n"), Point::new(400.0, 400.0));
	}

	#[test]
	fn groups_refusing_leave_keep_their_child() {
		let mut ed = editor(vec![Node::new("g", 0.0, 0.0).with_type("group"), Node::new("n", 0.0, 0.0)]);
		grouped(&mut ed, "g", "n");
		let mut info = ed.drag_start(&id("n"), 0.0, 0.0).expect("no veto");
		ed.drag(&mut info, 900.0, 900.0);
		assert_eq!(ed.grouping.get_tree_parent_of(&id("n")), Some(&id("g")));
	}

	#[test]
	fn dropping_onto_a_capturing_group_joins_its_tree() {
		let mut ed = editor(vec![
			Node::new("g", 0.0, 0.0).with_type("group"),
			Node::new("n", 300.0, 300.0),
		]);
		ed.set_group_behaviour_of(
			"g",
			GroupBehaviour {
				capture_dragged_nodes: true,
				..GroupBehaviour::default()
			},
		);
		let mut info = ed.drag_start(&id("n"), 300.0, 300.0).expect("no veto");
		ed.take_events();
		assert_eq!(ed.drag(&mut info, 10.0, 10.0), RenderRequest::Full);
		assert_eq!(ed.grouping.get_tree_parent_of(&id("n")), Some(&id("g")));
		assert_eq!(ed.grouping.get_tree_root_of(&id("g")), Some(&id("g")));
		assert_eq!(ed.grouping.get_tree_depth_of(&id("n")), 1);

		// Join happens before the node is moved.
		let events = ed.take_events();
		let join = events
			.iter()
			.position(|e| matches!(e, GraphEvent::NodeJoinedGroup { .. }))
			.expect("join event");
		let moved = events
			.iter()
			.position(|e| matches!(e, GraphEvent::NodePositionChanged { .. }))
			.expect("position event");
		assert!(join < moved);

		assert_eq!(ed.drag_end(info), RenderRequest::PositionOnly);
		assert!(matches!(ed.take_events().last(), Some(GraphEvent::NodeMoveEnd { .. })));
	}

	#[test]
	fn a_group_cannot_be_dropped_into_its_own_member() {
		let mut ed = editor(vec![
			Node::new("outer", 0.0, 0.0).with_type("group"),
			Node::new("inner", 500.0, 500.0).with_type("group"),
		]);
		ed.add_node_to_group(&id("outer"), &id("inner"), None, EventSource::Api);
		ed.set_group_behaviour_of(
			"inner",
			GroupBehaviour {
				capture_dragged_nodes: true,
				..GroupBehaviour::default()
			},
		);
		let mut info = ed.drag_start(&id("outer"), 0.0, 0.0).expect("no veto");
		ed.drag(&mut info, 500.0, 500.0);
		assert!(ed.grouping.get_parents_of(&id("outer")).is_empty());
	}

	#[test]
	fn joining_a_drop_zone_group_occupies_the_zone() {
		let mut ed = editor(vec![
			Node::new("g", 0.0, 0.0).with_type("group"),
			Node::new("n", 300.0, 300.0),
		]);
		let mut behaviour = GroupBehaviour {
			capture_dragged_nodes: true,
			..GroupBehaviour::default()
		};
		behaviour
			.child_node_positions
			.insert(id("n"), ChildPosition::DropZone(String::from("slot")));
		ed.set_group_behaviour_of("g", behaviour);
		let mut info = ed.drag_start(&id("n"), 300.0, 300.0).expect("no veto");
		ed.drag(&mut info, 10.0, 10.0);
		assert_eq!(ed.grouping.drop_zone_occupant(&id("g"), "slot"), Some(&id("n")));
		assert_eq!(position(&ed, "n"), Point::new(-80.0, -80.0));
	}
}
